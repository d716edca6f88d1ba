use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    prompts::generate_prompts,
    recommendations::{generate_recommendations, RecommendationInputs},
    trends::analyze_trends,
    AggregatedResult, AnalysisResult, CoverageSummary, IssueStatistics, NormalizedResult,
    PerformanceSummary, ToolTiming,
};
use crate::plugin::Severity;
use crate::scoring::{calculate_score, Grade, ScoreInputs, ScoringConfig};

/// Combines per-tool results into one scored bundle
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    config: ScoringConfig,
}

impl ResultAggregator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Aggregate the results of one run.
    ///
    /// Results with error status are tolerated and simply contribute what
    /// they carry. An empty slice yields a perfect score with no
    /// recommendations.
    pub fn aggregate_results(
        &self,
        results: &[NormalizedResult],
        project_id: &str,
        baseline: Option<&[NormalizedResult]>,
    ) -> AggregatedResult {
        let issue_statistics = self.issue_statistics(results);
        let coverage = aggregate_coverage(results);
        let performance = aggregate_performance(results);
        let trends = analyze_trends(results, baseline);

        let inputs = ScoreInputs {
            errors: issue_statistics.by_severity.error,
            warnings: issue_statistics.by_severity.warning,
            info: issue_statistics.by_severity.info,
            coverage: coverage.map(|c| c.lines),
            execution_time: performance
                .as_ref()
                .map(|p| p.total_execution_time)
                .unwrap_or_default(),
        };
        let overall_score = calculate_score(&inputs, &self.config);
        let grade = Grade::from_score(overall_score);

        let recommendations = generate_recommendations(
            &RecommendationInputs {
                statistics: &issue_statistics,
                score: overall_score,
                coverage: coverage.as_ref(),
                performance: performance.as_ref(),
                trends: &trends,
            },
            &self.config,
        );

        info!(
            "Aggregated {} tool results for {}: {} issues, score {:.1} ({})",
            results.len(),
            project_id,
            issue_statistics.total,
            overall_score,
            grade
        );

        AggregatedResult {
            issue_statistics,
            overall_score,
            grade,
            coverage,
            performance,
            trends,
            recommendations,
        }
    }

    /// Aggregate and wrap into a full analysis result with prompts for the
    /// issue clusters that cross the priority threshold
    pub fn create_analysis_result(
        &self,
        results: Vec<NormalizedResult>,
        project_id: &str,
        baseline: Option<&[NormalizedResult]>,
    ) -> AnalysisResult {
        let aggregated = self.aggregate_results(&results, project_id, baseline);
        let ai_prompts = generate_prompts(&results, self.config.prompt_priority_threshold);
        debug!("Generated {} prompts for {}", ai_prompts.len(), project_id);

        AnalysisResult {
            id: Uuid::new_v4(),
            project_id: project_id.to_string(),
            timestamp: Utc::now(),
            aggregated,
            tool_results: results,
            ai_prompts,
        }
    }

    fn issue_statistics(&self, results: &[NormalizedResult]) -> IssueStatistics {
        let mut stats = IssueStatistics::default();

        for result in results {
            *stats.by_tool.entry(result.tool_name.clone()).or_default() += result.issues.len();

            for issue in &result.issues {
                stats.total += 1;
                match issue.severity {
                    Severity::Error => {
                        stats.by_severity.error += 1;
                        if issue.score >= self.config.critical_score_threshold {
                            stats.critical += 1;
                        }
                    }
                    Severity::Warning => stats.by_severity.warning += 1,
                    Severity::Info => stats.by_severity.info += 1,
                }
                *stats.by_category.entry(issue.category.clone()).or_default() += 1;
                if issue.fixable {
                    stats.fixable += 1;
                }
            }
        }

        stats
    }
}

/// Average coverage over the tools that reported any
fn aggregate_coverage(results: &[NormalizedResult]) -> Option<CoverageSummary> {
    let reports: Vec<_> = results.iter().filter_map(|r| r.metrics.coverage).collect();
    if reports.is_empty() {
        return None;
    }

    let n = reports.len() as f64;
    let avg = |f: fn(&crate::plugin::CoverageReport) -> f64| reports.iter().map(f).sum::<f64>() / n;

    Some(CoverageSummary {
        lines: avg(|c| c.lines),
        branches: avg(|c| c.branches),
        functions: avg(|c| c.functions),
        statements: avg(|c| c.statements),
        tools_reporting: reports.len(),
    })
}

fn aggregate_performance(results: &[NormalizedResult]) -> Option<PerformanceSummary> {
    if results.is_empty() {
        return None;
    }

    let timing = |r: &NormalizedResult| ToolTiming {
        tool_name: r.tool_name.clone(),
        execution_time: r.metrics.execution_time,
    };

    let total_execution_time: Duration = results.iter().map(|r| r.metrics.execution_time).sum();
    // First of equals wins, so the outcome follows input order
    let slowest = results
        .iter()
        .reduce(|a, b| {
            if b.metrics.execution_time > a.metrics.execution_time {
                b
            } else {
                a
            }
        })
        .map(timing);
    let fastest = results
        .iter()
        .reduce(|a, b| {
            if b.metrics.execution_time < a.metrics.execution_time {
                b
            } else {
                a
            }
        })
        .map(timing);

    Some(PerformanceSummary {
        total_execution_time,
        average_execution_time: crate::plugin::metrics::average(
            total_execution_time,
            results.len() as u64,
        ),
        files_processed: results.iter().map(|r| r.metrics.files_processed).sum(),
        lines_of_code: results.iter().map(|r| r.metrics.lines_of_code).sum(),
        slowest_tool: slowest,
        fastest_tool: fastest,
    })
}
