//! Threshold-driven advice for an aggregated run

use super::{CoverageSummary, IssueStatistics, PerformanceSummary, TrendAnalysis};
use crate::scoring::ScoringConfig;

/// Everything the recommendation rules look at
pub struct RecommendationInputs<'a> {
    pub statistics: &'a IssueStatistics,
    pub score: f64,
    pub coverage: Option<&'a CoverageSummary>,
    pub performance: Option<&'a PerformanceSummary>,
    pub trends: &'a TrendAnalysis,
}

/// Generate recommendations, most impactful first
pub fn generate_recommendations(
    inputs: &RecommendationInputs<'_>,
    config: &ScoringConfig,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    let stats = inputs.statistics;

    if stats.critical > 0 {
        recommendations.push(format!(
            "Address {} critical issue(s) before merging",
            stats.critical
        ));
    }

    if stats.by_severity.error > config.error_recommendation_threshold {
        recommendations.push(format!(
            "Fix the {} reported errors first; they weigh most on the quality score",
            stats.by_severity.error
        ));
    }

    if let Some(coverage) = inputs.coverage {
        if coverage.lines < config.coverage_threshold {
            recommendations.push(format!(
                "Add tests to raise line coverage from {:.1}% to at least {:.0}%",
                coverage.lines, config.coverage_threshold
            ));
        }
    }

    if inputs.score < config.low_score_threshold {
        match top_category(stats) {
            Some(category) => recommendations.push(format!(
                "Quality score is {:.1}; focus refactoring on '{}' issues",
                inputs.score, category
            )),
            None => recommendations.push(format!(
                "Quality score is {:.1}; plan a refactoring pass",
                inputs.score
            )),
        }
    }

    if inputs.trends.regression {
        recommendations.push(format!(
            "New issues outnumber fixed ones ({} new vs {} fixed); review recent changes",
            inputs.trends.new_issues, inputs.trends.fixed_issues
        ));
    }

    if stats.fixable > 0 {
        recommendations.push(format!(
            "{} issue(s) can be fixed automatically; run the tools in fix mode",
            stats.fixable
        ));
    }

    if let Some(slowest) = inputs.performance.and_then(|p| p.slowest_tool.as_ref()) {
        if slowest.execution_time > config.performance_budget {
            recommendations.push(format!(
                "{} took {:.1}s; enable incremental analysis or caching for it",
                slowest.tool_name,
                slowest.execution_time.as_secs_f64()
            ));
        }
    }

    recommendations
}

/// Category with the most issues, ties broken alphabetically
fn top_category(stats: &IssueStatistics) -> Option<&str> {
    stats
        .by_category
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(category, _)| category.as_str())
}
