//! Multi-tool result normalization and aggregation
//!
//! Per-tool [`ToolResult`](crate::plugin::ToolResult)s are first reshaped into
//! [`NormalizedResult`]s, then combined into one [`AggregatedResult`] carrying
//! issue statistics, the overall score and grade, coverage and performance
//! roll-ups, baseline trends and recommendations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

use crate::plugin::{CoverageReport, Issue, ToolStatus};
use crate::scoring::Grade;

pub mod aggregator;
pub mod normalize;
pub mod prompts;
pub mod recommendations;
pub mod trends;

pub use aggregator::ResultAggregator;
pub use normalize::normalize;
pub use prompts::{AiPrompt, PromptPriority};

/// Counts of issues per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }
}

/// Per-result summary counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub total_issues: usize,
    pub by_severity: SeverityCounts,
    pub fixable: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Execution figures for one normalized result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMetrics {
    #[serde(with = "humantime_serde")]
    pub execution_time: Duration,
    pub files_processed: u64,
    pub lines_of_code: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageReport>,
}

/// One tool's output in the common schema. Issue ids are unique within a
/// result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResult {
    pub tool_name: String,
    pub status: ToolStatus,
    pub issues: Vec<Issue>,
    pub metrics: NormalizedMetrics,
    pub summary: ResultSummary,
}

/// Issue counts across every tool in a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueStatistics {
    pub total: usize,
    pub by_severity: SeverityCounts,
    pub by_category: BTreeMap<String, usize>,
    pub by_tool: BTreeMap<String, usize>,
    pub fixable: usize,
    pub critical: usize,
}

/// Coverage averaged over the tools that reported any
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSummary {
    pub lines: f64,
    pub branches: f64,
    pub functions: f64,
    pub statements: f64,
    pub tools_reporting: usize,
}

/// Execution time of a single tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolTiming {
    pub tool_name: String,
    #[serde(with = "humantime_serde")]
    pub execution_time: Duration,
}

/// Execution totals across tools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    #[serde(with = "humantime_serde")]
    pub total_execution_time: Duration,
    #[serde(with = "humantime_serde")]
    pub average_execution_time: Duration,
    pub files_processed: u64,
    pub lines_of_code: u64,
    pub slowest_tool: Option<ToolTiming>,
    pub fastest_tool: Option<ToolTiming>,
}

/// Issue movement against a baseline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendAnalysis {
    pub new_issues: usize,
    pub fixed_issues: usize,
    pub regression: bool,
}

/// Combined, scored output across all tools for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    pub issue_statistics: IssueStatistics,
    pub overall_score: f64,
    pub grade: Grade,
    pub coverage: Option<CoverageSummary>,
    pub performance: Option<PerformanceSummary>,
    pub trends: TrendAnalysis,
    pub recommendations: Vec<String>,
}

/// Full result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub id: Uuid,
    pub project_id: String,
    pub timestamp: DateTime<Utc>,
    pub aggregated: AggregatedResult,
    pub tool_results: Vec<NormalizedResult>,
    pub ai_prompts: Vec<AiPrompt>,
}
