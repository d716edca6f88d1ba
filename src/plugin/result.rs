//! Output produced by a tool adapter for one execution

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Severity of a single issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Overall status of one tool run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Warning,
    Error,
}

/// A single finding reported by a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub severity: Severity,
    pub category: String,
    pub file_path: PathBuf,
    pub line_number: u32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub fixable: bool,
    /// Priority score assigned upstream by the issue classifier
    #[serde(default)]
    pub score: f64,
}

impl Issue {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
        file_path: impl Into<PathBuf>,
        line_number: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            category: category.into(),
            file_path: file_path.into(),
            line_number,
            message: message.into(),
            rule_id: None,
            fixable: false,
            score: 0.0,
        }
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn fixable(mut self, fixable: bool) -> Self {
        self.fixable = fixable;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

/// Coverage percentages (0-100) reported by a test runner
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub lines: f64,
    pub branches: f64,
    pub functions: f64,
    pub statements: f64,
}

/// Volume counters for one tool run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolMetrics {
    #[serde(default)]
    pub files_processed: u64,
    #[serde(default)]
    pub lines_of_code: u64,
    #[serde(default)]
    pub cache_hits: u64,
}

/// What a plugin returns from `execute`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool_name: String,
    /// Humantime text (`"1s 500ms"`) or a number of milliseconds on input;
    /// always written as humantime text
    #[serde(
        serialize_with = "humantime_serde::serialize",
        deserialize_with = "deserialize_execution_time"
    )]
    pub execution_time: Duration,
    pub status: ToolStatus,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub metrics: ToolMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl ToolResult {
    pub fn success(tool_name: impl Into<String>, issues: Vec<Issue>) -> Self {
        Self {
            tool_name: tool_name.into(),
            execution_time: Duration::ZERO,
            status: ToolStatus::Success,
            issues,
            metrics: ToolMetrics::default(),
            coverage: None,
            summary: None,
        }
    }

    /// Result recorded for a tool whose execution failed
    pub fn failed(tool_name: impl Into<String>, execution_time: Duration, reason: &str) -> Self {
        Self {
            tool_name: tool_name.into(),
            execution_time,
            status: ToolStatus::Error,
            issues: Vec::new(),
            metrics: ToolMetrics::default(),
            coverage: None,
            summary: Some(format!("Execution failed: {reason}")),
        }
    }

    /// Result recorded for a tool that was not run
    pub fn skipped(tool_name: impl Into<String>, reason: &str) -> Self {
        Self {
            tool_name: tool_name.into(),
            execution_time: Duration::ZERO,
            status: ToolStatus::Warning,
            issues: Vec::new(),
            metrics: ToolMetrics::default(),
            coverage: None,
            summary: Some(format!("Skipped: {reason}")),
        }
    }

    pub fn with_execution_time(mut self, execution_time: Duration) -> Self {
        self.execution_time = execution_time;
        self
    }

    pub fn with_coverage(mut self, coverage: CoverageReport) -> Self {
        self.coverage = Some(coverage);
        self
    }

    pub fn with_metrics(mut self, metrics: ToolMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }
}

/// Accepts both humantime text and plain milliseconds, the form most
/// adapters report
fn deserialize_execution_time<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ExecutionTime {
        Millis(u64),
        FractionalMillis(f64),
        Text(humantime_serde::Serde<Duration>),
    }

    match ExecutionTime::deserialize(deserializer)? {
        ExecutionTime::Millis(ms) => Ok(Duration::from_millis(ms)),
        ExecutionTime::FractionalMillis(ms) => Duration::try_from_secs_f64(ms / 1000.0)
            .map_err(|_| serde::de::Error::custom(format!("invalid executionTime {ms}"))),
        ExecutionTime::Text(text) => Ok(text.into_inner()),
    }
}
