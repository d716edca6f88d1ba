//! ToolResult → NormalizedResult

use std::collections::HashSet;
use tracing::debug;

use super::{NormalizedMetrics, NormalizedResult, ResultSummary, SeverityCounts};
use crate::plugin::{Issue, Severity, ToolResult};

/// Reshape one tool's output into the common schema.
///
/// Repeated issue ids get a `#n` suffix so ids stay unique within the result.
pub fn normalize(result: ToolResult) -> NormalizedResult {
    let ToolResult {
        tool_name,
        execution_time,
        status,
        issues,
        metrics,
        coverage,
        summary,
    } = result;

    let issues = dedupe_ids(&tool_name, issues);
    let summary = summarize(&issues, summary);

    NormalizedResult {
        tool_name,
        status,
        issues,
        metrics: NormalizedMetrics {
            execution_time,
            files_processed: metrics.files_processed,
            lines_of_code: metrics.lines_of_code,
            coverage,
        },
        summary,
    }
}

/// Normalize a batch of tool results
pub fn normalize_all(results: Vec<ToolResult>) -> Vec<NormalizedResult> {
    results.into_iter().map(normalize).collect()
}

fn dedupe_ids(tool_name: &str, issues: Vec<Issue>) -> Vec<Issue> {
    let mut seen = HashSet::with_capacity(issues.len());
    issues
        .into_iter()
        .map(|mut issue| {
            if !seen.insert(issue.id.clone()) {
                let base = issue.id.clone();
                let mut n = 2;
                while !seen.insert(format!("{base}#{n}")) {
                    n += 1;
                }
                issue.id = format!("{base}#{n}");
                debug!("{}: duplicate issue id {} renamed to {}", tool_name, base, issue.id);
            }
            issue
        })
        .collect()
}

fn summarize(issues: &[Issue], message: Option<String>) -> ResultSummary {
    let mut by_severity = SeverityCounts::default();
    let mut fixable = 0;

    for issue in issues {
        match issue.severity {
            Severity::Error => by_severity.error += 1,
            Severity::Warning => by_severity.warning += 1,
            Severity::Info => by_severity.info += 1,
        }
        if issue.fixable {
            fixable += 1;
        }
    }

    ResultSummary {
        total_issues: issues.len(),
        by_severity,
        fixable,
        message,
    }
}
