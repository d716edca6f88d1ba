//! Prioritized fix-it prompts for issue clusters
//!
//! Issues are grouped by category and severity. A cluster whose priority
//! score reaches the configured threshold becomes a prompt that an AI
//! assistant (or a human) can act on directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::NormalizedResult;
use crate::plugin::{Issue, Severity};

/// Most affected files listed in a prompt
const MAX_FILES: usize = 5;
/// Example messages quoted in a prompt
const MAX_EXAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptPriority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiPrompt {
    pub priority: PromptPriority,
    pub priority_score: f64,
    pub category: String,
    pub severity: Severity,
    pub issue_count: usize,
    pub files: Vec<String>,
    pub prompt: String,
}

fn severity_weight(severity: Severity) -> f64 {
    match severity {
        Severity::Error => 3.0,
        Severity::Warning => 2.0,
        Severity::Info => 1.0,
    }
}

/// Weight of one issue within its cluster: its severity weight for volume,
/// scaled up by its own score
fn issue_priority(issue: &Issue) -> f64 {
    severity_weight(issue.severity) * (1.0 + issue.score.max(0.0))
}

/// Build prompts for every cluster at or above `threshold`, highest
/// priority first
pub fn generate_prompts(results: &[NormalizedResult], threshold: f64) -> Vec<AiPrompt> {
    let mut clusters: BTreeMap<(String, Severity), Vec<&Issue>> = BTreeMap::new();
    for issue in results.iter().flat_map(|r| r.issues.iter()) {
        clusters
            .entry((issue.category.clone(), issue.severity))
            .or_default()
            .push(issue);
    }

    let mut prompts: Vec<AiPrompt> = clusters
        .into_iter()
        .filter_map(|((category, severity), issues)| {
            let priority_score: f64 = issues.iter().map(|i| issue_priority(i)).sum();
            if priority_score < threshold {
                return None;
            }
            Some(build_prompt(category, severity, &issues, priority_score, threshold))
        })
        .collect();

    prompts.sort_by(|a, b| {
        b.priority_score
            .total_cmp(&a.priority_score)
            .then_with(|| a.category.cmp(&b.category))
    });
    prompts
}

fn build_prompt(
    category: String,
    severity: Severity,
    issues: &[&Issue],
    priority_score: f64,
    threshold: f64,
) -> AiPrompt {
    let priority = if priority_score >= threshold * 3.0 {
        PromptPriority::High
    } else if priority_score >= threshold * 1.5 {
        PromptPriority::Medium
    } else {
        PromptPriority::Low
    };

    let mut per_file: BTreeMap<String, usize> = BTreeMap::new();
    for issue in issues {
        *per_file
            .entry(issue.file_path.display().to_string())
            .or_default() += 1;
    }
    let total_files = per_file.len();
    let mut files: Vec<(String, usize)> = per_file.into_iter().collect();
    files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let files: Vec<String> = files.into_iter().take(MAX_FILES).map(|(f, _)| f).collect();

    let mut prompt = format!(
        "Fix {} {} issue(s) in category '{}' across {} file(s).",
        issues.len(),
        severity.as_str(),
        category,
        total_files
    );
    let _ = write!(prompt, "\nMost affected files: {}", files.join(", "));
    prompt.push_str("\nExamples:");
    for issue in issues.iter().take(MAX_EXAMPLES) {
        let rule = issue
            .rule_id
            .as_deref()
            .map(|r| format!(" [{r}]"))
            .unwrap_or_default();
        let _ = write!(
            prompt,
            "\n- {}:{}{} {}",
            issue.file_path.display(),
            issue.line_number,
            rule,
            issue.message
        );
    }

    AiPrompt {
        priority,
        priority_score,
        category,
        severity,
        issue_count: issues.len(),
        files,
        prompt,
    }
}
