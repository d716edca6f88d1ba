//! Baseline comparison

use std::collections::{HashMap, HashSet};

use super::{NormalizedResult, TrendAnalysis};

/// Compare current issue ids with a baseline run, tool by tool.
///
/// Only tools present in the current run are compared; a tool missing from
/// the baseline contributes all of its issues as new. Tools that ran in the
/// baseline but not now are ignored.
pub fn analyze_trends(
    current: &[NormalizedResult],
    baseline: Option<&[NormalizedResult]>,
) -> TrendAnalysis {
    let Some(baseline) = baseline else {
        return TrendAnalysis::default();
    };

    let baseline_ids: HashMap<&str, HashSet<&str>> = baseline
        .iter()
        .map(|result| (result.tool_name.as_str(), issue_ids(result)))
        .fold(HashMap::new(), |mut acc, (tool, ids)| {
            acc.entry(tool).or_insert_with(HashSet::new).extend(ids);
            acc
        });

    let mut current_ids: HashMap<&str, HashSet<&str>> = HashMap::new();
    for result in current {
        current_ids
            .entry(result.tool_name.as_str())
            .or_default()
            .extend(issue_ids(result));
    }

    let empty = HashSet::new();
    let mut new_issues = 0;
    let mut fixed_issues = 0;

    for (tool, now) in &current_ids {
        let before = baseline_ids.get(tool).unwrap_or(&empty);
        new_issues += now.difference(before).count();
        fixed_issues += before.difference(now).count();
    }

    TrendAnalysis {
        new_issues,
        fixed_issues,
        regression: new_issues > fixed_issues,
    }
}

fn issue_ids(result: &NormalizedResult) -> HashSet<&str> {
    result.issues.iter().map(|issue| issue.id.as_str()).collect()
}
