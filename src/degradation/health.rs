use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use super::clock::window_start;
use super::DegradationLevel;

/// One health sample from the monitoring collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    /// Fraction of failing operations, 0-1
    pub error_rate: f64,
    /// Fraction of successful operations, 0-1
    pub success_rate: f64,
    #[serde(with = "humantime_serde")]
    pub average_response_time: Duration,
    /// Percent
    pub memory_usage: f64,
    /// Percent
    pub cpu_usage: f64,
    #[serde(default)]
    pub active_plugins: usize,
    #[serde(default)]
    pub queue_depth: usize,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl HealthMetrics {
    /// A sample with nothing wrong, stamped `at`
    pub fn healthy(at: DateTime<Utc>) -> Self {
        Self {
            error_rate: 0.0,
            success_rate: 1.0,
            average_response_time: Duration::from_millis(200),
            memory_usage: 40.0,
            cpu_usage: 30.0,
            active_plugins: 0,
            queue_depth: 0,
            timestamp: at,
        }
    }
}

/// Drop samples older than `window` relative to `now`, wherever they sit
pub(crate) fn prune(history: &mut VecDeque<HealthMetrics>, now: DateTime<Utc>, window: Duration) {
    let cutoff = window_start(now, window);
    history.retain(|s| s.timestamp >= cutoff);
}

/// Samples taken within `period` of `now`
pub(crate) fn recent(
    history: &VecDeque<HealthMetrics>,
    now: DateTime<Utc>,
    period: Duration,
) -> impl Iterator<Item = &HealthMetrics> {
    let cutoff = window_start(now, period);
    history.iter().filter(move |s| s.timestamp >= cutoff)
}

fn level_penalty(level: DegradationLevel) -> f64 {
    match level {
        DegradationLevel::None => 0.0,
        DegradationLevel::Minimal => 5.0,
        DegradationLevel::Moderate => 15.0,
        DegradationLevel::Severe => 30.0,
        DegradationLevel::Critical => 50.0,
    }
}

/// 0-100 health score for the latest sample at the given level
pub fn health_score(latest: Option<&HealthMetrics>, level: DegradationLevel) -> f64 {
    let mut score = 100.0 - level_penalty(level);

    if let Some(m) = latest {
        score -= (m.error_rate * 100.0 * 0.3).clamp(0.0, 30.0);
        score -= ((1.0 - m.success_rate) * 100.0 * 0.2).clamp(0.0, 20.0);
        if m.memory_usage > 70.0 {
            score -= (m.memory_usage - 70.0) * 0.5;
        }
        if m.cpu_usage > 70.0 {
            score -= (m.cpu_usage - 70.0) * 0.3;
        }
        let response = m.average_response_time.as_secs_f64();
        if response > 5.0 {
            score -= ((response - 5.0) * 2.0).min(20.0);
        }
    }

    score.clamp(0.0, 100.0)
}
