//! Per-plugin execution metrics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Running execution counters for one plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetrics {
    pub execution_count: u64,
    #[serde(with = "humantime_serde")]
    pub total_execution_time: Duration,
    #[serde(with = "humantime_serde")]
    pub average_execution_time: Duration,
    pub success_count: u64,
    pub error_count: u64,
    pub last_execution_time: Option<DateTime<Utc>>,
}

impl PluginMetrics {
    /// Record one execution.
    ///
    /// The average is recomputed from the exact integer total, so the final
    /// value depends only on the recorded times and not on their order.
    pub fn record(&mut self, execution_time: Duration, success: bool, at: DateTime<Utc>) {
        self.execution_count += 1;
        self.total_execution_time += execution_time;
        self.average_execution_time = average(self.total_execution_time, self.execution_count);

        if success {
            self.success_count += 1;
        } else {
            self.error_count += 1;
        }

        self.last_execution_time = Some(at);
    }

    /// Fraction of executions that succeeded, 1.0 when nothing ran yet
    pub fn success_rate(&self) -> f64 {
        if self.execution_count == 0 {
            1.0
        } else {
            self.success_count as f64 / self.execution_count as f64
        }
    }
}

/// `total / count` at nanosecond precision
pub fn average(total: Duration, count: u64) -> Duration {
    if count == 0 {
        return Duration::ZERO;
    }
    let nanos = total.as_nanos() / u128::from(count);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_updates_counters() {
        let mut metrics = PluginMetrics::default();
        let now = Utc::now();

        metrics.record(Duration::from_millis(100), true, now);
        metrics.record(Duration::from_millis(300), false, now);

        assert_eq!(metrics.execution_count, 2);
        assert_eq!(metrics.total_execution_time, Duration::from_millis(400));
        assert_eq!(metrics.average_execution_time, Duration::from_millis(200));
        assert_eq!(metrics.success_count, 1);
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.last_execution_time, Some(now));
        assert!((metrics.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_of_nothing_is_zero() {
        assert_eq!(average(Duration::from_secs(5), 0), Duration::ZERO);
        assert_eq!(PluginMetrics::default().success_rate(), 1.0);
    }
}
