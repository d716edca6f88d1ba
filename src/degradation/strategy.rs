//! Per-level triggers, actions and recovery rules

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use super::DegradationLevel;

/// Longest accepted history, error, cooldown or monitoring window
pub const MAX_WINDOW: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Thresholds that push the system into a level. Any one exceeded is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationTriggers {
    /// Fraction of failing operations, 0-1
    pub error_rate: f64,
    pub consecutive_errors: u32,
    /// Percent
    pub memory_usage: f64,
    /// Percent
    pub cpu_usage: f64,
    #[serde(with = "humantime_serde")]
    pub response_time: Duration,
}

/// Policy applied while a level holds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationActions {
    #[serde(default)]
    pub disable_plugins: Vec<String>,
    /// Multiplier for concurrent executions; 1.0 leaves concurrency unchanged
    #[serde(default = "default_factor")]
    pub reduce_concurrency: f64,
    /// Multiplier for tool timeouts; 1.0 leaves timeouts unchanged
    #[serde(default = "default_factor")]
    pub increase_timeouts: f64,
    #[serde(default)]
    pub enable_caching: bool,
    #[serde(default)]
    pub skip_expensive_operations: bool,
    #[serde(default)]
    pub enable_fallbacks: bool,
}

fn default_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoverySettings {
    /// Minimum time the level is held before stepping down
    #[serde(with = "humantime_serde")]
    pub cooldown_period: Duration,
    /// Average success rate required over the monitoring period, 0-1
    pub success_threshold: f64,
    #[serde(with = "humantime_serde")]
    pub monitoring_period: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationStrategy {
    pub triggers: DegradationTriggers,
    pub actions: DegradationActions,
    pub recovery: RecoverySettings,
}

/// Degradation settings, one strategy per level above `none`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationConfig {
    #[serde(default = "default_minimal")]
    pub minimal: DegradationStrategy,
    #[serde(default = "default_moderate")]
    pub moderate: DegradationStrategy,
    #[serde(default = "default_severe")]
    pub severe: DegradationStrategy,
    #[serde(default = "default_critical")]
    pub critical: DegradationStrategy,
    /// How long health samples are kept
    #[serde(default = "default_history_window", with = "humantime_serde")]
    pub history_window: Duration,
    /// Window in which consecutive errors are counted
    #[serde(default = "default_error_window", with = "humantime_serde")]
    pub error_window: Duration,
    /// Schedule automatic recovery attempts
    #[serde(default = "default_recovery_timer_enabled")]
    pub recovery_timer_enabled: bool,
}

fn strategy(
    triggers: (f64, u32, f64, f64, u64),
    disable_plugins: &[&str],
    concurrency: f64,
    timeouts: f64,
    flags: (bool, bool),
    recovery: (u64, f64, u64),
) -> DegradationStrategy {
    let (error_rate, consecutive_errors, memory_usage, cpu_usage, response_secs) = triggers;
    let (skip_expensive_operations, enable_fallbacks) = flags;
    let (cooldown_mins, success_threshold, monitoring_mins) = recovery;

    DegradationStrategy {
        triggers: DegradationTriggers {
            error_rate,
            consecutive_errors,
            memory_usage,
            cpu_usage,
            response_time: Duration::from_secs(response_secs),
        },
        actions: DegradationActions {
            disable_plugins: disable_plugins.iter().map(|s| s.to_string()).collect(),
            reduce_concurrency: concurrency,
            increase_timeouts: timeouts,
            enable_caching: true,
            skip_expensive_operations,
            enable_fallbacks,
        },
        recovery: RecoverySettings {
            cooldown_period: Duration::from_secs(cooldown_mins * 60),
            success_threshold,
            monitoring_period: Duration::from_secs(monitoring_mins * 60),
        },
    }
}

fn default_minimal() -> DegradationStrategy {
    strategy((0.05, 3, 70.0, 70.0, 5), &[], 0.8, 1.2, (false, false), (2, 0.95, 5))
}

fn default_moderate() -> DegradationStrategy {
    strategy(
        (0.10, 5, 80.0, 80.0, 10),
        &["coverage", "complexity"],
        0.6,
        1.5,
        (true, false),
        (5, 0.95, 10),
    )
}

fn default_severe() -> DegradationStrategy {
    strategy(
        (0.20, 10, 90.0, 90.0, 20),
        &["security", "duplication"],
        0.4,
        2.0,
        (true, true),
        (10, 0.97, 15),
    )
}

fn default_critical() -> DegradationStrategy {
    strategy(
        (0.35, 20, 95.0, 95.0, 30),
        &["typescript", "jest"],
        0.2,
        3.0,
        (true, true),
        (15, 0.99, 20),
    )
}

fn default_history_window() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_error_window() -> Duration {
    Duration::from_secs(60)
}

fn default_recovery_timer_enabled() -> bool {
    true
}

impl Default for DegradationConfig {
    fn default() -> Self {
        Self {
            minimal: default_minimal(),
            moderate: default_moderate(),
            severe: default_severe(),
            critical: default_critical(),
            history_window: default_history_window(),
            error_window: default_error_window(),
            recovery_timer_enabled: default_recovery_timer_enabled(),
        }
    }
}

impl DegradationConfig {
    /// Strategy for a level; `none` has no strategy
    pub fn strategy(&self, level: DegradationLevel) -> Option<&DegradationStrategy> {
        match level {
            DegradationLevel::None => None,
            DegradationLevel::Minimal => Some(&self.minimal),
            DegradationLevel::Moderate => Some(&self.moderate),
            DegradationLevel::Severe => Some(&self.severe),
            DegradationLevel::Critical => Some(&self.critical),
        }
    }

    /// Plugins disabled while `level` holds: everything named by `level`
    /// and every level below it
    pub fn disabled_through(&self, level: DegradationLevel) -> BTreeSet<String> {
        DegradationLevel::ALL
            .into_iter()
            .filter(|l| *l <= level)
            .filter_map(|l| self.strategy(l))
            .flat_map(|s| s.actions.disable_plugins.iter().cloned())
            .collect()
    }

    /// Thresholds must not get looser as severity rises
    pub fn validate(&self) -> Result<(), String> {
        let levels = [
            DegradationLevel::Minimal,
            DegradationLevel::Moderate,
            DegradationLevel::Severe,
            DegradationLevel::Critical,
        ];

        let windows = [
            ("history_window", self.history_window),
            ("error_window", self.error_window),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, w)| *w > MAX_WINDOW) {
            return Err(format!(
                "{name} must not exceed {} days",
                MAX_WINDOW.as_secs() / 86_400
            ));
        }

        for level in levels {
            let Some(s) = self.strategy(level) else {
                continue;
            };
            let windows = [
                ("cooldown_period", s.recovery.cooldown_period),
                ("monitoring_period", s.recovery.monitoring_period),
            ];
            if let Some((name, _)) = windows.iter().find(|(_, w)| *w > MAX_WINDOW) {
                return Err(format!(
                    "{level}: {name} must not exceed {} days",
                    MAX_WINDOW.as_secs() / 86_400
                ));
            }
            if !(0.0..=1.0).contains(&s.triggers.error_rate) {
                return Err(format!("{level}: error_rate must be between 0 and 1"));
            }
            if !(0.0..=1.0).contains(&s.recovery.success_threshold) {
                return Err(format!("{level}: success_threshold must be between 0 and 1"));
            }
            if !(s.actions.reduce_concurrency > 0.0 && s.actions.reduce_concurrency <= 1.0) {
                return Err(format!("{level}: reduce_concurrency must be in (0, 1]"));
            }
            if s.actions.increase_timeouts < 1.0 {
                return Err(format!("{level}: increase_timeouts must be at least 1.0"));
            }
        }

        for pair in levels.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            let (Some(a), Some(b)) = (self.strategy(lower), self.strategy(higher)) else {
                continue;
            };
            let (a, b) = (&a.triggers, &b.triggers);
            let checks = [
                ("error_rate", b.error_rate >= a.error_rate),
                ("consecutive_errors", b.consecutive_errors >= a.consecutive_errors),
                ("memory_usage", b.memory_usage >= a.memory_usage),
                ("cpu_usage", b.cpu_usage >= a.cpu_usage),
                ("response_time", b.response_time >= a.response_time),
            ];
            if let Some((name, _)) = checks.iter().find(|(_, ok)| !ok) {
                return Err(format!(
                    "{higher}: {name} trigger must not be lower than at {lower}"
                ));
            }
        }

        Ok(())
    }
}
