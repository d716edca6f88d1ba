use serde::Serialize;

use super::DegradationLevel;

/// Events published by the degradation manager.
///
/// For one degradation the order is: `Triggered` or `Forced`, then the
/// policy events that apply (concurrency, timeouts, caching, expensive
/// operations, fallbacks), then `Applied`. Every health sample publishes
/// `HealthUpdated` before anything else.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DegradationEvent {
    HealthUpdated {
        health_score: f64,
        level: DegradationLevel,
    },
    Triggered {
        from: DegradationLevel,
        to: DegradationLevel,
        reason: String,
    },
    Forced {
        from: DegradationLevel,
        to: DegradationLevel,
        reason: String,
    },
    Recovered {
        from: DegradationLevel,
        to: DegradationLevel,
    },
    Applied {
        level: DegradationLevel,
        disabled_plugins: Vec<String>,
    },
    ConcurrencyReduced {
        factor: f64,
    },
    TimeoutsIncreased {
        multiplier: f64,
    },
    CachingEnabled,
    ExpensiveOperationsSkipped,
    FallbacksEnabled,
}

impl DegradationEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Self::HealthUpdated { .. } => "health:updated",
            Self::Triggered { .. } => "degradation:triggered",
            Self::Forced { .. } => "degradation:forced",
            Self::Recovered { .. } => "degradation:recovered",
            Self::Applied { .. } => "degradation:applied",
            Self::ConcurrencyReduced { .. } => "config:concurrency:reduced",
            Self::TimeoutsIncreased { .. } => "config:timeouts:increased",
            Self::CachingEnabled => "config:caching:enabled",
            Self::ExpensiveOperationsSkipped => "config:expensive-operations:skipped",
            Self::FallbacksEnabled => "config:fallbacks:enabled",
        }
    }
}
