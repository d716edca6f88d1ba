//! Health-triggered graceful degradation
//!
//! A [`DegradationManager`] watches [`HealthMetrics`] samples and moves one
//! step at a time through the ordered [`DegradationLevel`]s. Each level's
//! [`DegradationStrategy`] names the triggers that push the system into it,
//! the actions applied while it holds, and the conditions for stepping back
//! down.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod clock;
pub mod error_history;
pub mod events;
pub mod health;
pub mod manager;
pub mod strategy;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error_history::{ErrorHistory, ErrorTracker};
pub use events::DegradationEvent;
pub use health::{health_score, HealthMetrics};
pub use manager::{DegradationManager, DegradationManagerBuilder, DegradationStatistics};
pub use strategy::{
    DegradationActions, DegradationConfig, DegradationStrategy, DegradationTriggers,
    RecoverySettings,
};

/// Operating mode, from full functionality to emergency-only
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DegradationLevel {
    #[default]
    None,
    Minimal,
    Moderate,
    Severe,
    Critical,
}

impl DegradationLevel {
    /// Every level in ascending order
    pub const ALL: [DegradationLevel; 5] = [
        DegradationLevel::None,
        DegradationLevel::Minimal,
        DegradationLevel::Moderate,
        DegradationLevel::Severe,
        DegradationLevel::Critical,
    ];

    pub fn next_higher(self) -> Option<Self> {
        match self {
            Self::None => Some(Self::Minimal),
            Self::Minimal => Some(Self::Moderate),
            Self::Moderate => Some(Self::Severe),
            Self::Severe => Some(Self::Critical),
            Self::Critical => None,
        }
    }

    pub fn next_lower(self) -> Option<Self> {
        match self {
            Self::None => None,
            Self::Minimal => Some(Self::None),
            Self::Moderate => Some(Self::Minimal),
            Self::Severe => Some(Self::Moderate),
            Self::Critical => Some(Self::Severe),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Minimal => "minimal",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DegradationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown degradation level: {s}"))
    }
}
