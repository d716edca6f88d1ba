//! Unified scoring for aggregated analysis results
//!
//! Scores use a 0-100 range where higher is better. A run starts at 100 and
//! loses points for every reported issue, for coverage below the configured
//! threshold and for execution time above the performance budget.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Weights and thresholds used when scoring and advising on a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Points lost per error
    #[serde(default = "default_error_weight")]
    pub error_weight: f64,
    /// Points lost per warning
    #[serde(default = "default_warning_weight")]
    pub warning_weight: f64,
    /// Points lost per info finding
    #[serde(default = "default_info_weight")]
    pub info_weight: f64,
    /// Points lost per coverage percentage point below `coverage_threshold`
    #[serde(default = "default_coverage_weight")]
    pub coverage_weight: f64,
    /// Points lost per second of execution above `performance_budget`
    #[serde(default = "default_performance_weight")]
    pub performance_weight: f64,
    /// Minimum acceptable line coverage (0-100)
    #[serde(default = "default_coverage_threshold")]
    pub coverage_threshold: f64,
    #[serde(default = "default_performance_budget", with = "humantime_serde")]
    pub performance_budget: Duration,
    /// Error count above which fixing errors is recommended
    #[serde(default = "default_error_recommendation_threshold")]
    pub error_recommendation_threshold: usize,
    /// Score below which a refactoring focus is recommended
    #[serde(default = "default_low_score_threshold")]
    pub low_score_threshold: f64,
    /// Issue score at or above which an error counts as critical
    #[serde(default = "default_critical_score_threshold")]
    pub critical_score_threshold: f64,
    /// Cluster priority at or above which a prompt is generated
    #[serde(default = "default_prompt_priority_threshold")]
    pub prompt_priority_threshold: f64,
}

fn default_error_weight() -> f64 {
    10.0
}

fn default_warning_weight() -> f64 {
    2.0
}

fn default_info_weight() -> f64 {
    0.5
}

fn default_coverage_weight() -> f64 {
    0.5
}

fn default_performance_weight() -> f64 {
    0.1
}

fn default_coverage_threshold() -> f64 {
    80.0
}

fn default_performance_budget() -> Duration {
    Duration::from_secs(60)
}

fn default_error_recommendation_threshold() -> usize {
    10
}

fn default_low_score_threshold() -> f64 {
    70.0
}

fn default_critical_score_threshold() -> f64 {
    8.0
}

fn default_prompt_priority_threshold() -> f64 {
    10.0
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            error_weight: default_error_weight(),
            warning_weight: default_warning_weight(),
            info_weight: default_info_weight(),
            coverage_weight: default_coverage_weight(),
            performance_weight: default_performance_weight(),
            coverage_threshold: default_coverage_threshold(),
            performance_budget: default_performance_budget(),
            error_recommendation_threshold: default_error_recommendation_threshold(),
            low_score_threshold: default_low_score_threshold(),
            critical_score_threshold: default_critical_score_threshold(),
            prompt_priority_threshold: default_prompt_priority_threshold(),
        }
    }
}

impl ScoringConfig {
    /// Weights must be non-negative for the score to be monotone in issue
    /// counts
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("error_weight", self.error_weight),
            ("warning_weight", self.warning_weight),
            ("info_weight", self.info_weight),
            ("coverage_weight", self.coverage_weight),
            ("performance_weight", self.performance_weight),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be a non-negative number, got {value}"));
            }
        }
        if !(0.0..=100.0).contains(&self.coverage_threshold) {
            return Err(format!(
                "coverage_threshold must be between 0 and 100, got {}",
                self.coverage_threshold
            ));
        }
        Ok(())
    }
}

/// Inputs to the overall score
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreInputs {
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    /// Aggregated line coverage, if any tool reported it
    pub coverage: Option<f64>,
    /// Total execution time across tools
    pub execution_time: Duration,
}

/// Letter grade for an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::B
        } else if score >= 70.0 {
            Grade::C
        } else if score >= 60.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// Calculate the overall 0-100 score
pub fn calculate_score(inputs: &ScoreInputs, config: &ScoringConfig) -> f64 {
    let mut score = 100.0;

    score -= inputs.errors as f64 * config.error_weight;
    score -= inputs.warnings as f64 * config.warning_weight;
    score -= inputs.info as f64 * config.info_weight;

    if let Some(coverage) = inputs.coverage {
        let shortfall = (config.coverage_threshold - coverage).max(0.0);
        score -= shortfall * config.coverage_weight;
    }

    let over_budget = inputs
        .execution_time
        .saturating_sub(config.performance_budget)
        .as_secs_f64();
    score -= over_budget * config.performance_weight;

    score.clamp(0.0, 100.0)
}
