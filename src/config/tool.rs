//! Per-tool configuration
//!
//! Each supported tool gets its own typed variant. The `tool` tag selects the
//! variant at deserialization time, so a malformed blob is rejected when it is
//! loaded instead of when an adapter reads it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Settings shared by every tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonToolSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Upper bound an adapter should honor for one execution
    #[serde(default = "default_tool_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_enabled() -> bool {
    true
}

fn default_tool_timeout() -> Duration {
    Duration::from_secs(120)
}

impl Default for CommonToolSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            timeout: default_tool_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EslintConfig {
    #[serde(flatten)]
    pub common: CommonToolSettings,
    #[serde(default)]
    pub config_file: Option<PathBuf>,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub fix: bool,
    #[serde(default)]
    pub max_warnings: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrettierConfig {
    #[serde(flatten)]
    pub common: CommonToolSettings,
    #[serde(default)]
    pub check_only: bool,
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TypescriptConfig {
    #[serde(flatten)]
    pub common: CommonToolSettings,
    #[serde(default)]
    pub project: Option<PathBuf>,
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JestConfig {
    #[serde(flatten)]
    pub common: CommonToolSettings,
    #[serde(default)]
    pub coverage: bool,
    /// Minimum line coverage percentage (0-100)
    #[serde(default)]
    pub coverage_threshold: Option<f64>,
    #[serde(default)]
    pub max_workers: Option<usize>,
}

/// Configuration for a tool without a dedicated variant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CustomToolConfig {
    pub name: String,
    #[serde(flatten)]
    pub common: CommonToolSettings,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

/// Configuration handed to a plugin, one variant per tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "lowercase")]
pub enum ToolConfiguration {
    Eslint(EslintConfig),
    Prettier(PrettierConfig),
    Typescript(TypescriptConfig),
    Jest(JestConfig),
    Custom(CustomToolConfig),
}

/// Outcome of checking a configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self.valid = false;
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    /// Fold another result into this one
    pub fn merge(mut self, other: ValidationResult) -> Self {
        self.valid = self.valid && other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self
    }
}

impl ToolConfiguration {
    /// Tool name this configuration targets
    pub fn tool_name(&self) -> &str {
        match self {
            ToolConfiguration::Eslint(_) => "eslint",
            ToolConfiguration::Prettier(_) => "prettier",
            ToolConfiguration::Typescript(_) => "typescript",
            ToolConfiguration::Jest(_) => "jest",
            ToolConfiguration::Custom(c) => &c.name,
        }
    }

    pub fn common(&self) -> &CommonToolSettings {
        match self {
            ToolConfiguration::Eslint(c) => &c.common,
            ToolConfiguration::Prettier(c) => &c.common,
            ToolConfiguration::Typescript(c) => &c.common,
            ToolConfiguration::Jest(c) => &c.common,
            ToolConfiguration::Custom(c) => &c.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut CommonToolSettings {
        match self {
            ToolConfiguration::Eslint(c) => &mut c.common,
            ToolConfiguration::Prettier(c) => &mut c.common,
            ToolConfiguration::Typescript(c) => &mut c.common,
            ToolConfiguration::Jest(c) => &mut c.common,
            ToolConfiguration::Custom(c) => &mut c.common,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.common().enabled
    }

    pub fn timeout(&self) -> Duration {
        self.common().timeout
    }

    /// Checks that hold for every tool regardless of adapter.
    ///
    /// Adapters call this from their own `validate_config` and add their
    /// tool-specific rules on top.
    pub fn check(&self) -> ValidationResult {
        let mut result = ValidationResult::ok();

        if self.timeout().is_zero() {
            result = result.with_error("timeout must be greater than zero");
        }

        match self {
            ToolConfiguration::Eslint(c) => {
                if c.extensions.is_empty() {
                    result = result.with_warning("no file extensions configured, using tool defaults");
                }
                if c.fix && c.max_warnings == Some(0) {
                    result = result.with_warning("fix mode combined with max_warnings = 0");
                }
            }
            ToolConfiguration::Prettier(c) => {
                if c.patterns.is_empty() {
                    result = result.with_warning("no file patterns configured");
                }
            }
            ToolConfiguration::Typescript(_) => {}
            ToolConfiguration::Jest(c) => {
                if let Some(threshold) = c.coverage_threshold {
                    if !(0.0..=100.0).contains(&threshold) {
                        result = result.with_error(format!(
                            "coverage_threshold must be between 0 and 100, got {threshold}"
                        ));
                    }
                    if !c.coverage {
                        result = result
                            .with_warning("coverage_threshold is set but coverage is disabled");
                    }
                }
                if c.max_workers == Some(0) {
                    result = result.with_error("max_workers must be at least 1");
                }
            }
            ToolConfiguration::Custom(c) => {
                if c.name.trim().is_empty() {
                    result = result.with_error("custom tool name must not be empty");
                }
            }
        }

        result
    }
}
