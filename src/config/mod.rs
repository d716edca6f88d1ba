//! Orchestrator configuration
//!
//! One file configures scoring weights, degradation strategies and per-tool
//! settings. YAML and TOML are both accepted; the format is chosen by file
//! extension. Every field has a default, so an empty file is valid.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::degradation::DegradationConfig;
use crate::error::{Error, Result};
use crate::scoring::ScoringConfig;

pub mod tool;

pub use tool::{
    CommonToolSettings, CustomToolConfig, EslintConfig, JestConfig, PrettierConfig,
    ToolConfiguration, TypescriptConfig, ValidationResult,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub degradation: DegradationConfig,
    /// Per-tool overrides keyed by plugin name
    #[serde(default)]
    pub tools: HashMap<String, ToolConfiguration>,
}

impl OrchestratorConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => Self::from_yaml(&content)?,
            Some("toml") => Self::from_toml(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            other => {
                return Err(Error::Config(format!(
                    "Unsupported config format {:?} for {}",
                    other.unwrap_or(""),
                    path.display()
                )))
            }
        };

        config.validate()?;
        debug!(
            "Loaded configuration from {} ({} tool overrides)",
            path.display(),
            config.tools.len()
        );
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check weights, strategy ordering and tool settings
    pub fn validate(&self) -> Result<()> {
        self.scoring
            .validate()
            .map_err(|e| Error::Config(format!("scoring: {e}")))?;
        self.degradation
            .validate()
            .map_err(|e| Error::Config(format!("degradation: {e}")))?;

        let mut errors = Vec::new();
        for (name, tool) in &self.tools {
            let result = tool.check();
            errors.extend(result.errors.into_iter().map(|e| format!("{name}: {e}")));
        }
        if !errors.is_empty() {
            errors.sort();
            return Err(Error::Config(format!("tools: {}", errors.join("; "))));
        }

        Ok(())
    }
}
