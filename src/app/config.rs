//! Application configuration

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::OrchestratorConfig;

/// Settings for one invocation of the binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Directory relative paths are resolved against
    pub working_dir: PathBuf,
    /// Orchestrator config file, if one was given
    pub config_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Result<Self> {
        let working_dir =
            std::env::current_dir().context("Failed to get current directory")?;

        Ok(Self {
            verbose,
            working_dir,
            config_path: None,
        })
    }

    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    /// Filter directive for the configured verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Resolve `path` against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.working_dir.join(path)
        }
    }

    /// Load the orchestrator config, falling back to defaults when no file
    /// was given
    pub fn orchestrator_config(&self) -> Result<OrchestratorConfig> {
        match &self.config_path {
            Some(path) => {
                let path = self.resolve(path);
                OrchestratorConfig::load(&path)
                    .with_context(|| format!("Failed to load config from {}", path.display()))
            }
            None => Ok(OrchestratorConfig::default()),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: 0,
            working_dir: PathBuf::from("."),
            config_path: None,
        }
    }
}
