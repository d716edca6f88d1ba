//! Testing utilities
//!
//! Test doubles for the plugin contract. Used by the unit tests in this crate
//! and by integration tests under `tests/`.

use crate::config::{CommonToolSettings, CustomToolConfig, ToolConfiguration, ValidationResult};
use crate::error::{Error, Result};
use crate::plugin::{ExecutionContext, Issue, Plugin, ToolResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Configurable in-memory plugin
#[derive(Debug, Default)]
pub struct MockPlugin {
    name: String,
    version: String,
    dependencies: Vec<String>,
    incremental: bool,
    cachable: bool,
    issues: Vec<Issue>,
    validation_errors: Vec<String>,
    validation_warnings: Vec<String>,
    fail_init: bool,
    fail_execute: bool,
    fail_cleanup: bool,
    initialized_with: Mutex<Option<ToolConfiguration>>,
    initialize_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    cleanup_calls: AtomicUsize,
}

impl MockPlugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            ..Default::default()
        }
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn incremental(mut self) -> Self {
        self.incremental = true;
        self
    }

    pub fn cachable(mut self) -> Self {
        self.cachable = true;
        self
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn with_validation_error(mut self, error: &str) -> Self {
        self.validation_errors.push(error.to_string());
        self
    }

    pub fn with_validation_warning(mut self, warning: &str) -> Self {
        self.validation_warnings.push(warning.to_string());
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn failing_execute(mut self) -> Self {
        self.fail_execute = true;
        self
    }

    pub fn failing_cleanup(mut self) -> Self {
        self.fail_cleanup = true;
        self
    }

    /// Custom-tool configuration with the given timeout
    pub fn config_with_timeout(name: &str, secs: u64) -> ToolConfiguration {
        ToolConfiguration::Custom(CustomToolConfig {
            name: name.to_string(),
            common: CommonToolSettings {
                enabled: true,
                timeout: Duration::from_secs(secs),
            },
            ..Default::default()
        })
    }

    /// Configuration passed to the last `initialize` call
    pub fn initialized_with(&self) -> Option<ToolConfiguration> {
        self.initialized_with
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    pub fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub fn cleanup_calls(&self) -> usize {
        self.cleanup_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for MockPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    async fn initialize(&self, config: &ToolConfiguration) -> Result<()> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(Error::PluginExecution(format!(
                "{} could not locate its executable",
                self.name
            )));
        }
        *self
            .initialized_with
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(config.clone());
        Ok(())
    }

    async fn execute(&self, _context: &ExecutionContext) -> Result<ToolResult> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_execute {
            return Err(Error::PluginExecution(format!(
                "{} exited with status 2",
                self.name
            )));
        }
        Ok(ToolResult::success(&self.name, self.issues.clone()))
    }

    async fn cleanup(&self) -> Result<()> {
        self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_cleanup {
            return Err(Error::Cleanup(format!("{} left a lock file behind", self.name)));
        }
        Ok(())
    }

    fn default_config(&self) -> ToolConfiguration {
        ToolConfiguration::Custom(CustomToolConfig {
            name: self.name.clone(),
            ..Default::default()
        })
    }

    fn validate_config(&self, config: &ToolConfiguration) -> ValidationResult {
        let mut result = config.check();
        for error in &self.validation_errors {
            result = result.with_error(error.clone());
        }
        for warning in &self.validation_warnings {
            result = result.with_warning(warning.clone());
        }
        result
    }

    fn supports_incremental(&self) -> bool {
        self.incremental
    }

    fn supports_cache(&self) -> bool {
        self.cachable
    }
}
