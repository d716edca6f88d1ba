//! Tool adapter contract and lifecycle management
//!
//! A plugin wraps one external analysis tool (linter, formatter, type checker,
//! test runner). The [`PluginManager`] owns every registered plugin for the
//! lifetime of an analysis run, drives initialize/execute/cleanup and keeps
//! per-plugin execution metrics.

use crate::config::{ToolConfiguration, ValidationResult};
use crate::error::Result;
use async_trait::async_trait;

pub mod context;
pub mod manager;
pub mod metrics;
pub mod registry;
pub mod result;

pub use context::{AnalysisCache, ExecutionContext, MemoryCache};
pub use manager::{InitializationReport, PluginManager};
pub use metrics::PluginMetrics;
pub use registry::{DependencyGraph, PluginRegistry};
pub use result::{CoverageReport, Issue, Severity, ToolMetrics, ToolResult, ToolStatus};

/// Plugin trait that all tool adapters must implement
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Unique plugin name
    fn name(&self) -> &str;

    fn version(&self) -> &str;

    /// Names of plugins that must be registered before this one
    fn dependencies(&self) -> &[String] {
        &[]
    }

    /// Prepare the underlying tool with its effective configuration
    async fn initialize(&self, config: &ToolConfiguration) -> Result<()>;

    /// Run the tool once
    async fn execute(&self, context: &ExecutionContext) -> Result<ToolResult>;

    /// Release resources held by the tool
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    fn default_config(&self) -> ToolConfiguration;

    fn validate_config(&self, config: &ToolConfiguration) -> ValidationResult {
        config.check()
    }

    fn supports_incremental(&self) -> bool {
        false
    }

    fn supports_cache(&self) -> bool {
        false
    }

    /// Metrics the adapter tracks itself, if any
    fn metrics(&self) -> PluginMetrics {
        PluginMetrics::default()
    }
}
