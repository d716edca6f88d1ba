//! # lintforge
//!
//! Orchestration core for running many failure-prone code analysis tools
//! against one project and turning their output into a single quality signal.
//!
//! ## Modules
//!
//! - `plugin` - Plugin contract, registry with dependency ordering, lifecycle
//!   management and per-plugin execution metrics
//! - `aggregation` - Normalization of tool results and aggregation into one
//!   scored, graded result with trends, recommendations and AI prompts
//! - `degradation` - Health-triggered degradation levels with automatic
//!   step-wise recovery
//! - `scoring` - Overall quality score and letter grades
//! - `config` - Orchestrator configuration and typed per-tool settings
//! - `app` - Binary plumbing (logging, app config, fatal errors)
//! - `testing` - Test doubles for plugins
pub mod aggregation;
pub mod app;
pub mod config;
pub mod degradation;
pub mod error;
pub mod plugin;
pub mod scoring;

pub mod testing;

pub use error::{Error, Result};
