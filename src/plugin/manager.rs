use crate::config::ToolConfiguration;
use crate::error::{Error, Result};
use chrono::Utc;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn, Instrument};

use super::{
    registry::PluginRegistry, ExecutionContext, Plugin, PluginMetrics, ToolResult, ToolStatus,
};

/// Plugin manager coordinates all plugin operations
///
/// Mutating calls (register, unregister, initialize, cleanup) must be
/// serialized by the caller. Read accessors are safe at any time.
pub struct PluginManager {
    registry: RwLock<PluginRegistry>,
    metrics: RwLock<HashMap<String, PluginMetrics>>,
    effective_configs: RwLock<HashMap<String, ToolConfiguration>>,
    // Plain lock so the degradation manager can flip entries without awaiting
    disabled: std::sync::RwLock<HashSet<String>>,
    initialized: AtomicBool,
}

/// Outcome of a successful `initialize_plugins` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitializationReport {
    /// Plugins initialized by this call, in initialization order
    pub initialized: Vec<String>,
    /// Non-fatal validation warnings as `(plugin, warning)` pairs
    pub warnings: Vec<(String, String)>,
    /// True when the manager was already initialized and nothing ran
    pub already_initialized: bool,
}

impl PluginManager {
    pub fn new() -> Self {
        Self {
            registry: RwLock::new(PluginRegistry::new()),
            metrics: RwLock::new(HashMap::new()),
            effective_configs: RwLock::new(HashMap::new()),
            disabled: std::sync::RwLock::new(HashSet::new()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Register a plugin, optionally with an explicit configuration
    pub async fn register_plugin(
        &self,
        plugin: Arc<dyn Plugin>,
        config: Option<ToolConfiguration>,
    ) -> Result<()> {
        let name = plugin.name().to_string();
        let version = plugin.version().to_string();

        let mut registry = self.registry.write().await;
        registry.register(plugin, config)?;
        self.metrics
            .write()
            .await
            .insert(name.clone(), PluginMetrics::default());

        info!("Registered plugin: {} v{}", name, version);
        Ok(())
    }

    /// Register plugins in order, stopping at the first failure.
    ///
    /// Plugins registered before the failure stay registered; their names are
    /// carried in [`Error::PartialRegistration`].
    pub async fn register_plugins(&self, plugins: Vec<Arc<dyn Plugin>>) -> Result<Vec<String>> {
        let mut registered = Vec::with_capacity(plugins.len());

        for plugin in plugins {
            let name = plugin.name().to_string();
            if let Err(e) = self.register_plugin(plugin, None).await {
                error!("Failed to register plugin {}: {}", name, e);
                return Err(Error::PartialRegistration {
                    registered,
                    source: Box::new(e),
                });
            }
            registered.push(name);
        }

        Ok(registered)
    }

    /// Validate and initialize every registered plugin.
    ///
    /// The first validation error or initialization failure aborts the whole
    /// call; plugins initialized before it are listed in the error.
    pub async fn initialize_plugins(
        &self,
        configs: HashMap<String, ToolConfiguration>,
    ) -> Result<InitializationReport> {
        if self.initialized.load(Ordering::SeqCst) {
            warn!("Plugin manager already initialized, skipping");
            return Ok(InitializationReport {
                already_initialized: true,
                ..Default::default()
            });
        }

        let entries: Vec<(String, Arc<dyn Plugin>, Option<ToolConfiguration>)> = {
            let registry = self.registry.read().await;
            let order = registry.load_order()?;
            order
                .into_iter()
                .filter_map(|name| {
                    registry
                        .get(&name)
                        .map(|entry| (name, entry.plugin.clone(), entry.config.clone()))
                })
                .collect()
        };

        info!("Initializing {} plugins", entries.len());
        let mut report = InitializationReport::default();

        for (name, plugin, registered_config) in entries {
            let config = configs
                .get(&name)
                .cloned()
                .or(registered_config)
                .unwrap_or_else(|| plugin.default_config());

            let validation = plugin.validate_config(&config);
            for warning in &validation.warnings {
                warn!("Plugin {} configuration warning: {}", name, warning);
                report.warnings.push((name.clone(), warning.clone()));
            }
            if !validation.valid || !validation.errors.is_empty() {
                error!(
                    "Plugin {} configuration invalid: {}",
                    name,
                    validation.errors.join("; ")
                );
                return Err(Error::ConfigValidation {
                    plugin: name,
                    errors: validation.errors,
                    initialized: report.initialized,
                });
            }

            if let Err(e) = plugin.initialize(&config).await {
                error!("Plugin {} failed to initialize: {}", name, e);
                return Err(Error::Initialization {
                    plugin: name,
                    message: e.to_string(),
                    initialized: report.initialized,
                });
            }

            debug!("Initialized plugin: {}", name);
            self.effective_configs
                .write()
                .await
                .insert(name.clone(), config);
            report.initialized.push(name);
        }

        self.initialized.store(true, Ordering::SeqCst);
        info!("Initialized {} plugins", report.initialized.len());
        Ok(report)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub async fn get_plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.registry
            .read()
            .await
            .get(name)
            .map(|entry| entry.plugin.clone())
    }

    pub async fn has_plugin(&self, name: &str) -> bool {
        self.registry.read().await.contains(name)
    }

    pub async fn plugin_count(&self) -> usize {
        self.registry.read().await.len()
    }

    /// Plugin names in registration order
    pub async fn plugin_names(&self) -> Vec<String> {
        self.registry.read().await.names().to_vec()
    }

    /// Dependencies-first order over every registered plugin
    pub async fn load_order(&self) -> Result<Vec<String>> {
        self.registry.read().await.load_order()
    }

    /// Plugins that declare a dependency on `name`
    pub async fn dependents(&self, name: &str) -> Vec<String> {
        self.registry.read().await.dependents(name)
    }

    pub async fn all_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.registry.read().await.filter(|_| true)
    }

    pub async fn incremental_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.registry
            .read()
            .await
            .filter(|plugin| plugin.supports_incremental())
    }

    pub async fn cachable_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.registry
            .read()
            .await
            .filter(|plugin| plugin.supports_cache())
    }

    /// Configuration a plugin runs with: the one chosen at initialization,
    /// else the registration override, else the plugin default
    pub async fn effective_config(&self, name: &str) -> Option<ToolConfiguration> {
        if let Some(config) = self.effective_configs.read().await.get(name) {
            return Some(config.clone());
        }
        let registry = self.registry.read().await;
        let entry = registry.get(name)?;
        Some(
            entry
                .config
                .clone()
                .unwrap_or_else(|| entry.plugin.default_config()),
        )
    }

    /// Record one execution of a plugin
    pub async fn update_plugin_metrics(
        &self,
        name: &str,
        execution_time: Duration,
        success: bool,
    ) -> Result<()> {
        let mut metrics = self.metrics.write().await;
        let entry = metrics
            .get_mut(name)
            .ok_or_else(|| Error::PluginNotFound(name.to_string()))?;
        entry.record(execution_time, success, Utc::now());
        debug!(
            "Plugin {} metrics: {} executions, average {:?}",
            name, entry.execution_count, entry.average_execution_time
        );
        Ok(())
    }

    pub async fn plugin_metrics(&self, name: &str) -> Option<PluginMetrics> {
        self.metrics.read().await.get(name).cloned()
    }

    pub async fn all_metrics(&self) -> HashMap<String, PluginMetrics> {
        self.metrics.read().await.clone()
    }

    /// Exclude a plugin from subsequent executions. Returns true if it was
    /// enabled before.
    pub fn disable_plugin(&self, name: &str) -> bool {
        let newly = self.disabled_set_mut().insert(name.to_string());
        if newly {
            info!("Disabled plugin: {}", name);
        }
        newly
    }

    /// Allow a disabled plugin to run again. Returns true if it was disabled.
    pub fn enable_plugin(&self, name: &str) -> bool {
        let removed = self.disabled_set_mut().remove(name);
        if removed {
            info!("Re-enabled plugin: {}", name);
        }
        removed
    }

    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        !self.disabled_set().contains(name)
    }

    /// Disabled plugin names, sorted
    pub fn disabled_plugins(&self) -> Vec<String> {
        let mut names: Vec<String> = self.disabled_set().iter().cloned().collect();
        names.sort();
        names
    }

    /// Run a plugin's cleanup hook without unregistering it.
    ///
    /// Hook failures are logged and swallowed.
    pub async fn release_plugin(&self, name: &str) {
        if let Some(plugin) = self.get_plugin(name).await {
            run_cleanup_hook(name, plugin.as_ref()).await;
        }
    }

    /// Bring a released plugin back into service.
    ///
    /// Once the manager is initialized the plugin is initialized again with
    /// its effective configuration. The disabled flag is cleared only when
    /// that succeeds; failures are logged and the plugin stays disabled.
    pub async fn reinstate_plugin(&self, name: &str) -> bool {
        let Some(plugin) = self.get_plugin(name).await else {
            debug!("Cannot reinstate unknown plugin {}", name);
            return false;
        };

        if self.is_initialized() {
            let config = self
                .effective_config(name)
                .await
                .unwrap_or_else(|| plugin.default_config());
            if let Err(e) = plugin.initialize(&config).await {
                warn!("Plugin {} failed to re-initialize, keeping it disabled: {}", name, e);
                return false;
            }
            debug!("Re-initialized plugin: {}", name);
        }

        self.enable_plugin(name);
        true
    }

    /// Execute one plugin and record its metrics.
    ///
    /// Execution failures are captured into a `ToolResult` with error status
    /// rather than returned. Only an unknown plugin name is an error.
    pub async fn execute_plugin(&self, name: &str, context: &ExecutionContext) -> Result<ToolResult> {
        let plugin = self
            .get_plugin(name)
            .await
            .ok_or_else(|| Error::PluginNotFound(name.to_string()))?;

        if !self.is_plugin_enabled(name) {
            debug!("Skipping disabled plugin: {}", name);
            return Ok(ToolResult::skipped(name, "plugin disabled by degradation policy"));
        }

        let config = self
            .effective_config(name)
            .await
            .unwrap_or_else(|| plugin.default_config());
        if !config.is_enabled() {
            debug!("Skipping plugin disabled in configuration: {}", name);
            return Ok(ToolResult::skipped(name, "plugin disabled in configuration"));
        }

        let plugin_context = context.for_plugin(name, config);
        let span = plugin_context.logger.clone();
        let start = Instant::now();
        let outcome = plugin.execute(&plugin_context).instrument(span).await;
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(mut result) => {
                if result.execution_time.is_zero() {
                    result.execution_time = elapsed;
                }
                result
            }
            Err(e) => {
                warn!("Plugin {} execution failed: {}", name, e);
                ToolResult::failed(name, elapsed, &e.to_string())
            }
        };

        let success = result.status != ToolStatus::Error;
        self.update_plugin_metrics(name, elapsed, success).await?;

        Ok(result)
    }

    /// Execute every enabled plugin concurrently.
    ///
    /// Results come back in registration order; disabled plugins are left
    /// out. No concurrency cap is applied here.
    pub async fn execute_all(&self, context: &ExecutionContext) -> Vec<ToolResult> {
        let names: Vec<String> = self
            .plugin_names()
            .await
            .into_iter()
            .filter(|name| self.is_plugin_enabled(name))
            .collect();

        debug!("Executing {} plugins", names.len());
        let outcomes = join_all(names.iter().map(|name| self.execute_plugin(name, context))).await;

        outcomes
            .into_iter()
            .zip(names)
            .filter_map(|(outcome, name)| match outcome {
                Ok(result) => Some(result),
                Err(e) => {
                    // Unregistered between snapshot and execution
                    warn!("Plugin {} vanished before execution: {}", name, e);
                    None
                }
            })
            .collect()
    }

    /// Remove a plugin, running its cleanup hook.
    ///
    /// The plugin is removed from the registry and metrics even when the
    /// hook fails.
    pub async fn unregister_plugin(&self, name: &str) -> Result<()> {
        let entry = {
            let mut registry = self.registry.write().await;
            let dependents = registry.dependents(name);
            if !dependents.is_empty() {
                warn!(
                    "Unregistering plugin {} while {} still depend on it",
                    name,
                    dependents.join(", ")
                );
            }
            registry.unregister(name)?
        };

        self.metrics.write().await.remove(name);
        self.effective_configs.write().await.remove(name);
        self.disabled_set_mut().remove(name);

        run_cleanup_hook(name, entry.plugin.as_ref()).await;
        info!("Unregistered plugin: {}", name);
        Ok(())
    }

    /// Clean up and remove every plugin, dependents first
    pub async fn cleanup(&self) {
        info!("Shutting down plugin manager");

        let names: Vec<String> = {
            let registry = self.registry.read().await;
            let mut names = registry.names().to_vec();
            names.reverse();
            names
        };

        for name in names {
            if let Err(e) = self.unregister_plugin(&name).await {
                error!("Failed to unregister plugin {}: {}", name, e);
            }
        }

        self.initialized.store(false, Ordering::SeqCst);
        info!("Plugin manager shutdown complete");
    }

    fn disabled_set(&self) -> std::sync::RwLockReadGuard<'_, HashSet<String>> {
        self.disabled.read().unwrap_or_else(|e| e.into_inner())
    }

    fn disabled_set_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashSet<String>> {
        self.disabled.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PluginManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_cleanup_hook(name: &str, plugin: &dyn Plugin) {
    match plugin.cleanup().await {
        Ok(()) => debug!("Cleaned up plugin: {}", name),
        Err(e) => warn!("Cleanup of plugin {} failed: {}", name, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::{Issue, Severity};
    use crate::testing::MockPlugin;

    fn mock(name: &str) -> Arc<MockPlugin> {
        Arc::new(MockPlugin::new(name))
    }

    #[tokio::test]
    async fn test_register_and_count() {
        let manager = PluginManager::new();
        manager.register_plugin(mock("eslint"), None).await.unwrap();
        manager.register_plugin(mock("prettier"), None).await.unwrap();

        assert_eq!(manager.plugin_count().await, 2);
        assert!(manager.has_plugin("eslint").await);
        assert_eq!(
            manager.plugin_metrics("eslint").await,
            Some(PluginMetrics::default())
        );
    }

    #[tokio::test]
    async fn test_load_order_and_dependents() {
        let manager = PluginManager::new();
        manager.register_plugin(mock("typescript"), None).await.unwrap();
        manager
            .register_plugin(
                Arc::new(MockPlugin::new("jest").with_dependencies(&["typescript"])),
                None,
            )
            .await
            .unwrap();

        assert_eq!(manager.load_order().await.unwrap(), vec!["typescript", "jest"]);
        assert_eq!(manager.dependents("typescript").await, vec!["jest"]);
        assert!(manager.dependents("jest").await.is_empty());
    }

    #[tokio::test]
    async fn test_register_plugins_is_fail_fast() {
        let manager = PluginManager::new();
        let plugins: Vec<Arc<dyn Plugin>> = vec![
            mock("a"),
            Arc::new(MockPlugin::new("b").with_dependencies(&["missing"])),
            mock("c"),
        ];

        let err = manager.register_plugins(plugins).await.unwrap_err();
        assert!(err.is_registration_error());
        assert_eq!(err.completed_plugins(), ["a".to_string()]);
        assert_eq!(manager.plugin_names().await, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_capability_filters() {
        let manager = PluginManager::new();
        manager
            .register_plugin(Arc::new(MockPlugin::new("eslint").incremental()), None)
            .await
            .unwrap();
        manager
            .register_plugin(Arc::new(MockPlugin::new("jest").cachable()), None)
            .await
            .unwrap();
        manager.register_plugin(mock("tsc"), None).await.unwrap();

        let names = |plugins: Vec<Arc<dyn Plugin>>| {
            plugins
                .iter()
                .map(|p| p.name().to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(names(manager.all_plugins().await).len(), 3);
        assert_eq!(names(manager.incremental_plugins().await), vec!["eslint"]);
        assert_eq!(names(manager.cachable_plugins().await), vec!["jest"]);
    }

    #[tokio::test]
    async fn test_initialize_uses_override_then_registration_then_default() {
        let manager = PluginManager::new();
        let a = mock("a");
        let b = mock("b");
        let c = mock("c");
        manager.register_plugin(a.clone(), None).await.unwrap();
        manager
            .register_plugin(b.clone(), Some(MockPlugin::config_with_timeout("b", 7)))
            .await
            .unwrap();
        manager.register_plugin(c.clone(), None).await.unwrap();

        let mut overrides = HashMap::new();
        overrides.insert("a".to_string(), MockPlugin::config_with_timeout("a", 3));

        let report = manager.initialize_plugins(overrides).await.unwrap();
        assert_eq!(report.initialized, vec!["a", "b", "c"]);
        assert!(manager.is_initialized());

        assert_eq!(a.initialized_with().unwrap().timeout(), Duration::from_secs(3));
        assert_eq!(b.initialized_with().unwrap().timeout(), Duration::from_secs(7));
        assert_eq!(
            c.initialized_with().unwrap(),
            MockPlugin::new("c").default_config()
        );
    }

    #[tokio::test]
    async fn test_initialize_twice_is_noop() {
        let manager = PluginManager::new();
        let plugin = mock("a");
        manager.register_plugin(plugin.clone(), None).await.unwrap();

        manager.initialize_plugins(HashMap::new()).await.unwrap();
        let second = manager.initialize_plugins(HashMap::new()).await.unwrap();

        assert!(second.already_initialized);
        assert_eq!(plugin.initialize_calls(), 1);
    }

    #[tokio::test]
    async fn test_validation_warning_is_not_fatal() {
        let manager = PluginManager::new();
        manager
            .register_plugin(
                Arc::new(MockPlugin::new("a").with_validation_warning("deprecated option")),
                None,
            )
            .await
            .unwrap();

        let report = manager.initialize_plugins(HashMap::new()).await.unwrap();
        assert_eq!(
            report.warnings,
            vec![("a".to_string(), "deprecated option".to_string())]
        );
    }

    #[tokio::test]
    async fn test_validation_error_aborts_initialization() {
        let manager = PluginManager::new();
        manager.register_plugin(mock("a"), None).await.unwrap();
        manager
            .register_plugin(
                Arc::new(MockPlugin::new("b").with_validation_error("missing binary")),
                None,
            )
            .await
            .unwrap();
        let c = mock("c");
        manager.register_plugin(c.clone(), None).await.unwrap();

        let err = manager.initialize_plugins(HashMap::new()).await.unwrap_err();
        match &err {
            Error::ConfigValidation {
                plugin,
                errors,
                initialized,
            } => {
                assert_eq!(plugin, "b");
                assert_eq!(errors, &vec!["missing binary".to_string()]);
                assert_eq!(initialized, &vec!["a".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!manager.is_initialized());
        assert_eq!(c.initialize_calls(), 0);
    }

    #[tokio::test]
    async fn test_plugin_init_failure_aborts_initialization() {
        let manager = PluginManager::new();
        manager
            .register_plugin(Arc::new(MockPlugin::new("a").failing_init()), None)
            .await
            .unwrap();

        let err = manager.initialize_plugins(HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::Initialization { ref plugin, .. } if plugin == "a"));
        assert!(!manager.is_initialized());
    }

    #[tokio::test]
    async fn test_update_metrics_average() {
        let manager = PluginManager::new();
        manager.register_plugin(mock("a"), None).await.unwrap();

        for ms in [100, 250, 50] {
            manager
                .update_plugin_metrics("a", Duration::from_millis(ms), ms != 50)
                .await
                .unwrap();
        }

        let metrics = manager.plugin_metrics("a").await.unwrap();
        assert_eq!(metrics.execution_count, 3);
        assert_eq!(metrics.total_execution_time, Duration::from_millis(400));
        assert_eq!(metrics.average_execution_time, Duration::from_nanos(400_000_000 / 3));
        assert_eq!(metrics.success_count, 2);
        assert_eq!(metrics.error_count, 1);
        assert!(metrics.last_execution_time.is_some());

        assert!(matches!(
            manager
                .update_plugin_metrics("nope", Duration::ZERO, true)
                .await,
            Err(Error::PluginNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_execute_captures_failure_into_result() {
        let manager = PluginManager::new();
        manager
            .register_plugin(Arc::new(MockPlugin::new("tsc").failing_execute()), None)
            .await
            .unwrap();

        let result = manager
            .execute_plugin("tsc", &ExecutionContext::new("."))
            .await
            .unwrap();

        assert_eq!(result.status, ToolStatus::Error);
        let metrics = manager.plugin_metrics("tsc").await.unwrap();
        assert_eq!(metrics.error_count, 1);
        assert_eq!(metrics.success_count, 0);
    }

    #[tokio::test]
    async fn test_execute_all_skips_disabled() {
        let manager = PluginManager::new();
        let issue = Issue::new("1", Severity::Warning, "style", "a.ts", 1, "x");
        manager
            .register_plugin(
                Arc::new(MockPlugin::new("eslint").with_issues(vec![issue])),
                None,
            )
            .await
            .unwrap();
        manager.register_plugin(mock("coverage"), None).await.unwrap();

        assert!(manager.disable_plugin("coverage"));
        assert!(!manager.disable_plugin("coverage"));

        let results = manager.execute_all(&ExecutionContext::new(".")).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].tool_name, "eslint");
        assert_eq!(results[0].issues.len(), 1);

        let skipped = manager
            .execute_plugin("coverage", &ExecutionContext::new("."))
            .await
            .unwrap();
        assert_eq!(skipped.status, ToolStatus::Warning);
        assert_eq!(
            manager.plugin_metrics("coverage").await.unwrap().execution_count,
            0
        );

        assert!(manager.enable_plugin("coverage"));
        assert!(manager.disabled_plugins().is_empty());
    }

    #[tokio::test]
    async fn test_reinstate_reinitializes_released_plugin() {
        let manager = PluginManager::new();
        let coverage = mock("coverage");
        manager.register_plugin(coverage.clone(), None).await.unwrap();
        manager.initialize_plugins(HashMap::new()).await.unwrap();

        manager.disable_plugin("coverage");
        manager.release_plugin("coverage").await;
        assert_eq!(coverage.cleanup_calls(), 1);

        assert!(manager.reinstate_plugin("coverage").await);
        assert_eq!(coverage.initialize_calls(), 2);
        assert!(manager.is_plugin_enabled("coverage"));
        assert!(!manager.reinstate_plugin("missing").await);
    }

    #[tokio::test]
    async fn test_reinstate_keeps_plugin_disabled_on_init_failure() {
        let manager = PluginManager::new();
        let flaky = Arc::new(MockPlugin::new("jest").failing_init());
        manager.register_plugin(flaky.clone(), None).await.unwrap();
        // Force the initialized flag without running the failing hook
        manager.initialized.store(true, Ordering::SeqCst);

        manager.disable_plugin("jest");
        assert!(!manager.reinstate_plugin("jest").await);
        assert_eq!(flaky.initialize_calls(), 1);
        assert!(!manager.is_plugin_enabled("jest"));
    }

    #[tokio::test]
    async fn test_unregister_swallows_cleanup_failure() {
        let manager = PluginManager::new();
        let plugin = Arc::new(MockPlugin::new("a").failing_cleanup());
        manager.register_plugin(plugin.clone(), None).await.unwrap();

        manager.unregister_plugin("a").await.unwrap();

        assert_eq!(plugin.cleanup_calls(), 1);
        assert!(!manager.has_plugin("a").await);
        assert!(manager.plugin_metrics("a").await.is_none());
        assert!(matches!(
            manager.unregister_plugin("a").await,
            Err(Error::PluginNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cleanup_removes_everything() {
        let manager = PluginManager::new();
        let a = mock("a");
        let b = Arc::new(MockPlugin::new("b").with_dependencies(&["a"]).failing_cleanup());
        manager.register_plugin(a.clone(), None).await.unwrap();
        manager.register_plugin(b.clone(), None).await.unwrap();
        manager.initialize_plugins(HashMap::new()).await.unwrap();

        manager.cleanup().await;

        assert_eq!(manager.plugin_count().await, 0);
        assert!(manager.all_metrics().await.is_empty());
        assert!(!manager.is_initialized());
        assert_eq!(a.cleanup_calls(), 1);
        assert_eq!(b.cleanup_calls(), 1);
    }
}
