//! Integration tests for plugin registration, initialization, execution and
//! teardown through the public `PluginManager` API

use chrono::Utc;
use lintforge::plugin::{
    ExecutionContext, Issue, Plugin, PluginManager, PluginMetrics, Severity, ToolStatus,
};
use lintforge::testing::MockPlugin;
use lintforge::Error;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn plugin(name: &str) -> Arc<dyn Plugin> {
    Arc::new(MockPlugin::new(name))
}

fn dependent(name: &str, deps: &[&str]) -> Arc<dyn Plugin> {
    mock(MockPlugin::new(name).with_dependencies(deps))
}

fn mock(plugin: MockPlugin) -> Arc<dyn Plugin> {
    Arc::new(plugin)
}

#[tokio::test]
async fn test_dependency_order_matters_for_registration() {
    let manager = PluginManager::new();
    let err = manager
        .register_plugins(vec![dependent("b", &["a"]), plugin("a")])
        .await
        .unwrap_err();
    assert!(err.is_registration_error());
    assert!(err.completed_plugins().is_empty());
    assert_eq!(manager.plugin_count().await, 0);

    let manager = PluginManager::new();
    let registered = manager
        .register_plugins(vec![plugin("a"), dependent("b", &["a"])])
        .await
        .unwrap();
    assert_eq!(registered, vec!["a", "b"]);
    assert_eq!(manager.plugin_count().await, 2);
}

#[tokio::test]
async fn test_registration_is_fail_fast_not_atomic() {
    let manager = PluginManager::new();
    let err = manager
        .register_plugins(vec![plugin("eslint"), plugin("eslint"), plugin("jest")])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::PartialRegistration { ref source, .. }
            if matches!(**source, Error::DuplicatePlugin(_))
    ));
    assert_eq!(err.completed_plugins(), ["eslint".to_string()]);
    assert!(manager.has_plugin("eslint").await);
    assert!(!manager.has_plugin("jest").await);
}

#[tokio::test]
async fn test_full_lifecycle() {
    let manager = PluginManager::new();
    let eslint = Arc::new(
        MockPlugin::new("eslint")
            .incremental()
            .with_issues(vec![Issue::new(
                "no-unused",
                Severity::Warning,
                "style",
                "src/app.ts",
                3,
                "unused variable",
            )]),
    );
    let jest = Arc::new(MockPlugin::new("jest").cachable().failing_execute());
    manager.register_plugin(eslint.clone(), None).await.unwrap();
    manager.register_plugin(jest.clone(), None).await.unwrap();

    let report = manager.initialize_plugins(HashMap::new()).await.unwrap();
    assert_eq!(report.initialized, vec!["eslint", "jest"]);
    assert!(manager.is_initialized());
    assert_eq!(manager.incremental_plugins().await.len(), 1);
    assert_eq!(manager.cachable_plugins().await.len(), 1);

    let results = manager.execute_all(&ExecutionContext::new("/project")).await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].tool_name, "eslint");
    assert_eq!(results[0].issues.len(), 1);
    assert_eq!(results[1].status, ToolStatus::Error);

    let jest_metrics = manager.plugin_metrics("jest").await.unwrap();
    assert_eq!(jest_metrics.execution_count, 1);
    assert_eq!(jest_metrics.error_count, 1);

    manager.cleanup().await;
    assert_eq!(manager.plugin_count().await, 0);
    assert!(manager.all_metrics().await.is_empty());
    assert_eq!(eslint.cleanup_calls(), 1);
    assert_eq!(jest.cleanup_calls(), 1);
    assert!(!manager.is_initialized());
}

#[tokio::test]
async fn test_initialization_aborts_on_invalid_config() {
    let manager = PluginManager::new();
    manager
        .register_plugins(vec![
            plugin("prettier"),
            mock(MockPlugin::new("tsc").with_validation_error("tsconfig.json not found")),
            plugin("stylelint"),
        ])
        .await
        .unwrap();

    let err = manager.initialize_plugins(HashMap::new()).await.unwrap_err();
    match &err {
        Error::ConfigValidation { plugin, errors, .. } => {
            assert_eq!(plugin, "tsc");
            assert_eq!(errors, &vec!["tsconfig.json not found".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.completed_plugins(), ["prettier".to_string()]);
    assert!(!manager.is_initialized());
}

#[tokio::test]
async fn test_explicit_config_overrides_default() {
    let manager = PluginManager::new();
    let eslint = Arc::new(MockPlugin::new("eslint"));
    manager.register_plugin(eslint.clone(), None).await.unwrap();

    let override_config = MockPlugin::config_with_timeout("eslint", 15);
    let configs = HashMap::from([("eslint".to_string(), override_config.clone())]);
    manager.initialize_plugins(configs).await.unwrap();

    assert_eq!(eslint.initialized_with(), Some(override_config.clone()));
    assert_eq!(manager.effective_config("eslint").await, Some(override_config));
}

#[tokio::test]
async fn test_unregister_swallows_cleanup_failure() {
    let manager = PluginManager::new();
    manager
        .register_plugin(mock(MockPlugin::new("jest").failing_cleanup()), None)
        .await
        .unwrap();
    manager
        .update_plugin_metrics("jest", Duration::from_millis(5), true)
        .await
        .unwrap();

    manager.unregister_plugin("jest").await.unwrap();
    assert!(!manager.has_plugin("jest").await);
    assert!(manager.plugin_metrics("jest").await.is_none());
}

#[tokio::test]
async fn test_update_metrics_running_average() {
    let manager = PluginManager::new();
    manager.register_plugin(plugin("eslint"), None).await.unwrap();
    for (ms, ok) in [(100, true), (300, false), (200, true)] {
        manager
            .update_plugin_metrics("eslint", Duration::from_millis(ms), ok)
            .await
            .unwrap();
    }

    let metrics = manager.plugin_metrics("eslint").await.unwrap();
    assert_eq!(metrics.execution_count, 3);
    assert_eq!(metrics.total_execution_time, Duration::from_millis(600));
    assert_eq!(metrics.average_execution_time, Duration::from_millis(200));
    assert_eq!(metrics.success_count, 2);
    assert_eq!(metrics.error_count, 1);
    assert!(metrics.last_execution_time.is_some());
}

proptest! {
    #[test]
    fn prop_average_is_order_independent(
        times in prop::collection::vec(0u64..10_000_000, 1..40)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
    ) {
        let (original, shuffled) = times;
        let now = Utc::now();

        let mut a = PluginMetrics::default();
        for t in &original {
            a.record(Duration::from_micros(*t), true, now);
        }
        let mut b = PluginMetrics::default();
        for t in &shuffled {
            b.record(Duration::from_micros(*t), true, now);
        }

        let total: u64 = original.iter().sum();
        let expected = Duration::from_nanos(total * 1_000 / original.len() as u64);
        prop_assert_eq!(a.average_execution_time, b.average_execution_time);
        prop_assert_eq!(a.average_execution_time, expected);
    }

    #[test]
    fn prop_acyclic_chains_register_fully(len in 1usize..25) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let count = runtime.block_on(async {
            let manager = PluginManager::new();
            let plugins: Vec<Arc<dyn Plugin>> = (0..len)
                .map(|i| {
                    let name = format!("p{i}");
                    if i == 0 {
                        plugin(&name)
                    } else {
                        let dep = format!("p{}", i - 1);
                        dependent(&name, &[dep.as_str()])
                    }
                })
                .collect();
            manager.register_plugins(plugins).await.unwrap();
            manager.plugin_count().await
        });
        prop_assert_eq!(count, len);
    }
}
