//! Integration tests for the degradation manager driving a plugin manager

use chrono::Utc;
use lintforge::degradation::Clock;
use lintforge::degradation::{
    DegradationConfig, DegradationEvent, DegradationLevel, DegradationManager, ErrorTracker,
    HealthMetrics, ManualClock,
};
use lintforge::plugin::{ExecutionContext, Plugin, PluginManager, ToolStatus};
use lintforge::testing::MockPlugin;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const TOOLS: [&str; 7] = [
    "eslint",
    "coverage",
    "complexity",
    "security",
    "duplication",
    "typescript",
    "jest",
];

async fn plugin_manager() -> Arc<PluginManager> {
    let manager = Arc::new(PluginManager::new());
    let plugins: Vec<Arc<dyn Plugin>> = TOOLS
        .iter()
        .map(|name| Arc::new(MockPlugin::new(name)) as Arc<dyn Plugin>)
        .collect();
    manager.register_plugins(plugins).await.unwrap();
    manager
}

fn events(rx: &mut broadcast::Receiver<DegradationEvent>) -> Vec<DegradationEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

fn sample(clock: &ManualClock) -> HealthMetrics {
    HealthMetrics::healthy(clock.now())
}

#[tokio::test]
async fn test_error_rate_spike_steps_once() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = DegradationManager::builder(DegradationConfig::default())
        .clock(clock.clone())
        .build();
    let mut rx = manager.subscribe();

    manager.update_health_metrics(HealthMetrics {
        error_rate: 0.06,
        ..sample(&clock)
    });

    assert_eq!(manager.current_level(), DegradationLevel::Minimal);
    let received = events(&mut rx);
    let transitions: Vec<_> = received
        .iter()
        .filter(|e| matches!(e, DegradationEvent::Triggered { .. }))
        .collect();
    assert_eq!(transitions.len(), 1);
    assert!(matches!(
        received[0],
        DegradationEvent::HealthUpdated { level: DegradationLevel::None, .. }
    ));
    assert!(matches!(
        received.last(),
        Some(DegradationEvent::Applied { level: DegradationLevel::Minimal, .. })
    ));
}

#[tokio::test]
async fn test_degradation_disables_plugins_for_execution() {
    let plugins = plugin_manager().await;
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = DegradationManager::builder(DegradationConfig::default())
        .clock(clock.clone())
        .plugin_manager(plugins.clone())
        .build();

    let overloaded = HealthMetrics {
        memory_usage: 85.0,
        ..sample(&clock)
    };
    manager.update_health_metrics(overloaded.clone());
    manager.update_health_metrics(overloaded);
    assert_eq!(manager.current_level(), DegradationLevel::Moderate);
    assert_eq!(plugins.disabled_plugins(), vec!["complexity", "coverage"]);

    let results = plugins.execute_all(&ExecutionContext::new("/repo")).await;
    let ran: Vec<&str> = results.iter().map(|r| r.tool_name.as_str()).collect();
    assert_eq!(ran, vec!["eslint", "security", "duplication", "typescript", "jest"]);

    let skipped = plugins
        .execute_plugin("coverage", &ExecutionContext::new("/repo"))
        .await
        .unwrap();
    assert_eq!(skipped.status, ToolStatus::Warning);
}

#[tokio::test]
async fn test_force_critical_then_step_down() {
    let plugins = plugin_manager().await;
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = DegradationManager::builder(DegradationConfig::default())
        .clock(clock.clone())
        .plugin_manager(plugins.clone())
        .build();

    manager.force_degradation(DegradationLevel::Critical, "incident");
    assert!(!manager.has_pending_recovery());
    assert_eq!(plugins.disabled_plugins().len(), 6);
    assert!(plugins.is_plugin_enabled("eslint"));

    // Not before the 15 minute cooldown
    clock.advance(Duration::from_secs(14 * 60));
    manager.update_health_metrics(sample(&clock));
    assert!(!manager.attempt_recovery());

    clock.advance(Duration::from_secs(60));
    manager.update_health_metrics(sample(&clock));
    assert!(manager.attempt_recovery());
    assert_eq!(manager.current_level(), DegradationLevel::Severe);
    // Re-enabled plugins come back once the spawned reinstatement has run
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(plugins.is_plugin_enabled("jest"));
    assert!(plugins.is_plugin_enabled("typescript"));
    assert!(!plugins.is_plugin_enabled("security"));
    assert!(manager.has_pending_recovery());

    // The cooldown restarts at the new level
    assert!(!manager.attempt_recovery());
    assert_eq!(manager.current_level(), DegradationLevel::Severe);
}

#[tokio::test]
async fn test_consecutive_errors_from_tracker() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let tracker = Arc::new(ErrorTracker::new());
    let manager = DegradationManager::builder(DegradationConfig::default())
        .clock(clock.clone())
        .error_history(tracker.clone())
        .build();

    for _ in 0..6 {
        tracker.record_error(clock.now());
    }
    manager.update_health_metrics(sample(&clock));
    manager.update_health_metrics(sample(&clock));
    assert_eq!(manager.current_level(), DegradationLevel::Moderate);

    // Errors older than the window stop counting
    clock.advance(Duration::from_secs(120));
    manager.update_health_metrics(sample(&clock));
    assert_eq!(manager.current_level(), DegradationLevel::Moderate);
}

#[tokio::test(start_paused = true)]
async fn test_recovery_timer_steps_down_automatically() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = DegradationManager::builder(DegradationConfig::default())
        .clock(clock.clone())
        .build();
    let mut rx = manager.subscribe();

    manager.force_degradation(DegradationLevel::Minimal, "drill");
    clock.advance(Duration::from_secs(120));
    // Cooldown already served, so the timer is due immediately
    manager.update_health_metrics(sample(&clock));
    assert!(manager.has_pending_recovery());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(manager.current_level(), DegradationLevel::None);
    assert!(!manager.has_pending_recovery());
    assert!(events(&mut rx)
        .iter()
        .any(|e| e.name() == "degradation:recovered"));
}

#[test]
fn test_statistics_reflect_state() {
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = DegradationManager::builder(DegradationConfig::default())
        .clock(clock.clone())
        .build();

    manager.force_degradation(DegradationLevel::Severe, "load test");
    clock.advance(Duration::from_secs(30));
    manager.update_health_metrics(HealthMetrics {
        error_rate: 0.1,
        success_rate: 0.9,
        ..sample(&clock)
    });

    let stats = manager.statistics();
    assert_eq!(stats.current_level, DegradationLevel::Severe);
    assert_eq!(stats.time_in_level, Duration::from_secs(30));
    assert_eq!(stats.disabled_plugin_count, 4);
    // 100 - 30 (level) - 3 (error rate) - 2 (success rate)
    assert!((stats.health_score - 65.0).abs() < 1e-9);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["currentLevel"], "severe");
    assert_eq!(json["timeInLevel"], "30s");
}

#[tokio::test]
async fn test_reenabled_plugin_is_initialized_before_it_runs() {
    let plugins = Arc::new(PluginManager::new());
    let coverage = Arc::new(MockPlugin::new("coverage"));
    plugins.register_plugin(coverage.clone(), None).await.unwrap();
    plugins.initialize_plugins(HashMap::new()).await.unwrap();

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let manager = DegradationManager::builder(DegradationConfig::default())
        .clock(clock.clone())
        .plugin_manager(plugins.clone())
        .build();

    manager.force_degradation(DegradationLevel::Moderate, "memory pressure");
    tokio::task::yield_now().await;
    manager.reset();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let result = plugins
        .execute_plugin("coverage", &ExecutionContext::new("/repo"))
        .await
        .unwrap();
    assert_eq!(result.status, ToolStatus::Success);
    assert_eq!(coverage.cleanup_calls(), 1);
    assert_eq!(coverage.initialize_calls(), 2);
    assert_eq!(coverage.execute_calls(), 1);
}
