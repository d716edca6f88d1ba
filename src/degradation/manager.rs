//! Degradation state machine
//!
//! State changes happen synchronously under one lock, so callers never
//! await while the level is in flux. Side effects that need a runtime
//! (plugin cleanup and re-initialization, and the recovery timer) are spawned onto the
//! current tokio runtime when there is one.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::clock::{elapsed_between, window_start};
use super::health::{self, health_score};
use super::{
    Clock, DegradationConfig, DegradationEvent, DegradationLevel, DegradationStrategy,
    DegradationTriggers, ErrorHistory, HealthMetrics, SystemClock,
};
use crate::plugin::PluginManager;

const EVENT_CAPACITY: usize = 256;

/// Snapshot reported by [`DegradationManager::statistics`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradationStatistics {
    pub current_level: DegradationLevel,
    #[serde(with = "humantime_serde")]
    pub time_in_level: Duration,
    pub last_level_change: DateTime<Utc>,
    pub disabled_plugin_count: usize,
    pub disabled_plugins: Vec<String>,
    pub health_score: f64,
    pub history_len: usize,
    pub last_sample: Option<HealthMetrics>,
    pub recovery_pending: bool,
}

struct State {
    level: DegradationLevel,
    last_level_change: DateTime<Utc>,
    disabled: BTreeSet<String>,
    history: VecDeque<HealthMetrics>,
}

struct RecoveryTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerSlot {
    next_generation: u64,
    current: Option<RecoveryTimer>,
}

struct Inner {
    config: DegradationConfig,
    clock: Arc<dyn Clock>,
    error_history: Option<Arc<dyn ErrorHistory>>,
    plugins: Option<Arc<PluginManager>>,
    events: broadcast::Sender<DegradationEvent>,
    state: Mutex<State>,
    timer: Mutex<TimerSlot>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(timer) = lock(&self.timer).current.take() {
            timer.handle.abort();
        }
    }
}

/// Plugin set changes produced by one level transition
#[derive(Default)]
struct Transition {
    newly_disabled: Vec<String>,
    re_enabled: Vec<String>,
}

pub struct DegradationManagerBuilder {
    config: DegradationConfig,
    clock: Arc<dyn Clock>,
    error_history: Option<Arc<dyn ErrorHistory>>,
    plugins: Option<Arc<PluginManager>>,
}

impl DegradationManagerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn error_history(mut self, history: Arc<dyn ErrorHistory>) -> Self {
        self.error_history = Some(history);
        self
    }

    /// Disable and re-enable plugins in `plugins` as the level changes
    pub fn plugin_manager(mut self, plugins: Arc<PluginManager>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn build(self) -> DegradationManager {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let now = self.clock.now();
        DegradationManager {
            inner: Arc::new(Inner {
                config: self.config,
                clock: self.clock,
                error_history: self.error_history,
                plugins: self.plugins,
                events,
                state: Mutex::new(State {
                    level: DegradationLevel::None,
                    last_level_change: now,
                    disabled: BTreeSet::new(),
                    history: VecDeque::new(),
                }),
                timer: Mutex::new(TimerSlot::default()),
            }),
        }
    }
}

/// Health-driven degradation with automatic step-wise recovery.
///
/// Cloning yields another handle to the same state. None of the operations
/// return errors; failures are logged and reflected in the health score.
/// Calls that change state (`update_health_metrics`, `force_degradation`,
/// `attempt_recovery`, `reset`) should be serialized by the caller.
#[derive(Clone)]
pub struct DegradationManager {
    inner: Arc<Inner>,
}

impl DegradationManager {
    pub fn new(config: DegradationConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: DegradationConfig) -> DegradationManagerBuilder {
        DegradationManagerBuilder {
            config,
            clock: Arc::new(SystemClock),
            error_history: None,
            plugins: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DegradationEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &DegradationConfig {
        &self.inner.config
    }

    pub fn current_level(&self) -> DegradationLevel {
        self.state().level
    }

    /// Strategy of the current level, `None` at full functionality
    pub fn current_strategy(&self) -> Option<DegradationStrategy> {
        self.inner.config.strategy(self.current_level()).cloned()
    }

    /// Plugins disabled by the current level, sorted
    pub fn disabled_plugins(&self) -> Vec<String> {
        self.state().disabled.iter().cloned().collect()
    }

    pub fn health_history(&self) -> Vec<HealthMetrics> {
        self.state().history.iter().cloned().collect()
    }

    pub fn has_pending_recovery(&self) -> bool {
        lock(&self.inner.timer)
            .current
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Record a health sample and step up one level if the next level's
    /// triggers are exceeded
    pub fn update_health_metrics(&self, sample: HealthMetrics) {
        let now = self.inner.clock.now();
        let mut events = Vec::new();

        let (transition, schedule_in) = {
            let mut state = self.state();
            let reason = state
                .level
                .next_higher()
                .and_then(|target| {
                    let strategy = self.inner.config.strategy(target)?;
                    self.trigger_reason(&strategy.triggers, &sample, now)
                        .map(|reason| (target, reason))
                });

            state.history.push_back(sample);
            health::prune(&mut state.history, now, self.inner.config.history_window);
            events.push(DegradationEvent::HealthUpdated {
                health_score: health_score(state.history.back(), state.level),
                level: state.level,
            });

            match reason {
                Some((target, reason)) => {
                    let from = state.level;
                    warn!("Degrading from {} to {}: {}", from, target, reason);
                    events.push(DegradationEvent::Triggered {
                        from,
                        to: target,
                        reason,
                    });
                    let transition = self.transition(&mut state, target, now);
                    self.policy_events(&state, &mut events);
                    (Some(transition), None)
                }
                None if state.level != DegradationLevel::None => {
                    let cooldown = self.cooldown(state.level);
                    let held = elapsed_between(state.last_level_change, now);
                    (None, Some(cooldown.saturating_sub(held)))
                }
                None => (None, None),
            }
        };

        if let Some(transition) = transition {
            self.cancel_recovery();
            self.publish(events);
            self.apply_to_plugins(transition);
        } else {
            self.publish(events);
            if let Some(delay) = schedule_in {
                if !self.has_pending_recovery() {
                    self.schedule_recovery(delay);
                }
            }
        }
    }

    /// Step down one level if the current level has been held for its
    /// cooldown and recent health meets its recovery conditions.
    ///
    /// Returns true when already at full functionality or when a step down
    /// happened.
    pub fn attempt_recovery(&self) -> bool {
        let now = self.inner.clock.now();

        let (from, to, transition) = {
            let mut state = self.state();
            let from = state.level;
            let (Some(to), Some(strategy)) = (from.next_lower(), self.inner.config.strategy(from))
            else {
                return true;
            };

            let held = elapsed_between(state.last_level_change, now);
            if held < strategy.recovery.cooldown_period {
                debug!(
                    "Recovery from {} blocked: held {:?} of {:?} cooldown",
                    from, held, strategy.recovery.cooldown_period
                );
                return false;
            }

            let window: Vec<&HealthMetrics> =
                health::recent(&state.history, now, strategy.recovery.monitoring_period).collect();
            if window.is_empty() {
                debug!("Recovery from {} blocked: no recent health samples", from);
                return false;
            }

            let n = window.len() as f64;
            let avg_success = window.iter().map(|s| s.success_rate).sum::<f64>() / n;
            let avg_response = window
                .iter()
                .map(|s| s.average_response_time.as_secs_f64())
                .sum::<f64>()
                / n;

            if avg_success < strategy.recovery.success_threshold
                || avg_response >= strategy.triggers.response_time.as_secs_f64()
            {
                debug!(
                    "Recovery from {} blocked: success {:.3} (need {:.3}), response {:.2}s",
                    from, avg_success, strategy.recovery.success_threshold, avg_response
                );
                return false;
            }

            let transition = self.transition(&mut state, to, now);
            (from, to, transition)
        };

        info!("Recovered from {} to {}", from, to);
        self.publish(vec![DegradationEvent::Recovered { from, to }]);
        self.apply_to_plugins(transition);

        if to == DegradationLevel::None {
            self.cancel_recovery();
        } else {
            self.schedule_recovery(self.cooldown(to));
        }
        true
    }

    /// Move straight to `level`, bypassing trigger evaluation
    pub fn force_degradation(&self, level: DegradationLevel, reason: &str) {
        let now = self.inner.clock.now();
        let mut events = Vec::new();

        let transition = {
            let mut state = self.state();
            let from = state.level;
            warn!("Forcing degradation from {} to {}: {}", from, level, reason);
            events.push(DegradationEvent::Forced {
                from,
                to: level,
                reason: reason.to_string(),
            });
            let transition = self.transition(&mut state, level, now);
            self.policy_events(&state, &mut events);
            transition
        };

        self.cancel_recovery();
        self.publish(events);
        self.apply_to_plugins(transition);
    }

    /// Return to full functionality and re-enable every plugin
    pub fn reset(&self) {
        let now = self.inner.clock.now();
        let (from, transition) = {
            let mut state = self.state();
            let from = state.level;
            (from, self.transition(&mut state, DegradationLevel::None, now))
        };

        info!("Degradation state reset from {}", from);
        self.cancel_recovery();
        self.publish(vec![DegradationEvent::Recovered {
            from,
            to: DegradationLevel::None,
        }]);
        self.apply_to_plugins(transition);
    }

    pub fn statistics(&self) -> DegradationStatistics {
        let now = self.inner.clock.now();
        let recovery_pending = self.has_pending_recovery();
        let state = self.state();
        let last_sample = state.history.back().cloned();

        DegradationStatistics {
            current_level: state.level,
            time_in_level: elapsed_between(state.last_level_change, now),
            last_level_change: state.last_level_change,
            disabled_plugin_count: state.disabled.len(),
            disabled_plugins: state.disabled.iter().cloned().collect(),
            health_score: health_score(last_sample.as_ref(), state.level),
            history_len: state.history.len(),
            last_sample,
            recovery_pending,
        }
    }

    fn trigger_reason(
        &self,
        triggers: &DegradationTriggers,
        sample: &HealthMetrics,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if sample.error_rate > triggers.error_rate {
            return Some(format!(
                "error rate {:.3} exceeds {:.3}",
                sample.error_rate, triggers.error_rate
            ));
        }
        if sample.memory_usage > triggers.memory_usage {
            return Some(format!(
                "memory usage {:.1}% exceeds {:.1}%",
                sample.memory_usage, triggers.memory_usage
            ));
        }
        if sample.cpu_usage > triggers.cpu_usage {
            return Some(format!(
                "cpu usage {:.1}% exceeds {:.1}%",
                sample.cpu_usage, triggers.cpu_usage
            ));
        }
        if sample.average_response_time > triggers.response_time {
            return Some(format!(
                "response time {:?} exceeds {:?}",
                sample.average_response_time, triggers.response_time
            ));
        }

        let since = window_start(now, self.inner.config.error_window);
        let consecutive = self
            .inner
            .error_history
            .as_ref()
            .map(|h| h.consecutive_errors(since))
            .unwrap_or(0);
        if consecutive > triggers.consecutive_errors {
            return Some(format!(
                "{} consecutive errors exceed {}",
                consecutive, triggers.consecutive_errors
            ));
        }

        None
    }

    /// Set the level and make the disabled set match it
    fn transition(
        &self,
        state: &mut State,
        level: DegradationLevel,
        now: DateTime<Utc>,
    ) -> Transition {
        let target = self.inner.config.disabled_through(level);
        let transition = Transition {
            newly_disabled: target.difference(&state.disabled).cloned().collect(),
            re_enabled: state.disabled.difference(&target).cloned().collect(),
        };

        state.level = level;
        state.last_level_change = now;
        state.disabled = target;
        transition
    }

    fn policy_events(&self, state: &State, events: &mut Vec<DegradationEvent>) {
        if let Some(strategy) = self.inner.config.strategy(state.level) {
            let actions = &strategy.actions;
            if actions.reduce_concurrency < 1.0 {
                events.push(DegradationEvent::ConcurrencyReduced {
                    factor: actions.reduce_concurrency,
                });
            }
            if actions.increase_timeouts > 1.0 {
                events.push(DegradationEvent::TimeoutsIncreased {
                    multiplier: actions.increase_timeouts,
                });
            }
            if actions.enable_caching {
                events.push(DegradationEvent::CachingEnabled);
            }
            if actions.skip_expensive_operations {
                events.push(DegradationEvent::ExpensiveOperationsSkipped);
            }
            if actions.enable_fallbacks {
                events.push(DegradationEvent::FallbacksEnabled);
            }
        }

        events.push(DegradationEvent::Applied {
            level: state.level,
            disabled_plugins: state.disabled.iter().cloned().collect(),
        });
    }

    /// Mirror a transition onto the plugin manager.
    ///
    /// Disabling is immediate. Cleanup hooks for newly disabled plugins and
    /// re-initialization of re-enabled ones run on a spawned task; a
    /// re-enabled plugin stays disabled until it has been initialized again.
    fn apply_to_plugins(&self, transition: Transition) {
        let Some(plugins) = &self.inner.plugins else {
            return;
        };

        let released: Vec<String> = transition
            .newly_disabled
            .into_iter()
            .filter(|name| plugins.disable_plugin(name))
            .collect();
        let re_enabled = transition.re_enabled;
        if released.is_empty() && re_enabled.is_empty() {
            return;
        }

        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                // Nothing was released without a runtime, so nothing needs re-initializing
                debug!(
                    "No runtime; skipping cleanup of {} plugins and re-enabling {} directly",
                    released.len(),
                    re_enabled.len()
                );
                for name in &re_enabled {
                    plugins.enable_plugin(name);
                }
                return;
            }
        };

        let plugins = Arc::clone(plugins);
        let weak = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            for name in released {
                plugins.release_plugin(&name).await;
            }
            for name in re_enabled {
                if !wants_enabled(&weak, &name) {
                    continue;
                }
                if plugins.reinstate_plugin(&name).await && !wants_enabled(&weak, &name) {
                    // A newer transition disabled it while it was initializing
                    plugins.disable_plugin(&name);
                }
            }
        });
    }

    fn cooldown(&self, level: DegradationLevel) -> Duration {
        self.inner
            .config
            .strategy(level)
            .map(|s| s.recovery.cooldown_period)
            .unwrap_or_default()
    }

    /// Replace any pending recovery attempt with one that fires after `delay`
    fn schedule_recovery(&self, delay: Duration) {
        if !self.inner.config.recovery_timer_enabled {
            return;
        }
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("No tokio runtime available; automatic recovery not scheduled");
                return;
            }
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let mut slot = lock(&self.inner.timer);
        slot.next_generation += 1;
        let generation = slot.next_generation;

        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                DegradationManager { inner }.on_recovery_timer(generation);
            }
        });

        if let Some(previous) = slot.current.replace(RecoveryTimer { generation, handle }) {
            previous.handle.abort();
        }
        debug!("Recovery attempt scheduled in {:?}", delay);
    }

    fn cancel_recovery(&self) {
        if let Some(timer) = lock(&self.inner.timer).current.take() {
            timer.handle.abort();
            debug!("Pending recovery attempt cancelled");
        }
    }

    fn on_recovery_timer(&self, generation: u64) {
        {
            let mut slot = lock(&self.inner.timer);
            match &slot.current {
                Some(timer) if timer.generation == generation => slot.current = None,
                _ => return,
            }
        }

        if !self.attempt_recovery() {
            let level = self.current_level();
            if level != DegradationLevel::None && !self.has_pending_recovery() {
                self.schedule_recovery(self.cooldown(level));
            }
        }
    }

    fn publish(&self, events: Vec<DegradationEvent>) {
        for event in events {
            // No subscribers is fine
            let _ = self.inner.events.send(event);
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.inner.state)
    }
}

/// True unless the manager's current level disables `name`
fn wants_enabled(inner: &Weak<Inner>, name: &str) -> bool {
    let Some(inner) = inner.upgrade() else {
        return true;
    };
    let disabled = lock(&inner.state).disabled.contains(name);
    !disabled
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
