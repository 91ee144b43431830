//! Background task construction: frame routing, the recovery loop, and
//! config/rules hot-reload dispatch (spec §4.E). Each `spawn_*` function
//! builds whatever channel it needs and returns a [`TaskGroup`] so
//! [`mod.rs`](super) can join them in LIFO order during shutdown.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use bridge_config::{Config, ConfigView};
use bridge_core::{Engine, Frame};
use bridge_net::{DesktopClient, MobileClient};
use bridge_rules::RulesRepository;

use crate::backoff::next_backoff;

use super::types::{MobileHandle, PipelineCounters, TaskGroup};

/// Routes every decoded frame through the engine and on to the desktop
/// client. No queueing: a frame that arrives while the previous one is
/// still being sent to the desktop is dropped (spec §5, "drop latest").
pub(super) fn spawn_frame_router(
    mut frame_rx: mpsc::Receiver<Frame>,
    engine: Arc<StdMutex<Engine>>,
    desktop: Arc<AsyncMutex<DesktopClient>>,
    counters: Arc<PipelineCounters>,
    cancel: CancellationToken,
) -> TaskGroup {
    let mut group = TaskGroup::new("frame-router");
    group.push(tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                _ = cancel.cancelled() => break,
                frame = frame_rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            let desktop_frame = {
                let mut engine = engine.lock().unwrap();
                engine.transform(&frame)
            };

            if desktop_frame.parameters.is_empty() {
                continue;
            }

            let Ok(mut desktop_guard) =
                tokio::time::timeout(Duration::from_millis(50), desktop.lock()).await
            else {
                counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            };

            if !desktop_guard.is_connected() {
                counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
                continue;
            }

            match desktop_guard.send_frame(&desktop_frame).await {
                Ok(()) => {
                    counters.frames_routed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
                    bridge_warn!(net, error = %e, "send_frame failed, frame dropped");
                }
            }
        }
        bridge_info!(sys, "frame router stopped");
    }));
    group
}

struct RetryState {
    unhealthy_since: Option<Instant>,
    attempt: u32,
    next_attempt_at: Option<Instant>,
}

impl RetryState {
    fn new() -> Self {
        Self {
            unhealthy_since: None,
            attempt: 0,
            next_attempt_at: None,
        }
    }

    fn on_healthy(&mut self) {
        self.unhealthy_since = None;
        self.attempt = 0;
        self.next_attempt_at = None;
    }

    /// Returns whether a reinit attempt is due this tick.
    fn due(&mut self, now: Instant, grace: Duration) -> bool {
        let since = *self.unhealthy_since.get_or_insert(now);
        let due = self.next_attempt_at.is_none_or(|t| now >= t);
        now.duration_since(since) >= grace && due
    }

    fn on_reinit_failed(&mut self, now: Instant, base: Duration, max: Duration, jitter: f64) {
        let delay = next_backoff(self.attempt, base, max, jitter);
        self.attempt += 1;
        self.next_attempt_at = Some(now + delay);
    }
}

/// Periodic health poll driving `try_initialize()` reinit attempts with
/// per-service exponential backoff (spec §4.E). Reads the Mobile Client
/// through `mobile_slot` so a hot-swapped client (spec §4.E config change)
/// is always the one this loop is polling.
pub(super) fn spawn_recovery_loop(
    config: &Config,
    engine: Arc<StdMutex<Engine>>,
    rules: Arc<RulesRepository>,
    desktop: Arc<AsyncMutex<DesktopClient>>,
    mobile_slot: Arc<StdMutex<MobileHandle>>,
    cancel: CancellationToken,
) -> TaskGroup {
    let grace = Duration::from_millis(config.general.unhealthy_grace_period_ms);
    let base = Duration::from_millis(config.general.backoff_base_ms);
    let max = Duration::from_millis(config.general.backoff_max_ms);
    let jitter = config.general.backoff_jitter;
    let tick = Duration::from_secs_f64(1.0 / config.general.recovery_tick_hz);

    let mut group = TaskGroup::new("recovery");
    group.push(tokio::spawn(async move {
        let mut desktop_retry = RetryState::new();
        let mut mobile_retry = RetryState::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(tick) => {}
            }

            let now = Instant::now();

            if engine.lock().unwrap().config_changed() {
                let report = {
                    let mut engine = engine.lock().unwrap();
                    engine.load_rules(rules.as_ref())
                };
                if let Some(err) = &report.load_error {
                    bridge_warn!(engine, error = %err, "hot-reload ruleset load degraded");
                } else {
                    bridge_info!(engine, valid = report.valid_rules.len(), "ruleset hot-reloaded");
                }
            }

            if desktop.lock().await.stats().is_healthy {
                desktop_retry.on_healthy();
            } else if desktop_retry.due(now, grace) {
                let mut desktop_guard = desktop.lock().await;
                if desktop_guard.try_initialize().await {
                    bridge_info!(recovery, "desktop client reinitialized");
                    desktop_retry.on_healthy();
                } else {
                    desktop_retry.on_reinit_failed(now, base, max, jitter);
                }
            }

            let mobile = { mobile_slot.lock().unwrap().client.clone() };
            if mobile.stats().is_healthy {
                mobile_retry.on_healthy();
            } else if mobile_retry.due(now, grace) {
                if mobile.try_initialize().await {
                    bridge_info!(recovery, "mobile client reinitialized");
                    mobile_retry.on_healthy();
                } else {
                    mobile_retry.on_reinit_failed(now, base, max, jitter);
                }
            }
        }
        bridge_info!(sys, "recovery loop stopped");
    }));
    group
}

/// Watches the rules file for changes and asks the engine to reload
/// (spec §4.A/§4.E). A `None` receiver (watcher failed to start during
/// bootstrap) degrades to no hot reload for rule-file edits.
pub(super) fn spawn_rules_watch_task(
    rules_changed: Option<watch::Receiver<std::path::PathBuf>>,
    engine: Arc<StdMutex<Engine>>,
    cancel: CancellationToken,
) -> TaskGroup {
    let mut group = TaskGroup::new("rules-watch");
    if let Some(mut rx) = rules_changed {
        group.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        engine.lock().unwrap().mark_config_changed();
                    }
                }
            }
            bridge_info!(sys, "rules watch task stopped");
        }));
    }
    group
}

/// Watches the consolidated config for changes and applies section deltas
/// to the running components (spec §4.E "hot reload dispatch").
///
/// The Mobile Client's request/receive loops read their config once at
/// `run()` entry, so a material `mobile_client` change is applied by
/// swapping in a fresh client under a fresh child token rather than
/// mutating the running one. `frame_tx` feeds the replacement the same
/// frame-routing channel the original was built with; `mobile_slot` is
/// updated in place so the recovery loop picks up the new client on its
/// next tick.
#[allow(clippy::too_many_arguments)]
pub(super) fn spawn_config_watch_task(
    mut config_rx: watch::Receiver<ConfigView>,
    mut last_config: Config,
    engine: Arc<StdMutex<Engine>>,
    rules: Arc<RulesRepository>,
    desktop: Arc<AsyncMutex<DesktopClient>>,
    mobile_slot: Arc<StdMutex<MobileHandle>>,
    frame_tx: mpsc::Sender<Frame>,
    root_cancel: CancellationToken,
    cancel: CancellationToken,
) -> TaskGroup {
    let mut group = TaskGroup::new("config-watch");
    group.push(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                changed = config_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }

            let view = config_rx.borrow().clone();
            let new_config = (*view.config).clone();

            if new_config.transformation_engine.config_path
                != last_config.transformation_engine.config_path
            {
                rules.set_path(new_config.transformation_engine.config_path.clone());
                engine.lock().unwrap().mark_config_changed();
                bridge_info!(conf, "transformation_engine.config_path changed, rules reload pending");
            } else if new_config.transformation_engine.max_evaluation_iterations
                != last_config.transformation_engine.max_evaluation_iterations
            {
                engine.lock().unwrap().mark_config_changed();
            }

            if new_config.desktop_client != last_config.desktop_client {
                desktop
                    .lock()
                    .await
                    .apply_config(new_config.desktop_client.clone());
                bridge_info!(conf, "desktop_client config changed, reconnect pending");
            }

            if new_config.mobile_client != last_config.mobile_client {
                bridge_info!(conf, "mobile_client config changed, restarting mobile client");
                let new_client = Arc::new(MobileClient::new(
                    new_config.mobile_client.clone(),
                    frame_tx.clone(),
                ));
                if !new_client.try_initialize().await {
                    bridge_warn!(
                        conf,
                        "replacement mobile client failed to bind, deferred to recovery loop"
                    );
                }
                let new_cancel = root_cancel.child_token();
                let spawned = {
                    let client = Arc::clone(&new_client);
                    let cancel = new_cancel.clone();
                    tokio::spawn(async move { client.run(cancel).await })
                };

                let old = {
                    let mut guard = mobile_slot.lock().unwrap();
                    std::mem::replace(
                        &mut *guard,
                        MobileHandle {
                            client: new_client,
                            cancel: new_cancel,
                            task: spawned,
                        },
                    )
                };
                old.cancel.cancel();
                if let Err(e) = old.task.await {
                    bridge_warn!(sys, error = %e, "old mobile client task join error");
                }
            }

            last_config = new_config;
        }
        bridge_info!(sys, "config watch task stopped");
    }));
    group
}
