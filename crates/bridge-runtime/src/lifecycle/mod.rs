mod bootstrap;
mod signal;
mod spawn;
mod types;

use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};

use orion_error::op_context;
use orion_error::prelude::*;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

use bridge_config::ConfigStore;
use bridge_core::{Engine, ServiceStats};
use bridge_net::DesktopClient;
use bridge_rules::RulesRepository;

use crate::error::{RuntimeReason, RuntimeResult};
use crate::progress::InitProgress;

// Re-export public API
pub use signal::wait_for_signal;

use bootstrap::run_init_sequence;
use spawn::{
    spawn_config_watch_task, spawn_frame_router, spawn_recovery_loop, spawn_rules_watch_task,
};
use types::{MobileHandle, PipelineCounters, PipelineStats, TaskGroup};

// ---------------------------------------------------------------------------
// Orchestrator — the top-level lifecycle handle
// ---------------------------------------------------------------------------

/// Owns the lifecycle of the Rules Repository, Transformation Engine,
/// Mobile Client, and Desktop Client: runs the seven-step initialization
/// sequence, routes frames end to end, and drives the recovery loop and
/// hot-reload dispatch while the pipeline is live (spec §4.E).
///
/// Task groups are stored in start order and joined in reverse (LIFO)
/// during [`shutdown`](Self::shutdown)'s counterpart [`wait`](Self::wait):
/// the config/rules watchers and recovery loop stop first (no more
/// hot-reload or reinit activity), then the frame router (no more work
/// enters the pipeline), and finally the Mobile Client's own background
/// loop.
pub struct Orchestrator {
    cancel: CancellationToken,
    groups: Vec<TaskGroup>,
    engine: Arc<StdMutex<Engine>>,
    rules: Arc<RulesRepository>,
    desktop: Arc<AsyncMutex<DesktopClient>>,
    mobile_slot: Arc<StdMutex<MobileHandle>>,
    pipeline: Arc<PipelineCounters>,
    progress: InitProgress,
    _config_store: ConfigStore,
}

impl Orchestrator {
    /// Bootstrap the entire pipeline from a consolidated config document
    /// at `config_path`. The only fatal path (spec §7): the config
    /// document cannot be parsed and no last-good copy exists — every
    /// other failure degrades into a `ServiceStats.is_healthy=false`
    /// that the recovery loop retries.
    #[tracing::instrument(name = "orchestrator.start", skip_all, fields(config = %config_path.display()))]
    pub async fn start(config_path: &Path) -> RuntimeResult<Self> {
        let mut op = op_context!("orchestrator-bootstrap").with_auto_log();
        op.record("config_path", config_path.display().to_string().as_str());

        let config_store = ConfigStore::open(config_path).owe(RuntimeReason::Bootstrap)?;
        let cancel = CancellationToken::new();

        let bootstrap::BootstrapOutput {
            engine,
            rules,
            rules_changed,
            desktop,
            mobile,
            frame_tx,
            frame_rx,
            progress,
        } = run_init_sequence(&config_store, cancel.clone()).await;

        bridge_info!(
            sys,
            elapsed_ms = progress.elapsed.as_millis() as u64,
            "initialization sequence complete"
        );

        let pipeline = Arc::new(PipelineCounters::default());
        let mobile_slot = Arc::new(StdMutex::new(mobile));

        // Start order: frame router, recovery loop, rules watch, config watch.
        // Joined in reverse on shutdown.
        let mut groups = Vec::with_capacity(4);

        groups.push(spawn_frame_router(
            frame_rx,
            Arc::clone(&engine),
            Arc::clone(&desktop),
            Arc::clone(&pipeline),
            cancel.child_token(),
        ));

        let config = (*config_store.current().config).clone();
        groups.push(spawn_recovery_loop(
            &config,
            Arc::clone(&engine),
            Arc::clone(&rules),
            Arc::clone(&desktop),
            Arc::clone(&mobile_slot),
            cancel.child_token(),
        ));

        groups.push(spawn_rules_watch_task(
            rules_changed,
            Arc::clone(&engine),
            cancel.child_token(),
        ));

        groups.push(spawn_config_watch_task(
            config_store.subscribe(),
            config,
            Arc::clone(&engine),
            Arc::clone(&rules),
            Arc::clone(&desktop),
            Arc::clone(&mobile_slot),
            frame_tx,
            cancel.clone(),
            cancel.child_token(),
        ));

        op.mark_suc();
        Ok(Self {
            cancel,
            groups,
            engine,
            rules,
            desktop,
            mobile_slot,
            pipeline,
            progress,
            _config_store: config_store,
        })
    }

    /// Request graceful shutdown of all tasks.
    pub fn shutdown(&self) {
        bridge_info!(sys, "initiating graceful shutdown");
        self.cancel.cancel();
    }

    /// Wait for all task groups, and the Mobile Client's own background
    /// loop, to complete after [`shutdown`](Self::shutdown).
    pub async fn wait(mut self) {
        while let Some(group) = self.groups.pop() {
            let name = group.name;
            bridge_debug!(sys, task_group = name, "waiting for task group to finish");
            group.wait().await;
            bridge_debug!(sys, task_group = name, "task group finished");
        }

        // Every task that held a clone of `mobile_slot` has already been
        // joined above, so this is the last reference standing; the
        // placeholder left behind is never observed.
        let mobile = {
            let mut guard = self.mobile_slot.lock().unwrap();
            let placeholder = MobileHandle {
                client: guard.client.clone(),
                cancel: guard.cancel.clone(),
                task: tokio::spawn(async {}),
            };
            std::mem::replace(&mut *guard, placeholder)
        };
        mobile.cancel.cancel();
        if let Err(e) = mobile.task.await {
            bridge_warn!(sys, error = %e, "mobile client task join error during shutdown");
        }
    }

    /// Returns a clone of the root cancellation token (for signal integration).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Snapshot of the initialization progress model (spec §6), read once
    /// at `start()` completion — the per-step detail a UI collaborator
    /// polls for the bootstrap screen.
    pub fn init_progress(&self) -> &InitProgress {
        &self.progress
    }

    /// The three named `ServiceStats` snapshots a UI collaborator polls
    /// at ≤10 Hz (spec §6), plus the frame-routing counters under
    /// [`pipeline_stats`](Self::pipeline_stats).
    pub async fn service_stats(&self) -> [ServiceStats; 3] {
        let engine_stats = self.engine.lock().unwrap().stats();
        let desktop_stats = self.desktop.lock().await.stats();
        let mobile_stats = { self.mobile_slot.lock().unwrap().client.clone() }.stats();
        [engine_stats, desktop_stats, mobile_stats]
    }

    /// Frame-routing counters (spec §4.E "no queueing, drop latest").
    pub fn pipeline_stats(&self) -> PipelineStats {
        self.pipeline.snapshot()
    }

    /// Whether the Rules Repository's background watcher is known to be
    /// pointed at the currently-configured rule file. Exposed mainly for
    /// tests; UI collaborators read `service_stats()` instead.
    pub fn rules_path(&self) -> std::path::PathBuf {
        self.rules.path()
    }
}
