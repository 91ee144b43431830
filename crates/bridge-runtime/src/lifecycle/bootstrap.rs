//! Initialization sequence (spec §4.E): the seven ordered steps — Console,
//! Engine, Watchers, DesktopClient, MobileClient, ParameterSync,
//! FinalSetup — each recorded in an [`InitProgress`](crate::progress::InitProgress).
//! A failed step is recorded but never aborts the run: the pipeline
//! continues in degraded mode and the recovery loop takes over from there.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Instant;

use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use bridge_config::{Config, ConfigStore};
use bridge_core::{Engine, Frame};
use bridge_net::{DesktopClient, MobileClient};
use bridge_rules::RulesRepository;

use crate::progress::{InitProgress, InitStep};

use super::types::MobileHandle;

/// Everything the orchestrator needs after bootstrap: the live component
/// handles plus the progress record of how bootstrap went.
pub(super) struct BootstrapOutput {
    pub engine: Arc<StdMutex<Engine>>,
    pub rules: Arc<RulesRepository>,
    pub rules_changed: Option<watch::Receiver<std::path::PathBuf>>,
    pub desktop: Arc<AsyncMutex<DesktopClient>>,
    pub mobile: MobileHandle,
    /// Kept so a later `mobile_client` config change can build a
    /// replacement [`MobileClient`] feeding the same frame-routing channel.
    pub frame_tx: mpsc::Sender<Frame>,
    pub frame_rx: mpsc::Receiver<Frame>,
    pub progress: InitProgress,
}

/// Runs the seven-step initialization sequence. `config_store` is already
/// open by the time this is called — loading the consolidated config is
/// the orchestrator's one fatal path (spec §7) and is handled by the
/// caller, before an `Orchestrator`/progress model even exists to report into.
/// `cancel` is the root token; the Mobile Client's background loops are
/// spawned under a child of it.
pub(super) async fn run_init_sequence(
    config_store: &ConfigStore,
    cancel: CancellationToken,
) -> BootstrapOutput {
    let mut progress = InitProgress::new();

    // Step 1: Console. The console renderer itself is an external
    // collaborator (spec §1 Non-goals); the orchestrator still reports the
    // step so the UI's progress model has a first entry to show.
    let started = step_begin(&mut progress, InitStep::Console);
    step_complete(&mut progress, InitStep::Console, started);

    // Step 2: Engine.
    let started = step_begin(&mut progress, InitStep::Engine);
    let config: Config = (*config_store.current().config).clone();

    let engine = Arc::new(StdMutex::new(Engine::new(
        config.transformation_engine.max_evaluation_iterations,
    )));
    let rules = Arc::new(RulesRepository::new(
        config.transformation_engine.config_path.clone(),
    ));
    {
        let mut engine = engine.lock().unwrap();
        let report = engine.load_rules(rules.as_ref());
        if let Some(err) = &report.load_error {
            bridge_warn!(engine, error = %err, "initial ruleset load degraded");
        }
    }
    step_complete(&mut progress, InitStep::Engine, started);

    // Step 3: Watchers. Config and rules watchers start now so a change
    // during the rest of bootstrap is not missed.
    let started = step_begin(&mut progress, InitStep::Watchers);
    let rules_changed = match rules.watch_changes() {
        Ok(rx) => {
            step_complete(&mut progress, InitStep::Watchers, started);
            Some(rx)
        }
        Err(e) => {
            step_fail(&mut progress, InitStep::Watchers, started, e.to_string());
            None
        }
    };

    // Step 4: DesktopClient.
    let started = step_begin(&mut progress, InitStep::DesktopClient);
    let mut desktop_client = DesktopClient::new(config.desktop_client.clone());
    if desktop_client.try_initialize().await {
        step_complete(&mut progress, InitStep::DesktopClient, started);
    } else {
        step_fail(
            &mut progress,
            InitStep::DesktopClient,
            started,
            "desktop client failed to connect on first attempt, deferred to recovery loop"
                .to_string(),
        );
    }
    let desktop = Arc::new(AsyncMutex::new(desktop_client));

    // Step 5: MobileClient.
    let started = step_begin(&mut progress, InitStep::MobileClient);
    let (frame_tx, frame_rx) = mpsc::channel(1);
    let mobile_client = Arc::new(MobileClient::new(config.mobile_client.clone(), frame_tx.clone()));
    if mobile_client.try_initialize().await {
        step_complete(&mut progress, InitStep::MobileClient, started);
    } else {
        step_fail(
            &mut progress,
            InitStep::MobileClient,
            started,
            "mobile client failed to bind on first attempt, deferred to recovery loop".to_string(),
        );
    }
    let mobile_cancel = cancel.child_token();
    let mobile_task = {
        let client = Arc::clone(&mobile_client);
        let cancel = mobile_cancel.clone();
        tokio::spawn(async move { client.run(cancel).await })
    };

    // Step 6: ParameterSync. Only meaningful once Connected; a cold start
    // with the avatar app not yet running is a normal degraded state, not
    // a bootstrap failure.
    let started = step_begin(&mut progress, InitStep::ParameterSync);
    {
        let mut desktop_guard = desktop.lock().await;
        if desktop_guard.is_connected() {
            let defs = engine.lock().unwrap().parameter_definitions();
            match desktop_guard.reconcile_parameters(&defs).await {
                Ok(()) => step_complete(&mut progress, InitStep::ParameterSync, started),
                Err(e) => step_fail(&mut progress, InitStep::ParameterSync, started, e.to_string()),
            }
        } else {
            step_fail(
                &mut progress,
                InitStep::ParameterSync,
                started,
                "desktop client not connected, parameter sync deferred".to_string(),
            );
        }
    }

    // Step 7: FinalSetup. Nothing left to do but mark the sequence done;
    // the orchestrator's caller spawns the frame-routing, recovery, and
    // hot-reload tasks once this function returns.
    let started = step_begin(&mut progress, InitStep::FinalSetup);
    step_complete(&mut progress, InitStep::FinalSetup, started);

    BootstrapOutput {
        engine,
        rules,
        rules_changed,
        desktop,
        mobile: MobileHandle {
            client: mobile_client,
            cancel: mobile_cancel,
            task: mobile_task,
        },
        frame_tx,
        frame_rx,
        progress,
    }
}

fn step_begin(progress: &mut InitProgress, step: InitStep) -> Instant {
    progress.begin(step);
    bridge_info!(sys, step = step.as_str(), "initialization step starting");
    Instant::now()
}

fn step_complete(progress: &mut InitProgress, step: InitStep, started: Instant) {
    progress.complete(step, started);
    bridge_info!(sys, step = step.as_str(), "initialization step completed");
}

fn step_fail(progress: &mut InitProgress, step: InitStep, started: Instant, reason: String) {
    progress.fail(step, started, reason.clone());
    bridge_warn!(sys, step = step.as_str(), reason = %reason, "initialization step failed, continuing in degraded mode");
}
