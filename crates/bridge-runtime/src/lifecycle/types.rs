use std::sync::atomic::{AtomicI64, Ordering};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use bridge_net::MobileClient;

// ---------------------------------------------------------------------------
// TaskGroup — named collection of async tasks for ordered shutdown
// ---------------------------------------------------------------------------

/// A named group of async tasks that are shut down together.
///
/// Groups are assembled in *start order* and joined in *reverse order*
/// (LIFO) during shutdown: frame routing stops first (no more work enters
/// the pipeline), then the recovery loop and hot-reload dispatchers, then
/// the clients' own background loops. This ensures upstream producers exit
/// before the consumers they feed, mirroring spec §5's cancellation budget.
pub(crate) struct TaskGroup {
    pub(super) name: &'static str,
    handles: Vec<JoinHandle<()>>,
}

impl TaskGroup {
    pub(super) fn new(name: &'static str) -> Self {
        Self {
            name,
            handles: Vec::new(),
        }
    }

    pub(super) fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Join all tasks in this group. A join error (panic in a task) is
    /// logged and otherwise ignored — shutdown itself must not fail.
    pub(super) async fn wait(self) {
        let name = self.name;
        for handle in self.handles {
            if let Err(e) = handle.await {
                bridge_warn!(sys, task_group = name, error = %e, "task join error during shutdown");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineStats — frame-routing counters that don't belong to any single
// named ServiceStats (spec §4.E: "no queueing", "drop latest").
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct PipelineCounters {
    pub frames_routed: AtomicI64,
    pub frames_dropped: AtomicI64,
}

/// A read-only snapshot of the frame-routing counters, handed to the UI
/// collaborator alongside the three `ServiceStats` (spec §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineStats {
    pub frames_routed: i64,
    pub frames_dropped: i64,
}

impl PipelineCounters {
    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_routed: self.frames_routed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// MobileHandle — the currently-running Mobile Client plus the means to
// restart it wholesale. Its request/receive loops read config once at
// `run()` entry (interval, remote address, socket port), so a material
// config change (spec §4.E hot reload) is applied by replacing the whole
// client rather than mutating it in place.
// ---------------------------------------------------------------------------

pub(crate) struct MobileHandle {
    pub client: std::sync::Arc<MobileClient>,
    pub cancel: CancellationToken,
    pub task: JoinHandle<()>,
}
