use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};

use crate::config::Config;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// A view of the consolidated config document: the last successfully
/// parsed value, plus the error from the most recent failed reparse (if
/// any). A malformed document never clears a previously-good value.
#[derive(Debug, Clone)]
pub struct ConfigView {
    pub config: Arc<Config>,
    pub last_error: Option<String>,
}

/// Owns the consolidated config file and its watcher. `subscribe()` hands
/// out a `watch::Receiver` that observes every successful reparse; readers
/// that only care about "has it changed" can use `changed()`, readers that
/// want the value can call `borrow()`.
pub struct ConfigStore {
    path: PathBuf,
    tx: watch::Sender<ConfigView>,
    _watcher: RecommendedWatcher,
}

impl ConfigStore {
    /// Parse `path` once, then start a background watcher that reparses on
    /// every file-system change and republishes the result.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let config = Config::load(&path)?;

        let (tx, _rx) = watch::channel(ConfigView {
            config: Arc::new(config),
            last_error: None,
        });

        let (fs_tx, fs_rx) = mpsc::channel::<()>(16);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) {
                    let _ = fs_tx.try_send(());
                }
            }
        })?;
        watcher.watch(&path, RecursiveMode::NonRecursive)?;

        spawn_reload_task(path.clone(), tx.clone(), fs_rx);

        Ok(Self {
            path,
            tx,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subscribe(&self) -> watch::Receiver<ConfigView> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ConfigView {
        self.tx.borrow().clone()
    }
}

fn spawn_reload_task(
    path: PathBuf,
    tx: watch::Sender<ConfigView>,
    mut fs_rx: mpsc::Receiver<()>,
) {
    tokio::spawn(async move {
        while fs_rx.recv().await.is_some() {
            tokio::time::sleep(DEBOUNCE).await;
            while fs_rx.try_recv().is_ok() {}

            match Config::load(&path) {
                Ok(config) => {
                    tracing::info!(domain = "conf", path = %path.display(), "config reloaded");
                    let _ = tx.send(ConfigView {
                        config: Arc::new(config),
                        last_error: None,
                    });
                }
                Err(e) => {
                    tracing::warn!(domain = "conf", path = %path.display(), error = %e, "config reload failed, retaining last-good");
                    let mut view = tx.borrow().clone();
                    view.last_error = Some(e.to_string());
                    let _ = tx.send(view);
                }
            }
        }
    });
}
