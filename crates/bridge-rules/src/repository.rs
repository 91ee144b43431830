use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use bridge_core::{compile_ruleset, Ruleset, RulesSource, RulesetLoadReport};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{mpsc, watch};

use crate::wire::parse_ruleset_document;

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Produces a validated [`Ruleset`] from a rule-file path, caching the
/// last-successful result and announcing file changes (spec §4.A).
///
/// The path itself is mutable: spec §4.A fires `RulesChanged` both on
/// mtime change AND when `transformation_engine.config_path` changes, so
/// the orchestrator updates the path in place via `set_path` when it
/// observes that section change, rather than rebuilding the repository.
pub struct RulesRepository {
    path: Mutex<PathBuf>,
    cache: Mutex<Option<Ruleset>>,
}

impl RulesRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Mutex::new(path.into()),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.path.lock().unwrap().clone()
    }

    /// Points this repository at a new rule file, e.g. after
    /// `transformation_engine.config_path` changes in the consolidated
    /// config. Does not itself reload — the caller still decides when to
    /// call `load()`, matching the Repository's "never swap implicitly"
    /// contract.
    pub fn set_path(&self, path: impl Into<PathBuf>) {
        *self.path.lock().unwrap() = path.into();
    }

    fn fallback_report(&self, load_error: String) -> RulesetLoadReport {
        match self.cache.lock().unwrap().clone() {
            Some(cached) => RulesetLoadReport {
                valid_rules: cached.rules,
                invalid_rules: cached.invalid_rules,
                validation_errors: vec![],
                loaded_from_cache: true,
                load_error: Some(load_error),
            },
            None => RulesetLoadReport {
                valid_rules: vec![],
                invalid_rules: vec![],
                validation_errors: vec![],
                loaded_from_cache: false,
                load_error: Some(load_error),
            },
        }
    }

    /// Start a background watcher on the rule file's parent directory
    /// (the file itself may not exist yet). Returns a receiver that ticks
    /// once per debounced change; the caller decides when to re-`load()`.
    pub fn watch_changes(&self) -> anyhow::Result<watch::Receiver<PathBuf>> {
        let path = self.path();
        let watch_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        let (tx, rx) = watch::channel(path.clone());
        let (fs_tx, mut fs_rx) = mpsc::channel::<()>(16);

        let watch_target = path.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let relevant = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                ) && event.paths.iter().any(|p| p == &watch_target);
                if relevant {
                    let _ = fs_tx.try_send(());
                }
            }
        })?;
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        tokio::spawn(async move {
            // Keep the watcher alive for the life of the task.
            let _watcher = watcher;
            while fs_rx.recv().await.is_some() {
                tokio::time::sleep(DEBOUNCE).await;
                while fs_rx.try_recv().is_ok() {}
                tracing::info!(domain = "conf", path = %path.display(), "rules file changed");
                let _ = tx.send(path.clone());
            }
        });

        Ok(rx)
    }
}

impl RulesSource for RulesRepository {
    fn load(&self) -> RulesetLoadReport {
        let path = self.path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                return self.fallback_report(format!("failed to read {}: {e}", path.display()));
            }
        };

        let defs = match parse_ruleset_document(&content) {
            Ok(defs) => defs,
            Err(e) => {
                return self.fallback_report(format!("failed to parse ruleset document: {e}"));
            }
        };

        let ruleset = compile_ruleset(defs);
        let validation_errors = ruleset
            .invalid_rules
            .iter()
            .map(|r| r.error.clone())
            .collect();

        *self.cache.lock().unwrap() = Some(ruleset.clone());

        RulesetLoadReport {
            valid_rules: ruleset.rules,
            invalid_rules: ruleset.invalid_rules,
            validation_errors,
            loaded_from_cache: false,
            load_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration as StdDuration;

    fn write_file(path: &Path, content: &str) {
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    const RULE_JSON: &str = r#"[
        {"name":"FaceAngleX","func":"HeadRotX","min":-30,"max":30,"defaultValue":0}
    ]"#;

    #[test]
    fn loads_valid_ruleset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        write_file(&path, RULE_JSON);

        let repo = RulesRepository::new(&path);
        let report = repo.load();
        assert_eq!(report.valid_rules.len(), 1);
        assert!(report.load_error.is_none());
        assert!(!report.loaded_from_cache);
    }

    #[test]
    fn missing_file_with_no_cache_returns_empty_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let repo = RulesRepository::new(&path);
        let report = repo.load();
        assert!(report.valid_rules.is_empty());
        assert!(!report.loaded_from_cache);
        assert!(report.load_error.is_some());
    }

    #[test]
    fn catastrophic_failure_after_success_falls_back_to_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        write_file(&path, RULE_JSON);

        let repo = RulesRepository::new(&path);
        let first = repo.load();
        assert!(first.load_error.is_none());

        write_file(&path, "not json");
        let second = repo.load();
        assert!(second.loaded_from_cache);
        assert_eq!(second.valid_rules.len(), 1);
        assert!(second.load_error.is_some());
    }

    #[tokio::test]
    async fn watch_changes_ticks_on_file_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        write_file(&path, RULE_JSON);

        let repo = RulesRepository::new(&path);
        let mut rx = repo.watch_changes().unwrap();

        write_file(&path, RULE_JSON.replace("FaceAngleX", "FaceAngleY").as_str());

        tokio::time::timeout(StdDuration::from_secs(2), rx.changed())
            .await
            .expect("did not observe a rules-changed tick within timeout")
            .unwrap();
    }
}
