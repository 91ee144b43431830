//! `AuthToken` persistence (spec §3): a single UTF-8 line, trimmed on
//! read. Single writer — the Desktop Client; no other component touches
//! this file.

use std::fs;
use std::path::Path;

pub fn load(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn save(path: &Path, token: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, token)
}

pub fn clear(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("token.txt")).is_none());
    }

    #[test]
    fn empty_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.txt");
        fs::write(&path, "   \n").unwrap();
        assert!(load(&path).is_none());
    }

    #[test]
    fn save_then_load_round_trips_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.txt");
        save(&path, "abc123\n").unwrap();
        assert_eq!(load(&path).unwrap(), "abc123");
    }

    #[test]
    fn clear_removes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.txt");
        save(&path, "abc123").unwrap();
        clear(&path).unwrap();
        assert!(load(&path).is_none());
        clear(&path).unwrap();
    }
}
