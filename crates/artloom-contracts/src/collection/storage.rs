use std::path::{Path, PathBuf};

use serde_json::Value;

/// Directory-backed key/value storage. Each key is one pretty-printed JSON
/// document at `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Missing, unreadable and malformed entries all read as `None`.
    pub fn read(&self, key: &str) -> Option<Value> {
        read_json(&self.path_for(key))
    }

    pub fn write(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        write_json(&self.path_for(key), value)
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

fn write_json(path: &Path, payload: &Value) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(payload)?)?;
    Ok(())
}
