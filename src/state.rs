// src/state.rs
// Sidecar state file (~/.mcp-devtools/state.json) for cross-invocation caches

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;

/// Entries older than this are treated as missing.
const STALE_AFTER_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StateEntry {
    value: serde_json::Value,
    updated_at: DateTime<Utc>,
}

/// Small persisted key-value store with a staleness policy. Other processes
/// may read the file, so writes are atomic (tmp sibling + rename).
pub struct StateFile {
    path: PathBuf,
    entries: Mutex<HashMap<String, StateEntry>>,
}

impl StateFile {
    /// Open the default sidecar at `~/.mcp-devtools/state.json`.
    pub fn open_default() -> Self {
        Self::open(crate::config::data_dir().join("state.json"))
    }

    pub fn open(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "state file unreadable, starting fresh");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    /// Fetch a value younger than the 24-hour staleness bound.
    pub fn get_fresh(&self, key: &str) -> Option<serde_json::Value> {
        let entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        if Utc::now() - entry.updated_at > Duration::hours(STALE_AFTER_HOURS) {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Store a value and persist the whole file.
    pub fn set(&self, key: impl Into<String>, value: serde_json::Value) -> Result<()> {
        let snapshot = {
            let mut entries = self
                .entries
                .lock()
                .map_err(|_| crate::error::DevToolsError::Other("state lock poisoned".into()))?;
            entries.insert(
                key.into(),
                StateEntry {
                    value,
                    updated_at: Utc::now(),
                },
            );
            entries.clone()
        };
        self.persist(&snapshot)
    }

    fn persist(&self, entries: &HashMap<String, StateEntry>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            create_private_dir(parent)?;
        }
        let tmp = self
            .path
            .with_extension(format!("tmp-{}", std::process::id()));
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        restrict_file_mode(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Create a directory (and parents) with mode 0700.
pub fn create_private_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

/// Restrict a file to owner read/write (0600).
pub fn restrict_file_mode(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
