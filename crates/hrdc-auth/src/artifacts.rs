//! Locally persisted session artifacts.
//!
//! The identity provider keeps its session under a key shaped like
//! `sb-<project>-auth-token`. Nothing else the application needs lives here;
//! the keys are read back on startup and purged when the session turns out
//! to be corrupted or the user explicitly signs out.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{AuthError, Result};

pub const ARTIFACT_KEY_PREFIX: &str = "sb-";
pub const ARTIFACT_KEY_SUFFIX: &str = "-auth-token";

/// Whether `key` names a provider session artifact
pub fn is_session_artifact(key: &str) -> bool {
    key.len() >= ARTIFACT_KEY_PREFIX.len() + ARTIFACT_KEY_SUFFIX.len()
        && key.starts_with(ARTIFACT_KEY_PREFIX)
        && key.ends_with(ARTIFACT_KEY_SUFFIX)
}

/// Key under which the session of `project_ref` is stored
pub fn session_key(project_ref: &str) -> String {
    format!("{}{}{}", ARTIFACT_KEY_PREFIX, project_ref, ARTIFACT_KEY_SUFFIX)
}

/// Small key/value store for client-side session data
pub trait SessionArtifactStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    fn keys(&self) -> Result<Vec<String>>;
}

/// Remove every session artifact, returning the removed keys
pub fn purge_session_artifacts(store: &dyn SessionArtifactStore) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    for key in store.keys()? {
        if is_session_artifact(&key) {
            store.remove(&key)?;
            removed.push(key);
        }
    }
    if !removed.is_empty() {
        tracing::info!(count = removed.len(), "Purged session artifacts");
    }
    Ok(removed)
}

#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| AuthError::Artifact("artifact store lock poisoned".to_string()))
    }
}

impl SessionArtifactStore for MemoryArtifactStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

/// Directory-backed store, one `<key>.json` file per entry
///
/// ```text
/// base_dir/
/// ├── sb-xyz-auth-token.json
/// └── other-key.json
/// ```
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    base_dir: PathBuf,
}

impl FileArtifactStore {
    /// Open (and create if needed) the store at `base_dir`
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| {
            AuthError::Artifact(format!("Failed to create {}: {}", base_dir.display(), e))
        })?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(AuthError::Artifact(format!("Invalid artifact key: {:?}", key)));
        }
        Ok(self.base_dir.join(format!("{}.json", key)))
    }
}

impl SessionArtifactStore for FileArtifactStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::Artifact(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        fs::write(&path, value)
            .map_err(|e| AuthError::Artifact(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Artifact(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.base_dir).map_err(|e| {
            AuthError::Artifact(format!("Failed to list {}: {}", self.base_dir.display(), e))
        })?;

        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
