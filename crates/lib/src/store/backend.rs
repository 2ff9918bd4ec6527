//! Persistence boundary for the application state.
//!
//! The state is saved as a flat namespace of key to JSON value, one key per
//! collection and per scalar setting, and always rewritten in full.

use crate::store::StoreError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

pub type StateEntries = Map<String, Value>;

#[async_trait]
pub trait StateBackend: Send + Sync + Debug {
    /// Reads every persisted entry. A backend with nothing saved yet returns
    /// an empty map.
    async fn load(&self) -> Result<StateEntries, StoreError>;

    /// Replaces everything persisted with `entries`.
    async fn save(&self, entries: &StateEntries) -> Result<(), StoreError>;
}

/// Keeps the entries in one pretty-printed JSON object on disk.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateBackend for JsonFileBackend {
    async fn load(&self) -> Result<StateEntries, StoreError> {
        if !tokio::fs::try_exists(&self.path).await? {
            info!("State file '{}' not found. Starting empty.", self.path.display());
            return Ok(StateEntries::new());
        }
        let bytes = tokio::fs::read(&self.path).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StateEntries::new());
        }
        let entries: StateEntries = serde_json::from_slice(&bytes)?;
        info!(
            "Loaded {} state entries from '{}'.",
            entries.len(),
            self.path.display()
        );
        Ok(entries)
    }

    async fn save(&self, entries: &StateEntries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(entries)?;
        // Write next to the target and rename so a crash never leaves half a file.
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, body).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        debug!("Saved state to '{}'.", self.path.display());
        Ok(())
    }
}

/// Keeps the entries in memory. Used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<StateEntries>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: StateEntries) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateEntries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StateBackend for MemoryBackend {
    async fn load(&self) -> Result<StateEntries, StoreError> {
        Ok(self.lock().clone())
    }

    async fn save(&self, entries: &StateEntries) -> Result<(), StoreError> {
        *self.lock() = entries.clone();
        Ok(())
    }
}
