//! # Application-State Store
//!
//! All console state lives in one `AppState` behind a `tokio::sync::RwLock`.
//! Mutations go through [`Store::dispatch`], which applies an [`Action`] to a
//! copy of the state, persists the copy through the [`StateBackend`] and only
//! then swaps it in. Writers are serialized by the lock, so concurrent callers
//! interleave at dispatch granularity.

pub mod backend;
pub mod state;

pub use backend::{JsonFileBackend, MemoryBackend, StateBackend, StateEntries};
pub use state::{Action, AppState, SettingsUpdate};

use crate::{escalation::RuleError, taxonomy::TaxonomyError};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} already exists: {id}")]
    Duplicate { kind: &'static str, id: String },

    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error("Invalid escalation rule: {0}")]
    InvalidRule(#[from] RuleError),

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    #[error("Persisted value for '{key}' is unreadable: {source}")]
    Corrupt {
        key: &'static str,
        source: serde_json::Error,
    },

    #[error("Failed to read or write state: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize state: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A cloneable handle to the shared application state.
#[derive(Debug, Clone)]
pub struct Store {
    state: Arc<RwLock<AppState>>,
    backend: Arc<dyn StateBackend>,
}

impl Store {
    /// Loads the state once from the backend.
    pub async fn open(backend: impl StateBackend + 'static) -> Result<Self, StoreError> {
        let entries = backend.load().await?;
        let state = AppState::from_entries(&entries)?;
        info!(
            banks = state.knowledge_banks.len(),
            scripts = state.scripts.len(),
            categories = state.taxonomy.len(),
            "Application state loaded."
        );
        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            backend: Arc::new(backend),
        })
    }

    /// An empty store that persists nowhere but memory.
    pub fn in_memory() -> Self {
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            backend: Arc::new(MemoryBackend::new()),
        }
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> AppState {
        self.state.read().await.clone()
    }

    /// Runs `f` against the current state without copying it.
    pub async fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&*self.state.read().await)
    }

    /// Applies an action, persists the result and publishes it.
    ///
    /// If the action is rejected or persisting fails, the state is unchanged.
    pub async fn dispatch(&self, action: Action) -> Result<(), StoreError> {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        debug!(?action, "Dispatching action");
        next.apply(action)?;
        self.backend.save(&next.to_entries()?).await?;
        *guard = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::KnowledgeBank;

    #[tokio::test]
    async fn rejected_actions_leave_state_untouched() {
        let store = Store::in_memory();
        let bank = KnowledgeBank::new("A", "", vec![]);
        store
            .dispatch(Action::AddKnowledgeBank(bank.clone()))
            .await
            .unwrap();

        let result = store.dispatch(Action::AddKnowledgeBank(bank)).await;
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
        assert_eq!(store.read(|s| s.knowledge_banks.len()).await, 1);
    }

    #[tokio::test]
    async fn json_file_backend_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let store = Store::open(JsonFileBackend::new(&path)).await.unwrap();
        store
            .dispatch(Action::AddKnowledgeBank(KnowledgeBank::new("Kripto", "", vec![])))
            .await
            .unwrap();

        let reopened = Store::open(JsonFileBackend::new(&path)).await.unwrap();
        let names = reopened
            .read(|s| s.knowledge_banks.iter().map(|kb| kb.name.clone()).collect::<Vec<_>>())
            .await;
        assert_eq!(names, vec!["Kripto"]);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(raw.get(state::KEY_KNOWLEDGE_BANKS).is_some());
        assert_eq!(raw[state::KEY_ACTIVE_MODEL], "gemini-3-flash");
    }
}
