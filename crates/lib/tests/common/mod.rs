#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Tracing setup and a seeded store shared by the integration tests.

use anybot::{
    store::{Action, Store},
    types::KnowledgeBank,
};
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the tracing subscriber once per test binary.
pub fn setup_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An in-memory store holding one empty knowledge bank.
pub async fn store_with_bank(name: &str) -> anyhow::Result<(Store, KnowledgeBank)> {
    let store = Store::in_memory();
    let bank = KnowledgeBank::new(name, "Test bank", vec![]);
    store
        .dispatch(Action::AddKnowledgeBank(bank.clone()))
        .await?;
    Ok((store, bank))
}
