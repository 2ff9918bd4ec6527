//! # anybot
//!
//! The core of a support-bot management console. It ingests knowledge from
//! uploaded files or pasted text, classifies it into scripts and a category
//! tree with a generative-language provider, and simulates bot conversations
//! against that knowledge. All console state lives in a [`store::Store`]
//! that persists through a pluggable key/value backend.

pub mod authoring;
pub mod classify;
pub mod config;
pub mod errors;
pub mod escalation;
pub mod ingest;
pub mod materialize;
pub mod prompts;
pub mod providers;
pub mod simulate;
pub mod stats;
pub mod store;
pub mod taxonomy;
pub mod types;

pub use authoring::{correct_response, Authoring, AuthoringError};
pub use classify::{BatchClassifier, Classification};
pub use errors::PromptError;
pub use ingest::{
    IngestError, IngestSource, IngestionPipeline, IngestionReport, IngestionRequest, RunStatus,
};
pub use simulate::{shortlist, ChatError, ChatSession, ChatTurn, Simulator};
pub use stats::DashboardStats;
pub use store::{Action, AppState, Store, StoreError};
