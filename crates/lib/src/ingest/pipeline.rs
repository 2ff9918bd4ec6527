//! # Ingestion Pipeline
//!
//! Orchestrates one ingestion run: decode the source, pick or synthesize the
//! root group, classify the records in sequential batches and commit the new
//! categories and scripts to the store in a single update. A run that fails
//! part way commits what earlier batches produced and no empty categories.

use crate::{
    classify::{BatchClassifier, DEFAULT_BATCH_SIZE},
    ingest::{
        decode_file, decode_text,
        report::{batch_progress, ProgressReporter},
        IngestError, IngestSource, RawRecord,
    },
    materialize::materialize,
    store::{Action, AppState, Store},
    taxonomy::TaxonomySynthesizer,
    types::{Language, Script},
};
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, instrument};

pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(400);

/// What to ingest and where to file it.
#[derive(Debug, Clone)]
pub struct IngestionRequest {
    pub source: IngestSource,
    pub kb_id: String,
    /// The group new categories go under. Falls back to the bank's own
    /// taxonomy node, then to a freshly created group.
    pub root_category_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Completed,
    Failed,
}

/// The outcome of a run. A failed run still reports what it committed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionReport {
    pub status: RunStatus,
    pub records_found: usize,
    pub scripts_added: usize,
    pub categories_created: usize,
    pub root_category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestionReport {
    fn failed(error: &IngestError) -> Self {
        Self {
            status: RunStatus::Failed,
            records_found: 0,
            scripts_added: 0,
            categories_created: 0,
            root_category_id: None,
            error: Some(error.to_string()),
        }
    }
}

/// Runs ingestion against a store with a fixed classifier.
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    classifier: BatchClassifier,
    store: Store,
    batch_size: usize,
    batch_delay: Duration,
}

impl IngestionPipeline {
    pub fn new(classifier: BatchClassifier, store: Store) -> Self {
        Self {
            classifier,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }

    /// Overrides the batch size (at least one) and the pause between batches.
    pub fn with_batching(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_delay = batch_delay;
        self
    }

    /// Runs one ingestion. Errors never escape: they are logged through the
    /// reporter and turn the report into `Failed`.
    #[instrument(skip_all, fields(source = request.source.label(), kb_id = %request.kb_id))]
    pub async fn run(
        &self,
        request: IngestionRequest,
        reporter: &dyn ProgressReporter,
    ) -> IngestionReport {
        info!("Starting ingestion run.");
        let state = self.store.snapshot().await;

        let records = match self.prepare(&request, &state, reporter).await {
            Ok(records) => records,
            Err(e) => {
                error!("Ingestion failed before classification: {e}");
                reporter.error(&format!("Critical error: {e}"));
                return IngestionReport::failed(&e);
            }
        };
        reporter.success(&format!("{} record(s) found.", records.len()));

        let root_id = request.root_category_id.clone().or_else(|| {
            state
                .knowledge_bank(&request.kb_id)
                .and_then(|kb| kb.taxonomy_category_id.clone())
        });
        let group_name = match (&request.source, state.settings.language) {
            (IngestSource::File { file_name, .. }, _) => file_name.to_uppercase(),
            (IngestSource::Text(_), Language::Tr) => "YENİ VERİ GRUBU".to_string(),
            (IngestSource::Text(_), Language::En) => "NEW DATA GROUP".to_string(),
        };
        let mut synthesizer = TaxonomySynthesizer::new(
            &state.taxonomy,
            root_id.as_deref(),
            &group_name,
            Some(&request.kb_id),
        );
        if synthesizer.created_root() {
            reporter.success(&format!("Group created: {}", synthesizer.root_name()));
        }

        let mut scripts = Vec::new();
        let outcome = self
            .classify_all(
                &records,
                &state,
                &mut synthesizer,
                &request.kb_id,
                &mut scripts,
                reporter,
            )
            .await;

        let root_category_id = synthesizer.root_id().to_string();
        let created_root = synthesizer.created_root();
        let mut delta = synthesizer.into_delta();
        if outcome.is_err() {
            delta.prune_unfilled();
        }
        let root_kept = !created_root || delta.created.iter().any(|c| c.id == root_category_id);
        let categories_created = delta.created.len();
        let scripts_added = scripts.len();

        let committed = if delta.is_empty() && scripts.is_empty() {
            info!("Nothing to commit.");
            Ok(())
        } else {
            self.store
                .dispatch(Action::CommitIngestion {
                    kb_id: request.kb_id.clone(),
                    taxonomy: delta,
                    scripts,
                })
                .await
                .map_err(IngestError::from)
        };

        let mut report = IngestionReport {
            status: RunStatus::Completed,
            records_found: records.len(),
            scripts_added,
            categories_created,
            root_category_id: root_kept.then_some(root_category_id),
            error: None,
        };

        match outcome.and(committed) {
            Ok(()) => {
                reporter.progress(100);
                reporter.success("Ingestion completed successfully.");
                info!(scripts_added, categories_created, "Ingestion run completed.");
            }
            Err(e) => {
                error!("Ingestion run failed: {e}");
                reporter.error(&format!("Critical error: {e}"));
                report.status = RunStatus::Failed;
                report.error = Some(e.to_string());
            }
        }
        report
    }

    /// Checks the target bank and decodes the source into records.
    async fn prepare(
        &self,
        request: &IngestionRequest,
        state: &AppState,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<RawRecord>, IngestError> {
        if state.knowledge_bank(&request.kb_id).is_none() {
            return Err(IngestError::UnknownKnowledgeBank(request.kb_id.clone()));
        }

        let records = match &request.source {
            IngestSource::File { file_name, bytes } => {
                reporter.info(&format!("Reading file: {file_name}"));
                decode_file(file_name, bytes, reporter).await?.records
            }
            IngestSource::Text(text) => decode_text(text, state.settings.language)?,
        };
        reporter.progress(30);
        Ok(records)
    }

    /// Classifies every batch in order, pushing scripts as each batch lands.
    ///
    /// Stops at the first failed batch; scripts from earlier batches stay in
    /// `scripts` so the caller can still commit them.
    async fn classify_all(
        &self,
        records: &[RawRecord],
        state: &AppState,
        synthesizer: &mut TaxonomySynthesizer<'_>,
        kb_id: &str,
        scripts: &mut Vec<Script>,
        reporter: &dyn ProgressReporter,
    ) -> Result<(), IngestError> {
        let fallback_category = match state.settings.language {
            Language::Tr => "Genel",
            Language::En => "General",
        };
        let total = records.len();
        let batches = total.div_ceil(self.batch_size);

        for (index, batch) in records.chunks(self.batch_size).enumerate() {
            let start = index * self.batch_size;
            reporter.wait(&format!(
                "Analyzing: [{}-{}]",
                start + 1,
                start + batch.len()
            ));

            let parent_hint = synthesizer.root_name().to_string();
            let classifications = self
                .classifier
                .classify_batch(batch, &state.taxonomy, Some(&parent_hint))
                .await?;

            for (record, classification) in batch.iter().zip(&classifications) {
                let wanted = record
                    .provided_category
                    .as_deref()
                    .or(classification.category.as_deref())
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .unwrap_or(fallback_category);
                let (category, created) = synthesizer.resolve(wanted);
                if created {
                    reporter.info(&format!("New category detected: {category}"));
                }
                scripts.push(materialize(record, classification, &category, kb_id));
            }

            reporter.progress(batch_progress(start + batch.len(), total));
            if index + 1 < batches && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }
        Ok(())
    }
}
