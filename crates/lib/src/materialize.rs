//! Turns classified records into scripts.

use crate::{
    classify::Classification,
    ingest::RawRecord,
    types::{new_id, Script, ScriptStatus},
};

/// Confidence assigned when the classifier did not report one.
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// The classifier's confidence as reported, or `DEFAULT_CONFIDENCE` when it
/// was absent or not a finite number.
pub fn resolve_confidence(reported: Option<f64>) -> f64 {
    match reported {
        Some(value) if value.is_finite() => value,
        _ => DEFAULT_CONFIDENCE,
    }
}

/// Builds a processed script for one classified record.
pub fn materialize(
    record: &RawRecord,
    classification: &Classification,
    category: &str,
    kb_id: &str,
) -> Script {
    Script {
        id: new_id("INGEST"),
        content: record.content.clone(),
        primary_intent: classification.intent.clone(),
        category: category.to_string(),
        keywords: classification.keywords.clone(),
        confidence: resolve_confidence(classification.confidence),
        status: ScriptStatus::Processed,
        kb_id: kb_id.to_string(),
        is_golden: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RawRecord {
        RawRecord {
            title: "A".to_string(),
            content: "Hello world".to_string(),
            provided_category: None,
        }
    }

    #[test]
    fn confidence_is_reported_value_or_default() {
        let mut classification = Classification::fallback();
        let script = materialize(&record(), &classification, "Genel", "KB-1");
        assert_eq!(script.confidence, 0.7);
        assert_eq!(script.status, ScriptStatus::Processed);
        assert_eq!(script.content, "Hello world");
        assert_eq!(script.kb_id, "KB-1");

        classification.confidence = Some(0.42);
        assert_eq!(materialize(&record(), &classification, "Genel", "KB-1").confidence, 0.42);

        classification.confidence = Some(0.0);
        assert_eq!(materialize(&record(), &classification, "Genel", "KB-1").confidence, 0.0);
    }

    #[test]
    fn reported_confidence_is_stored_unchanged() {
        let mut classification = Classification::fallback();
        classification.confidence = Some(87.0);
        assert_eq!(materialize(&record(), &classification, "Genel", "KB-1").confidence, 87.0);

        assert_eq!(resolve_confidence(Some(0.0)), 0.0);
        assert_eq!(resolve_confidence(Some(87.0)), 87.0);
        assert_eq!(resolve_confidence(None), DEFAULT_CONFIDENCE);
        assert_eq!(resolve_confidence(Some(f64::NAN)), DEFAULT_CONFIDENCE);
    }

    #[test]
    fn every_script_gets_a_fresh_id() {
        let classification = Classification::fallback();
        let a = materialize(&record(), &classification, "Genel", "KB-1");
        let b = materialize(&record(), &classification, "Genel", "KB-1");
        assert_ne!(a.id, b.id);
    }
}
