//! Aggregates shown on the dashboard.

use crate::{
    store::AppState,
    types::{AgentLog, LogStatus, Sentiment},
};
use serde::Serialize;

const CRITICAL_LOG_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub knowledge_banks: usize,
    pub scripts: usize,
    pub golden_scripts: usize,
    pub agent_logs: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// Percentage of `VERIFIED` logs, 100 when there are none.
    pub success_rate: u32,
    pub avg_latency_ms: u64,
    /// The newest low-confidence or urgent logs.
    pub critical_logs: Vec<AgentLog>,
}

impl DashboardStats {
    pub fn compute(state: &AppState) -> Self {
        let logs = &state.agent_logs;
        let prompt_tokens: u64 = logs.iter().map(|l| l.token_usage.prompt).sum();
        let completion_tokens: u64 = logs.iter().map(|l| l.token_usage.completion).sum();

        let (success_rate, avg_latency_ms) = if logs.is_empty() {
            (100, 0)
        } else {
            let verified = logs
                .iter()
                .filter(|l| l.status == LogStatus::Verified)
                .count();
            let latency: u64 = logs.iter().filter_map(|l| l.duration_ms).sum();
            (
                (verified as f64 / logs.len() as f64 * 100.0).round() as u32,
                (latency as f64 / logs.len() as f64).round() as u64,
            )
        };

        Self {
            knowledge_banks: state.knowledge_banks.len(),
            scripts: state.scripts.len(),
            golden_scripts: state.scripts.iter().filter(|s| s.is_golden).count(),
            agent_logs: logs.len(),
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
            success_rate,
            avg_latency_ms,
            critical_logs: logs
                .iter()
                .filter(|l| {
                    l.status == LogStatus::LowConfidence || l.sentiment == Some(Sentiment::Urgent)
                })
                .take(CRITICAL_LOG_LIMIT)
                .cloned()
                .collect(),
        }
    }
}
