//! Observability Sink (spec §4.7, component C8).
//!
//! Pure data, produced on every terminal path including early cancellation.
//! Rendering is left to the caller, same division of labor the teacher's
//! `orchestrator.rs` draws between `generate_report` (data) and whatever
//! the host does with it.

use uuid::Uuid;

use crate::intent::IntentResult;
use crate::routing::RoutingDecision;
use crate::scheduler::AgentExecution;
use crate::types::Query;

#[derive(Debug, Clone)]
pub struct PerAgentReport {
    pub execution: AgentExecution,
    pub record_count: u32,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    /// Correlation id for this run's log lines, in the same spirit as the
    /// workflow ids the teacher's `orchestrator.rs` stamps on every
    /// coordinated task.
    pub run_id: Uuid,
    pub query_text: String,
    pub intent_result: IntentResult,
    pub routing_decision: RoutingDecision,
    pub per_agent: Vec<PerAgentReport>,
    pub merged_count: usize,
    pub dedup_collapsed_count: usize,
    pub total_duration_ms: u64,
    pub deadline_exceeded: bool,
}

impl RunReport {
    /// A human-oriented rejection message for a zero-record run, naming
    /// exactly which agents were selected and why they didn't pan out
    /// (spec §7: "never a single generic error").
    pub fn rejection_summary(&self) -> Option<String> {
        if !self.per_agent.is_empty() || self.merged_count > 0 {
            return None;
        }

        if self.routing_decision.selected.is_empty() {
            return Some(format!(
                "query '{}' was not routed to any agent; rejected candidates: {}",
                self.query_text,
                self.routing_decision
                    .rejected
                    .iter()
                    .map(|r| format!("{} ({})", r.agent_id, r.reason))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        let per_agent_reasons = self
            .per_agent
            .iter()
            .map(|p| format!("{}: {:?}", p.execution.agent_id, p.execution.state))
            .collect::<Vec<_>>()
            .join(", ");
        Some(format!("no records returned; agent terminal states: {per_agent_reasons}"))
    }
}

pub fn new_query_rejected_report(query: &Query, intent_result: IntentResult) -> RunReport {
    RunReport {
        run_id: Uuid::new_v4(),
        query_text: query.text().to_string(),
        intent_result,
        routing_decision: RoutingDecision {
            selected: Vec::new(),
            rejected: Vec::new(),
            predicted_confidence: 0.0,
            reasoning: Default::default(),
        },
        per_agent: Vec::new(),
        merged_count: 0,
        dedup_collapsed_count: 0,
        total_duration_ms: 0,
        deadline_exceeded: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Industry, Region, Seniority};

    fn rejected_intent() -> IntentResult {
        IntentResult {
            region: Region::Unknown,
            region_confidence: 0.0,
            industry: Industry::Unknown,
            industry_confidence: 0.0,
            extracted_location: None,
            extracted_job_titles: Vec::new(),
            extracted_skills: Vec::new(),
            seniority: Seniority::Unknown,
            is_remote: None,
            is_job_related: Some(false),
            overall_confidence: 0.0,
        }
    }

    #[test]
    fn rejection_report_carries_a_message() {
        let query = Query::new("recommend me a movie").unwrap();
        let report = new_query_rejected_report(&query, rejected_intent());
        assert!(report.rejection_summary().is_some());
    }
}
