//! Top-level `Engine` / `Run` API (spec §6, §9).
//!
//! The spec's redesign note calls for replacing the source's global mutable
//! state with "an explicit `Engine` construct that owns the Registry, rate
//! limiters, circuit breakers, and merger" (spec §9). This generalizes the
//! teacher's `AgentFactory`/`SwarmCoordinator` ownership shape (one struct
//! holding the shared maps other components need) to that requirement,
//! while keeping a plugin-registration hook (`register_agent`) for adding
//! agents without touching this file, also per spec §9.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::agent::Agent;
use crate::agents::build_default_agents;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::intent::{self, IntentOracle};
use crate::merger::Merger;
use crate::observability::{PerAgentReport, RunReport};
use crate::registry::{AgentId, AgentRegistry};
use crate::routing::{self, RoutingDecision};
use crate::scheduler::{RunParams, Scheduler};
use crate::types::{JobRecord, Query};

#[derive(Default)]
pub struct RunOptions {
    pub run_deadline: Option<Duration>,
    pub max_concurrent_agents: Option<usize>,
    pub force_agents: Option<Vec<AgentId>>,
    pub intent_oracle: Option<Arc<dyn IntentOracle>>,
    pub verbose_reasoning: bool,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub records: Vec<JobRecord>,
    pub merged_count: usize,
    pub truncated_to_results_wanted: bool,
}

pub struct Engine {
    registry: Arc<AgentRegistry>,
    agents: Arc<HashMap<AgentId, Box<dyn Agent>>>,
    scheduler: Arc<Scheduler>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let scheduler = Scheduler::new(config.scheduler_config());
        Self {
            registry: Arc::new(AgentRegistry::new()),
            agents: Arc::new(build_default_agents()),
            scheduler: Arc::new(scheduler),
            config,
        }
    }

    /// Plugin-registration escape hatch (spec §9): swaps in a custom agent
    /// implementation for an id without touching routing or scheduling.
    /// Must be called before the first `run` — `agents` is shared via `Arc`
    /// once a run is in flight.
    pub fn register_agent(&mut self, id: AgentId, agent: Box<dyn Agent>) {
        let agents = Arc::get_mut(&mut self.agents).expect("register_agent called after a run started");
        agents.insert(id, agent);
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub async fn run(&self, query: Query, options: RunOptions) -> Result<(RunResult, RunReport)> {
        let run_id = uuid::Uuid::new_v4();
        let start = Instant::now();
        let run_deadline_duration = options.run_deadline.unwrap_or_else(|| self.config.run_deadline());
        tracing::info!(%run_id, query = query.text(), "starting run");

        let rule_based = intent::classify_rule_based(query.text(), query.country_hint(), query.language_hint());
        let intent_result = match &options.intent_oracle {
            Some(oracle) => {
                match tokio::time::timeout(Duration::from_secs(2), oracle.analyze(query.text(), query.country_hint())).await {
                    Ok(Ok(oracle_result)) => intent::merge_with_oracle(rule_based, oracle_result),
                    _ => rule_based,
                }
            }
            None => rule_based,
        };

        if intent_result.is_job_related == Some(false) {
            tracing::info!(%run_id, "query rejected as not job-related");
            let report = RunReport {
                run_id,
                query_text: query.text().to_string(),
                intent_result,
                routing_decision: empty_decision("query_rejected: is_job_related=false"),
                per_agent: Vec::new(),
                merged_count: 0,
                dedup_collapsed_count: 0,
                total_duration_ms: start.elapsed().as_millis() as u64,
                deadline_exceeded: false,
            };
            return Ok((
                RunResult {
                    records: Vec::new(),
                    merged_count: 0,
                    truncated_to_results_wanted: false,
                },
                report,
            ));
        }

        if let Some(forced) = &options.force_agents {
            for id in forced {
                if self.registry.get(*id).is_none() {
                    return Err(EngineError::ForcedAgentNotRegistered(id.to_string()));
                }
            }
        }

        let routing_config = self.config.routing_config();
        let decision = routing::route(&intent_result, &self.registry, &routing_config, options.force_agents.as_deref());
        tracing::info!(%run_id, selected = decision.selected.len(), rejected = decision.rejected.len(), "routing decided");

        if decision.selected.is_empty() {
            tracing::warn!(%run_id, "no agents selected for a job-related query");
            let report = RunReport {
                run_id,
                query_text: query.text().to_string(),
                intent_result,
                routing_decision: decision,
                per_agent: Vec::new(),
                merged_count: 0,
                dedup_collapsed_count: 0,
                total_duration_ms: start.elapsed().as_millis() as u64,
                deadline_exceeded: false,
            };
            return Ok((
                RunResult {
                    records: Vec::new(),
                    merged_count: 0,
                    truncated_to_results_wanted: false,
                },
                report,
            ));
        }

        let min_results_for_success =
            (self.config.min_results_for_success_cap as u32).min(query.results_wanted() / 2) as usize;

        let params = RunParams {
            search_term: query.text().to_string(),
            location: query.location().map(str::to_string),
            results_wanted: query.results_wanted(),
            max_age_hours: query.max_age_hours(),
            job_type: query.job_type(),
            is_remote: query.is_remote(),
            country: query.country_hint().map(str::to_string),
            language: query.language_hint().map(str::to_string),
            min_results_for_success,
        };

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let cancellation_token = CancellationToken::new();
        let run_deadline_instant = Instant::now() + run_deadline_duration;

        let scheduler = Arc::clone(&self.scheduler);
        let agents = Arc::clone(&self.agents);
        let registry = Arc::clone(&self.registry);
        let decision_for_task = decision.clone();
        let scheduler_token = cancellation_token.clone();
        let max_concurrent_override = options.max_concurrent_agents;

        let scheduler_task = tokio::spawn(async move {
            scheduler
                .run(
                    &decision_for_task,
                    &agents,
                    &registry,
                    &params,
                    run_deadline_instant,
                    scheduler_token,
                    tx,
                    max_concurrent_override,
                )
                .await
        });

        let mut merger = Merger::new(Arc::clone(&self.registry), self.config.dedup_policy);
        while let Some(record) = rx.recv().await {
            merger.ingest(record);
        }

        let outcome = scheduler_task.await.unwrap_or_else(|join_err| {
            tracing::warn!(%join_err, "scheduler task did not complete cleanly");
            crate::scheduler::SchedulerOutcome {
                executions: Vec::new(),
                deadline_exceeded: true,
            }
        });

        let (records, stats) = merger.finalize(query.results_wanted(), true);
        let truncated_to_results_wanted = stats.merged_count as u32 > query.results_wanted();

        let per_agent = outcome
            .executions
            .iter()
            .cloned()
            .map(|execution| PerAgentReport {
                record_count: execution.jobs_returned,
                execution,
            })
            .collect();

        tracing::info!(%run_id, merged_count = stats.merged_count, deadline_exceeded = outcome.deadline_exceeded, "run complete");
        let report = RunReport {
            run_id,
            query_text: query.text().to_string(),
            intent_result,
            routing_decision: decision,
            per_agent,
            merged_count: stats.merged_count,
            dedup_collapsed_count: stats.dedup_collapsed_count,
            total_duration_ms: start.elapsed().as_millis() as u64,
            deadline_exceeded: outcome.deadline_exceeded,
        };

        Ok((
            RunResult {
                records,
                merged_count: stats.merged_count,
                truncated_to_results_wanted,
            },
            report,
        ))
    }
}

fn empty_decision(note: &str) -> RoutingDecision {
    RoutingDecision {
        selected: Vec::new(),
        rejected: Vec::new(),
        predicted_confidence: 0.0,
        reasoning: crate::routing::RoutingReason {
            candidates: Vec::new(),
            notes: vec![note.to_string()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn non_job_query_is_rejected_without_running_agents() {
        let engine = Engine::new(EngineConfig::default());
        let query = Query::new("recommend me a movie").unwrap();
        let (result, report) = engine.run(query, RunOptions::default()).await.unwrap();
        assert!(result.records.is_empty());
        assert_eq!(report.routing_decision.selected.len(), 0);
    }

    #[tokio::test]
    async fn europe_ai_engineer_query_runs_end_to_end() {
        let engine = Engine::new(EngineConfig::default());
        let query = Query::new("I want to find AI Engineer jobs in Europe")
            .unwrap()
            .with_results_wanted(30)
            .unwrap();
        let mut options = RunOptions::default();
        options.run_deadline = Some(Duration::from_secs(10));
        let (result, report) = engine.run(query, options).await.unwrap();
        assert!(!report.routing_decision.selected.is_empty());
        assert!(result.merged_count > 0 || report.per_agent.iter().all(|p| p.record_count == 0));
    }

    #[tokio::test]
    async fn force_agents_rejects_unknown_ids_gracefully() {
        let engine = Engine::new(EngineConfig::default());
        let query = Query::new("rust engineer").unwrap();
        let mut options = RunOptions::default();
        options.force_agents = Some(vec![AgentId::LinkedIn]);
        let result = engine.run(query, options).await;
        assert!(result.is_ok());
    }
}
