//! End-to-end scenarios exercising the public `Engine::run` surface against
//! the full routing -> scheduling -> merge pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobscout_engine::agent::{Agent, ScrapeInput, ScrapeOutput, TerminatedReason};
use jobscout_engine::config::EngineConfig;
use jobscout_engine::engine::{Engine, RunOptions};
use jobscout_engine::intent::{IntentOracle, IntentResult};
use jobscout_engine::registry::AgentId;
use jobscout_engine::scheduler::ExecutionState;
use jobscout_engine::types::{DescriptionFormat, Industry, JobRecord, Location, Query, Region, Seniority};

fn bare_job_record(source_agent: &str, title: &str, company: &str, city: &str) -> JobRecord {
    JobRecord {
        id: format!("{source_agent}:fixed-1"),
        source_agent: source_agent.to_string(),
        source_url: format!("https://{source_agent}.example/jobs/1"),
        direct_apply_url: None,
        title: title.to_string(),
        company: company.to_string(),
        company_url: None,
        company_logo: None,
        company_size: None,
        company_industry: None,
        location: Location::from_raw(city.to_string()),
        posted_at: None,
        scraped_at: chrono::Utc::now(),
        description: None,
        description_format: DescriptionFormat::Plain,
        job_type: None,
        seniority: None,
        compensation: None,
        skills: Vec::new(),
        benefits: Vec::new(),
        listing_kind: None,
        dedup_key: String::new(),
        quality_score: 0.0,
        aliases: Vec::new(),
        source_warnings: Vec::new(),
        attempts: 0,
    }
}

/// Scenario 1 (spec §8): a geo-specific Europe query must never select or
/// score an agent the registry hard-excludes from that region, and the
/// report must account for all nine agents between selected and rejected.
#[tokio::test]
async fn europe_query_never_routes_to_geo_excluded_agents() {
    let engine = Engine::new(EngineConfig::default());
    let query = Query::new("Senior AI Engineer jobs in Germany")
        .unwrap()
        .with_results_wanted(20)
        .unwrap();
    let mut options = RunOptions::default();
    options.run_deadline = Some(Duration::from_secs(10));
    let (_result, report) = engine.run(query, options).await.unwrap();

    assert_eq!(report.intent_result.region, Region::Europe);

    let total_considered = report.routing_decision.selected.len() + report.routing_decision.rejected.len();
    assert_eq!(total_considered, 9, "every agent must be accounted for");

    for selected in &report.routing_decision.selected {
        assert_ne!(selected.agent_id, AgentId::ZipRecruiter, "North-America-only agent cannot serve Europe");
        assert_ne!(selected.agent_id, AgentId::Seek, "Oceania-only agent cannot serve Europe");
    }
}

/// Scenario 2: a non-job query is rejected before any agent runs, and the
/// rejection message names why, not a generic error.
#[tokio::test]
async fn non_job_query_is_rejected_with_zero_scrape_calls() {
    let engine = Engine::new(EngineConfig::default());
    let query = Query::new("What's a good recipe for banana bread?").unwrap();
    let (result, report) = engine.run(query, RunOptions::default()).await.unwrap();

    assert!(result.records.is_empty());
    assert!(report.per_agent.is_empty(), "no agent should have been scheduled");
    assert_eq!(report.routing_decision.selected.len(), 0);
    assert!(report.rejection_summary().is_some());
}

struct AlwaysRejectOracle;

#[async_trait]
impl IntentOracle for AlwaysRejectOracle {
    async fn analyze(&self, _text: &str, _hint: Option<&str>) -> anyhow::Result<IntentResult> {
        Ok(IntentResult {
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
        })
    }
}

/// Scenario 3: an oracle that wrongly rejects a clearly job-related query is
/// overridden by the rule-based signal, per the merge rule in `intent.rs`.
#[tokio::test]
async fn oracle_over_rejection_is_overridden_by_rule_based_signal() {
    let engine = Engine::new(EngineConfig::default());
    let query = Query::new("Hiring a Senior Rust Backend Engineer with Kubernetes experience")
        .unwrap()
        .with_results_wanted(10)
        .unwrap();
    let mut options = RunOptions::default();
    options.intent_oracle = Some(Arc::new(AlwaysRejectOracle));
    options.run_deadline = Some(Duration::from_secs(10));

    let (_result, report) = engine.run(query, options).await.unwrap();

    assert_eq!(report.intent_result.is_job_related, Some(true));
    assert!(!report.routing_decision.selected.is_empty());
}

/// A mock agent that always times out: never responds before the deadline.
struct AlwaysTimesOutAgent {
    id: AgentId,
}

#[async_trait]
impl Agent for AlwaysTimesOutAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    async fn scrape(&self, _input: ScrapeInput) -> ScrapeOutput {
        // Fails quickly every attempt so the scheduler's retry loop (not
        // wall-clock deadline pressure) is what this test exercises.
        tokio::time::sleep(Duration::from_millis(50)).await;
        ScrapeOutput::failed(TerminatedReason::TimedOut)
    }
}

/// A mock agent that always succeeds immediately with one record.
struct AlwaysSucceedsAgent {
    id: AgentId,
}

#[async_trait]
impl Agent for AlwaysSucceedsAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        ScrapeOutput::complete(vec![bare_job_record(
            self.id.as_str(),
            &input.search_term,
            "Acme Corp",
            "Berlin",
        )])
    }
}

/// Scenario 4: one forced agent times out and is retried up to the
/// configured cap while a sibling succeeds on its first attempt.
#[tokio::test]
async fn one_agent_times_out_and_retries_while_another_succeeds() {
    let mut engine = Engine::new(EngineConfig::default());
    engine.register_agent(AgentId::LinkedIn, Box::new(AlwaysTimesOutAgent { id: AgentId::LinkedIn }));
    engine.register_agent(AgentId::Indeed, Box::new(AlwaysSucceedsAgent { id: AgentId::Indeed }));

    let query = Query::new("rust engineer").unwrap().with_results_wanted(5).unwrap();
    let mut options = RunOptions::default();
    options.force_agents = Some(vec![AgentId::LinkedIn, AgentId::Indeed]);
    options.run_deadline = Some(Duration::from_secs(6));

    let (_result, report) = engine.run(query, options).await.unwrap();

    let linkedin = report
        .per_agent
        .iter()
        .find(|p| p.execution.agent_id == AgentId::LinkedIn)
        .expect("linkedin execution present");
    assert_eq!(linkedin.execution.state, ExecutionState::TimedOut);
    assert_eq!(linkedin.execution.attempts, 3, "retry_max_attempts caps at 3");

    let indeed = report
        .per_agent
        .iter()
        .find(|p| p.execution.agent_id == AgentId::Indeed)
        .expect("indeed execution present");
    assert_eq!(indeed.execution.state, ExecutionState::Succeeded);
    assert_eq!(indeed.execution.attempts, 1);
}

/// Scenario 5: repeated back-to-back runs against the same forced agent
/// exhaust its token bucket and the engine observes a rate-limited run.
#[tokio::test]
async fn repeated_runs_exhaust_the_rate_limiter() {
    let mut engine = Engine::new(EngineConfig::default());
    // BdJobs' registry rate limit is 15 rpm / burst 3 -- the tightest of the
    // nine -- which makes exhausting it in a handful of runs deterministic.
    engine.register_agent(AgentId::BdJobs, Box::new(AlwaysSucceedsAgent { id: AgentId::BdJobs }));

    let mut saw_rate_limited = false;
    for _ in 0..6 {
        let query = Query::new("warehouse associate").unwrap().with_results_wanted(1).unwrap();
        let mut options = RunOptions::default();
        options.force_agents = Some(vec![AgentId::BdJobs]);
        options.run_deadline = Some(Duration::from_millis(800));

        let (_result, report) = engine.run(query, options).await.unwrap();
        if report
            .per_agent
            .iter()
            .any(|p| p.execution.agent_id == AgentId::BdJobs && p.execution.state == ExecutionState::RateLimited)
        {
            saw_rate_limited = true;
            break;
        }
    }

    assert!(saw_rate_limited, "burst of 3 should exhaust within six rapid runs");
}

/// A mock agent pair that returns records describing the same listing
/// (same title/company/city) so the merger's cross-source near-dup path
/// is genuinely exercised end to end, not just at the unit level.
struct FixedRecordAgent {
    id: AgentId,
    with_salary: bool,
}

#[async_trait]
impl Agent for FixedRecordAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    async fn scrape(&self, _input: ScrapeInput) -> ScrapeOutput {
        let mut record = bare_job_record(self.id.as_str(), "Senior Rust Engineer", "Acme Corp", "Berlin");
        if self.with_salary {
            record.compensation = Some(jobscout_engine::types::Compensation {
                min: 90_000.0,
                max: 120_000.0,
                currency: "EUR".to_string(),
                interval: jobscout_engine::types::CompensationInterval::Year,
                source: jobscout_engine::types::CompensationSource::Listing,
            });
        }
        ScrapeOutput::complete(vec![record])
    }
}

/// Scenario 6: the same listing surfaced by two different agents collapses
/// into one merged record, with the richer (salaried) source's data backfilled
/// and the other source's id preserved as an alias.
#[tokio::test]
async fn near_duplicate_across_sources_merges_and_backfills_salary() {
    let mut engine = Engine::new(EngineConfig::default());
    engine.register_agent(
        AgentId::LinkedIn,
        Box::new(FixedRecordAgent { id: AgentId::LinkedIn, with_salary: true }),
    );
    engine.register_agent(
        AgentId::Indeed,
        Box::new(FixedRecordAgent { id: AgentId::Indeed, with_salary: false }),
    );

    let query = Query::new("rust engineer").unwrap().with_results_wanted(10).unwrap();
    let mut options = RunOptions::default();
    options.force_agents = Some(vec![AgentId::LinkedIn, AgentId::Indeed]);
    options.run_deadline = Some(Duration::from_secs(5));

    let (result, report) = engine.run(query, options).await.unwrap();

    assert_eq!(result.records.len(), 1, "duplicate listing must collapse to one record");
    let merged = &result.records[0];
    assert!(merged.compensation.is_some(), "salary must be backfilled from the richer source");
    assert_eq!(report.dedup_collapsed_count, 1);
    assert!(!merged.aliases.is_empty(), "the losing source's id must be retained as an alias");
}
