//! Execution Scheduler (spec §4.5, §5, component C6) — the concurrency core.
//!
//! Bounded worker pool, per-agent token-bucket rate limiting, per-agent
//! circuit breaking, retries with jittered backoff, and fallback
//! activation. The rate limiter is adapted from the teacher's
//! `server/gateway/src/rate_limit.rs` (`RateState`/`RateStore` refill-on-
//! elapsed token bucket) — reworked from its sync `Mutex<HashMap<...>>` +
//! pluggable persistence design to a plain async in-memory bucket, since
//! this scheduler only needs per-run rate state, never persisted.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::{mpsc::UnboundedSender, Mutex, Semaphore};
use tokio::time::{sleep, sleep_until, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::agent::{Agent, ScrapeInput, ScrapeOutput, TerminatedReason};
use crate::registry::{AgentId, AgentRegistry};
use crate::routing::{RoutingDecision, SelectionRole};
use crate::types::{JobRecord, JobType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Queued,
    Running,
    Succeeded,
    Failed,
    TimedOut,
    RateLimited,
    CircuitOpen,
}

impl ExecutionState {
    fn is_terminal(self) -> bool {
        !matches!(self, ExecutionState::Queued | ExecutionState::Running)
    }
}

#[derive(Debug, Clone)]
pub struct AgentExecution {
    pub agent_id: AgentId,
    pub state: ExecutionState,
    pub attempts: u32,
    pub first_started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub ended_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error_kind: Option<TerminatedReason>,
    pub jobs_returned: u32,
    pub raw_record_count: u32,
}

impl AgentExecution {
    fn queued(agent_id: AgentId) -> Self {
        Self {
            agent_id,
            state: ExecutionState::Queued,
            attempts: 0,
            first_started_at: None,
            ended_at: None,
            error_kind: None,
            jobs_returned: 0,
            raw_record_count: 0,
        }
    }
}

/// Per-agent request budget (spec §4.5: refill = rpm/60 per second, capacity
/// = burst; tokens consumed immediately before a scrape call).
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(requests_per_minute: u32, burst: u32) -> Self {
        Self {
            capacity: burst.max(1) as f64,
            tokens: burst.max(1) as f64,
            refill_per_sec: requests_per_minute as f64 / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn wait_for_next_token(&self) -> Duration {
        if self.refill_per_sec <= 0.0 {
            return Duration::from_secs(3600);
        }
        let needed = (1.0 - self.tokens).max(0.0);
        Duration::from_secs_f64(needed / self.refill_per_sec)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct CircuitBreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl CircuitBreakerState {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            probe_in_flight: false,
        }
    }
}

enum CircuitDecision {
    Proceed,
    Skip,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_concurrent_agents: usize,
    pub token_wait_budget_ratio: f64,
    pub circuit_breaker_cool_down: Duration,
    pub failure_threshold: u32,
    pub retry_max_attempts: u32,
    pub retry_base_backoff: Duration,
    pub k_fallback: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_agents: 4,
            token_wait_budget_ratio: 0.5,
            circuit_breaker_cool_down: Duration::from_secs(30),
            failure_threshold: 3,
            retry_max_attempts: 3,
            retry_base_backoff: Duration::from_secs(1),
            k_fallback: 2,
        }
    }
}

pub struct RunParams {
    pub search_term: String,
    pub location: Option<String>,
    pub results_wanted: u32,
    pub max_age_hours: Option<u32>,
    pub job_type: Option<JobType>,
    pub is_remote: Option<bool>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub min_results_for_success: usize,
}

pub struct SchedulerOutcome {
    pub executions: Vec<AgentExecution>,
    pub deadline_exceeded: bool,
}

/// Grace period past `run_deadline` before the hard watchdog aborts an
/// in-flight `scrape` call that isn't honoring the deadline itself (spec
/// §4.5/§5: "a hard watchdog abandons laggards ... within 2 seconds").
const WATCHDOG_GRACE: Duration = Duration::from_secs(2);

/// Owns per-agent rate limiters and circuit breakers, long-lived across runs
/// (spec §5: "one instance per agent", §9: owned by the `Engine`, not
/// reconstructed every call).
pub struct Scheduler {
    rate_limiters: Mutex<HashMap<AgentId, TokenBucket>>,
    circuit_breakers: Mutex<HashMap<AgentId, CircuitBreakerState>>,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            rate_limiters: Mutex::new(HashMap::new()),
            circuit_breakers: Mutex::new(HashMap::new()),
            config,
        }
    }

    async fn acquire_rate_limit_token(&self, agent_id: AgentId, requests_per_minute: u32, burst: u32, wait_budget: Duration) -> bool {
        let deadline = Instant::now() + wait_budget;
        loop {
            let wait = {
                let mut limiters = self.rate_limiters.lock().await;
                let bucket = limiters
                    .entry(agent_id)
                    .or_insert_with(|| TokenBucket::new(requests_per_minute, burst));
                if bucket.try_acquire() {
                    return true;
                }
                bucket.wait_for_next_token()
            };

            if Instant::now() + wait > deadline {
                return false;
            }
            sleep(wait.min(Duration::from_millis(200)).max(Duration::from_millis(10))).await;
            if Instant::now() >= deadline {
                return false;
            }
        }
    }

    async fn circuit_check(&self, agent_id: AgentId) -> CircuitDecision {
        let mut breakers = self.circuit_breakers.lock().await;
        let breaker = breakers.entry(agent_id).or_insert_with(CircuitBreakerState::new);
        match breaker.state {
            CircuitState::Closed => CircuitDecision::Proceed,
            CircuitState::Open => {
                let elapsed_since_open = breaker.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed_since_open >= self.config.circuit_breaker_cool_down && !breaker.probe_in_flight {
                    breaker.state = CircuitState::HalfOpen;
                    breaker.probe_in_flight = true;
                    CircuitDecision::Proceed
                } else {
                    CircuitDecision::Skip
                }
            }
            CircuitState::HalfOpen => CircuitDecision::Skip,
        }
    }

    async fn record_outcome(&self, agent_id: AgentId, counts_toward_trip: bool, succeeded: bool) {
        let mut breakers = self.circuit_breakers.lock().await;
        let breaker = breakers.entry(agent_id).or_insert_with(CircuitBreakerState::new);
        if succeeded {
            breaker.state = CircuitState::Closed;
            breaker.consecutive_failures = 0;
            breaker.opened_at = None;
            breaker.probe_in_flight = false;
            return;
        }

        if breaker.state == CircuitState::HalfOpen {
            breaker.probe_in_flight = false;
            breaker.state = CircuitState::Open;
            breaker.opened_at = Some(Instant::now());
            breaker.consecutive_failures = self.config.failure_threshold;
            return;
        }

        if counts_toward_trip {
            breaker.consecutive_failures += 1;
            if breaker.consecutive_failures >= self.config.failure_threshold {
                breaker.state = CircuitState::Open;
                breaker.opened_at = Some(Instant::now());
            }
        }
    }

    /// Runs the full selection (primaries + secondaries, then fallbacks if
    /// needed) to completion or `run_deadline`, streaming records to
    /// `record_tx` as each agent finishes an attempt (spec §4.5 step 6).
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        self: &Arc<Self>,
        decision: &RoutingDecision,
        agents: &Arc<HashMap<AgentId, Box<dyn Agent>>>,
        registry: &Arc<AgentRegistry>,
        params: &RunParams,
        run_deadline: Instant,
        cancellation_token: CancellationToken,
        record_tx: UnboundedSender<JobRecord>,
        max_concurrent_override: Option<usize>,
    ) -> SchedulerOutcome {
        let primary_and_secondary: Vec<AgentId> = decision
            .selected
            .iter()
            .filter(|s| s.role != SelectionRole::Fallback)
            .map(|s| s.agent_id)
            .collect();
        let fallbacks: Vec<AgentId> = decision
            .selected
            .iter()
            .filter(|s| s.role == SelectionRole::Fallback)
            .map(|s| s.agent_id)
            .collect();

        let max_concurrent = max_concurrent_override.unwrap_or(self.config.max_concurrent_agents);
        let pool_size = max_concurrent.min(primary_and_secondary.len().max(1));
        let semaphore = Arc::new(Semaphore::new(pool_size.max(1)));

        // Broadcasts cancel to every in-flight `scrape` the moment
        // `run_deadline` passes, rather than waiting for each agent to poll
        // its own deadline (spec §4.5 step 6 / §5).
        let deadline_watcher = {
            let token = cancellation_token.clone();
            tokio::spawn(async move {
                sleep_until(run_deadline).await;
                token.cancel();
            })
        };

        let mut merged_so_far: u32 = 0;
        let mut executions = self
            .run_batch(
                &primary_and_secondary,
                agents,
                registry,
                params,
                run_deadline,
                &cancellation_token,
                &record_tx,
                &semaphore,
            )
            .await;

        merged_so_far += executions.iter().map(|e| e.jobs_returned).sum::<u32>();

        let deadline_exceeded_so_far = Instant::now() >= run_deadline;

        // Fallback activation (spec §4.5 step 7).
        if merged_so_far < params.min_results_for_success as u32
            && !fallbacks.is_empty()
            && !deadline_exceeded_so_far
            && !cancellation_token.is_cancelled()
        {
            let activated: Vec<AgentId> = fallbacks.into_iter().take(self.config.k_fallback).collect();
            debug!(?activated, merged_so_far, "activating fallback agents");
            let fallback_pool_size = max_concurrent.min(activated.len().max(1));
            let fallback_semaphore = Arc::new(Semaphore::new(fallback_pool_size.max(1)));
            let mut fallback_executions = self
                .run_batch(
                    &activated,
                    agents,
                    registry,
                    params,
                    run_deadline,
                    &cancellation_token,
                    &record_tx,
                    &fallback_semaphore,
                )
                .await;
            executions.append(&mut fallback_executions);
        }

        deadline_watcher.abort();

        SchedulerOutcome {
            executions,
            deadline_exceeded: Instant::now() >= run_deadline,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_batch(
        self: &Arc<Self>,
        ids: &[AgentId],
        agents: &Arc<HashMap<AgentId, Box<dyn Agent>>>,
        registry: &Arc<AgentRegistry>,
        params: &RunParams,
        run_deadline: Instant,
        cancellation_token: &CancellationToken,
        record_tx: &UnboundedSender<JobRecord>,
        semaphore: &Arc<Semaphore>,
    ) -> Vec<AgentExecution> {
        let mut join_set = tokio::task::JoinSet::new();

        for agent_id in ids.iter().copied() {
            let Some(descriptor) = registry.get(agent_id) else {
                continue;
            };
            if !agents.contains_key(&agent_id) {
                continue;
            }

            let scheduler = Arc::clone(self);
            let semaphore = Arc::clone(semaphore);
            let agents = Arc::clone(agents);
            let cancellation_token = cancellation_token.clone();
            let record_tx = record_tx.clone();
            let rate_limit = descriptor.rate_limit;
            let avg_latency_ms = descriptor.avg_latency_ms;

            let search_term = params.search_term.clone();
            let location = params.location.clone();
            let results_wanted = params.results_wanted;
            let max_age_hours = params.max_age_hours;
            let job_type = params.job_type;
            let is_remote = params.is_remote;
            let country = params.country.clone();
            let language = params.language.clone();

            let scrape_input_factory = move || ScrapeInput {
                search_term: search_term.clone(),
                location: location.clone(),
                results_wanted,
                max_age_hours,
                job_type,
                is_remote,
                country: country.clone(),
                language: language.clone(),
                cancellation_token: cancellation_token.clone(),
                deadline: run_deadline,
            };

            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let agent: &dyn Agent = agents.get(&agent_id).expect("checked above").as_ref();
                scheduler
                    .execute_one(
                        agent_id,
                        agent,
                        rate_limit.requests_per_minute,
                        rate_limit.burst,
                        avg_latency_ms,
                        scrape_input_factory,
                        run_deadline,
                        &record_tx,
                    )
                    .await
            });
        }

        let mut executions = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(execution) => executions.push(execution),
                Err(join_err) => warn!(%join_err, "agent execution task panicked"),
            }
        }
        executions
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_one<F>(
        self: &Arc<Self>,
        agent_id: AgentId,
        agent: &dyn Agent,
        requests_per_minute: u32,
        burst: u32,
        avg_latency_ms: u64,
        scrape_input_factory: F,
        run_deadline: Instant,
        record_tx: &UnboundedSender<JobRecord>,
    ) -> AgentExecution
    where
        F: Fn() -> ScrapeInput,
    {
        let mut execution = AgentExecution::queued(agent_id);

        if matches!(self.circuit_check(agent_id).await, CircuitDecision::Skip) {
            execution.state = ExecutionState::CircuitOpen;
            execution.ended_at = Some(chrono::Utc::now());
            return execution;
        }

        execution.state = ExecutionState::Running;
        execution.first_started_at = Some(chrono::Utc::now());

        let mut rng = rand::thread_rng();
        let mut last_reason = TerminatedReason::NetworkError;
        let mut collected: Vec<JobRecord> = Vec::new();

        loop {
            // Every attempt, including retries, re-acquires a token: a
            // retried call must not ride on the slot its failed predecessor
            // already consumed (spec §4.5 step 5).
            let remaining = run_deadline.saturating_duration_since(Instant::now());
            let wait_budget = remaining.mul_f64(self.config.token_wait_budget_ratio);
            if !self.acquire_rate_limit_token(agent_id, requests_per_minute, burst, wait_budget).await {
                execution.state = ExecutionState::RateLimited;
                break;
            }

            execution.attempts += 1;

            let remaining = run_deadline.saturating_duration_since(Instant::now());
            let per_call_budget = remaining.min(Duration::from_millis((avg_latency_ms as f64 * 2.5) as u64));
            let per_call_deadline = Instant::now() + per_call_budget;

            let mut input = scrape_input_factory();
            input.deadline = per_call_deadline.min(run_deadline);

            // Hard backstop: an agent that doesn't poll `input.deadline`
            // between its own internal awaits gets forcibly aborted rather
            // than left to run past the budget (spec §4.5/§5 watchdog).
            let output = match tokio::time::timeout(per_call_budget + WATCHDOG_GRACE, agent.scrape(input)).await {
                Ok(output) => output,
                Err(_elapsed) => ScrapeOutput::failed(TerminatedReason::TimedOut),
            };
            last_reason = output.terminated_reason;
            execution.raw_record_count += output.records.len() as u32;

            for record in &output.records {
                let _ = record_tx.send(record.clone());
            }
            collected.extend(output.records);

            let succeeded = matches!(last_reason, TerminatedReason::Complete | TerminatedReason::TruncatedResultsCap);
            if succeeded {
                self.record_outcome(agent_id, false, true).await;
                execution.state = ExecutionState::Succeeded;
                break;
            }

            self.record_outcome(agent_id, last_reason.counts_toward_circuit_trip(), false).await;

            let retriable = last_reason.is_retriable() && execution.attempts < self.config.retry_max_attempts;
            let time_left = Instant::now() < run_deadline;
            if !retriable || !time_left {
                execution.state = match last_reason {
                    TerminatedReason::TimedOut => ExecutionState::TimedOut,
                    _ => ExecutionState::Failed,
                };
                break;
            }

            let backoff_base = self.config.retry_base_backoff * (1u32 << (execution.attempts - 1));
            let jitter_fraction: f64 = rng.gen_range(-0.2..=0.2);
            let backoff = backoff_base.mul_f64(1.0 + jitter_fraction).min(run_deadline.saturating_duration_since(Instant::now()));
            sleep_until(Instant::now() + backoff).await;
        }

        execution.jobs_returned = collected.len() as u32;
        execution.error_kind = match execution.state {
            ExecutionState::Succeeded | ExecutionState::RateLimited => None,
            _ => Some(last_reason),
        };
        execution.ended_at = Some(chrono::Utc::now());
        debug_assert!(execution.state.is_terminal());
        execution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(60, 1);
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn circuit_breaker_state_starts_closed() {
        let breaker = CircuitBreakerState::new();
        assert_eq!(breaker.state, CircuitState::Closed);
    }
}
