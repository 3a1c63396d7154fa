//! Agent Contract (spec §4.2, component C3).
//!
//! Every concrete scraper — HTML, JSON API, or headless-browser backed —
//! implements this single trait. Parsing strategy is entirely hidden behind
//! it; the only thing the scheduler ever sees is `ScrapeOutput`, which never
//! propagates a cross-cutting failure: everything is encoded in
//! `TerminatedReason`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::registry::AgentId;
use crate::types::{JobRecord, JobType};

/// Why an agent's scrape call ended. Never an exception at this boundary —
/// always reified data (spec §4.2, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminatedReason {
    Complete,
    TruncatedResultsCap,
    RateLimitedUpstream,
    TimedOut,
    SiteStructureError,
    NetworkError,
    RegionUnsupported,
}

impl TerminatedReason {
    /// Whether the scheduler should retry a call that ended this way
    /// (spec §4.5 step 5: only transient/timeout reasons are retriable).
    pub fn is_retriable(&self) -> bool {
        matches!(self, TerminatedReason::NetworkError | TerminatedReason::TimedOut)
    }

    /// Whether three consecutive occurrences of this reason should trip the
    /// circuit breaker (spec §4.5: network errors and upstream 5xx-equivalents).
    pub fn counts_toward_circuit_trip(&self) -> bool {
        matches!(self, TerminatedReason::NetworkError)
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeInput {
    pub search_term: String,
    pub location: Option<String>,
    pub results_wanted: u32,
    pub max_age_hours: Option<u32>,
    pub job_type: Option<JobType>,
    pub is_remote: Option<bool>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub cancellation_token: CancellationToken,
    pub deadline: Instant,
}

#[derive(Debug, Clone)]
pub struct ScrapeOutput {
    pub records: Vec<JobRecord>,
    pub terminated_reason: TerminatedReason,
    pub warnings: Vec<String>,
}

impl ScrapeOutput {
    pub fn complete(records: Vec<JobRecord>) -> Self {
        Self {
            records,
            terminated_reason: TerminatedReason::Complete,
            warnings: Vec::new(),
        }
    }

    pub fn failed(reason: TerminatedReason) -> Self {
        Self {
            records: Vec::new(),
            terminated_reason: reason,
            warnings: Vec::new(),
        }
    }
}

/// Uniform contract over all nine heterogeneous scrapers (spec §4.2).
///
/// Obligations on implementors:
/// - Honor `input.deadline`; on breach return `TimedOut` with whatever was
///   collected so far, not an error.
/// - Check `input.cancellation_token` at least between pages.
/// - Never panic on upstream failure — encode it in `terminated_reason`.
/// - Mandatory fields on every returned record: `id`, `source_agent`,
///   `source_url`, `title`, `company`, `location.raw`. Everything else is
///   best-effort.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> AgentId;

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput;
}
