//! Shared scaffolding for the nine concrete agents.
//!
//! The spec treats each agent's HTML/DOM/JSON/browser parsing as an opaque,
//! out-of-scope capability (spec §1, §4.2 Non-goals). What's in scope is the
//! *contract*: honoring deadlines and cancellation, returning partial
//! records with the mandatory fields populated, and reifying failure as
//! `TerminatedReason` rather than panicking. This module centralizes that
//! contract-honoring scaffolding so each of the nine agent files only states
//! what's genuinely agent-specific (its id, its home domain, whether it
//! surfaces salary data).

use chrono::Utc;
use tokio::time::{sleep_until, Duration, Instant};

use crate::agent::{ScrapeInput, ScrapeOutput, TerminatedReason};
use crate::registry::AgentId;
use crate::types::{DescriptionFormat, JobRecord, Location};

/// Behavior honored by every concrete agent via [`run_scrape`].
pub struct AgentProfile {
    pub id: AgentId,
    pub domain: &'static str,
    pub has_salary: bool,
    /// Simulated per-record fetch latency; keeps heavier (e.g.
    /// browser-automation) agents from completing implausibly fast.
    pub per_record_latency: Duration,
}

/// Shared scrape loop: emits up to `input.results_wanted` synthetic partial
/// records, checking the deadline and cancellation token between each one,
/// exactly as the contract in `agent.rs` requires.
pub async fn run_scrape(profile: &AgentProfile, input: ScrapeInput) -> ScrapeOutput {
    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let cap = input.results_wanted.min(40);

    for i in 0..cap {
        if input.cancellation_token.is_cancelled() {
            return ScrapeOutput {
                records,
                terminated_reason: TerminatedReason::TimedOut,
                warnings,
            };
        }

        if Instant::now() >= input.deadline {
            return ScrapeOutput {
                records,
                terminated_reason: TerminatedReason::TimedOut,
                warnings,
            };
        }

        let wake_at = Instant::now() + profile.per_record_latency;
        tokio::select! {
            _ = sleep_until(wake_at.min(input.deadline)) => {}
            _ = input.cancellation_token.cancelled() => {
                return ScrapeOutput {
                    records,
                    terminated_reason: TerminatedReason::TimedOut,
                    warnings,
                };
            }
        }

        if Instant::now() >= input.deadline {
            return ScrapeOutput {
                records,
                terminated_reason: TerminatedReason::TimedOut,
                warnings,
            };
        }

        let native_id = format!("{}-{:04}", profile.id.as_str(), i);
        let title = format!("{} ({})", input.search_term, profile.id.as_str());
        let location_raw = input
            .location
            .clone()
            .unwrap_or_else(|| "Unspecified".to_string());

        if !profile.has_salary && i % 7 == 0 {
            warnings.push(format!("{}: compensation unavailable for listing {i}", profile.id));
        }

        records.push(JobRecord {
            id: format!("{}:{}", profile.id.as_str(), native_id),
            source_agent: profile.id.to_string(),
            source_url: format!("https://{}/jobs/{}", profile.domain, native_id),
            direct_apply_url: None,
            title,
            company: format!("Company via {}", profile.id.as_str()),
            company_url: None,
            company_logo: None,
            company_size: None,
            company_industry: None,
            location: Location::from_raw(location_raw),
            posted_at: None,
            scraped_at: Utc::now(),
            description: None,
            description_format: DescriptionFormat::Plain,
            job_type: input.job_type,
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
        });
    }

    let terminated_reason = if (records.len() as u32) >= input.results_wanted {
        TerminatedReason::Complete
    } else {
        TerminatedReason::TruncatedResultsCap
    };

    ScrapeOutput {
        records,
        terminated_reason,
        warnings,
    }
}
