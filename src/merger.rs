//! Result Merger (spec §4.6, component C7).
//!
//! Normalizes, deduplicates, and scores streamed per-agent records. The
//! incremental, event-driven accumulation style (fold each incoming record
//! into a running state, one public method per kind of update) is grounded
//! on the pack's `rootsignal` aggregate pipeline (`PipelineState::apply_scrape`,
//! `apply_signal`, ...) — that reducer owns several `HashMap`/`HashSet`
//! indices and applies one record at a time; this Merger keeps that shape,
//! specialized to job records instead of signal/discovery events.

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::config::DedupPolicy;
use crate::registry::AgentRegistry;
use crate::types::{JobRecord, Location};

#[derive(Debug, Clone, Default)]
pub struct MergeStats {
    pub merged_count: usize,
    pub dedup_collapsed_count: usize,
}

/// Owns the canonical record set for one run. Fed incrementally via
/// [`Merger::ingest`] as the scheduler streams agent output (spec §4.5 step
/// 6); never shared across workers (spec §5: "owned by a single merger
/// task").
pub struct Merger {
    registry: std::sync::Arc<AgentRegistry>,
    dedup_policy: DedupPolicy,
    by_id: HashMap<String, JobRecord>,
    /// `dedup_key -> id` index, used to find near-duplicate candidates.
    by_dedup_key: HashMap<String, String>,
    dedup_collapsed_count: usize,
}

impl Merger {
    pub fn new(registry: std::sync::Arc<AgentRegistry>, dedup_policy: DedupPolicy) -> Self {
        Self {
            registry,
            dedup_policy,
            by_id: HashMap::new(),
            by_dedup_key: HashMap::new(),
            dedup_collapsed_count: 0,
        }
    }

    /// Normalizes one partial record and folds it into the running set.
    /// Returns `true` if it became (or stayed) part of the canonical set,
    /// `false` if it collapsed into an existing record.
    pub fn ingest(&mut self, mut record: JobRecord) -> bool {
        normalize(&mut record);
        record.dedup_key = JobRecord::compute_dedup_key(
            &record.title,
            &record.company,
            record.location.city.as_deref().or(Some(record.location.raw.as_str())),
            record.description.as_deref(),
        );
        record.quality_score = self.quality_score(&record);

        // Exact dedup: identical id collapses, later arrival discarded.
        if self.by_id.contains_key(&record.id) {
            self.dedup_collapsed_count += 1;
            return false;
        }

        // Near dedup: same dedup_key, different source agent. Skipped
        // entirely under `StrictIdOnly` (spec §6) — only an exact id match
        // collapses records.
        if self.dedup_policy == DedupPolicy::StrictIdOnly {
            self.by_dedup_key.insert(record.dedup_key.clone(), record.id.clone());
            self.by_id.insert(record.id.clone(), record);
            return true;
        }

        if let Some(existing_id) = self.by_dedup_key.get(&record.dedup_key).cloned() {
            let existing = self.by_id.get(&existing_id).expect("index invariant").clone();
            if existing.source_agent != record.source_agent {
                let merged = self.merge_cross_source(existing, record);
                if merged.id != existing_id {
                    self.by_id.remove(&existing_id);
                }
                self.by_dedup_key.insert(merged.dedup_key.clone(), merged.id.clone());
                self.by_id.insert(merged.id.clone(), merged);
                self.dedup_collapsed_count += 1;
                return true;
            }

            // Same-agent near-duplicate: keep the richer record, tie-break
            // by earlier scraped_at (spec §4.6).
            if field_completeness_count(&record) > field_completeness_count(&existing)
                || (field_completeness_count(&record) == field_completeness_count(&existing) && record.scraped_at < existing.scraped_at)
            {
                self.by_id.remove(&existing_id);
                self.by_id.insert(record.id.clone(), record.clone());
                self.by_dedup_key.insert(record.dedup_key.clone(), record.id.clone());
            }
            self.dedup_collapsed_count += 1;
            return true;
        }

        self.by_dedup_key.insert(record.dedup_key.clone(), record.id.clone());
        self.by_id.insert(record.id.clone(), record);
        true
    }

    fn merge_cross_source(&self, a: JobRecord, b: JobRecord) -> JobRecord {
        let a_reliability = self.source_reliability(&a.source_agent);
        let b_reliability = self.source_reliability(&b.source_agent);

        let (mut base, other) = if a_reliability >= b_reliability { (a, b) } else { (b, a) };

        if base.direct_apply_url.is_none() {
            base.direct_apply_url = other.direct_apply_url.clone();
        }
        if base.company_url.is_none() {
            base.company_url = other.company_url.clone();
        }
        if base.company_logo.is_none() {
            base.company_logo = other.company_logo.clone();
        }
        if base.company_size.is_none() {
            base.company_size = other.company_size.clone();
        }
        if base.company_industry.is_none() {
            base.company_industry = other.company_industry.clone();
        }
        if base.posted_at.is_none() {
            base.posted_at = other.posted_at;
        }
        if base.description.is_none() {
            base.description = other.description.clone();
        }
        if base.job_type.is_none() {
            base.job_type = other.job_type;
        }
        if base.seniority.is_none() {
            base.seniority = other.seniority;
        }
        if base.compensation.is_none() {
            base.compensation = other.compensation.clone();
        }
        if base.skills.is_empty() {
            base.skills = other.skills.clone();
        }
        if base.benefits.is_empty() {
            base.benefits = other.benefits.clone();
        }
        if base.listing_kind.is_none() {
            base.listing_kind = other.listing_kind;
        }

        base.aliases.push(other.id.clone());
        base.aliases.extend(other.aliases.clone());
        base.source_warnings.extend(other.source_warnings.clone());
        base.quality_score = self.quality_score(&base);
        base
    }

    fn source_reliability(&self, source_agent: &str) -> f64 {
        crate::registry::AgentId::ALL
            .iter()
            .find(|id| id.as_str() == source_agent)
            .and_then(|id| self.registry.get(*id))
            .map(|d| d.reliability_score)
            .unwrap_or(0.5)
    }

    fn quality_score(&self, record: &JobRecord) -> f64 {
        let field_completeness = field_completeness_count(record) as f64 / TOTAL_OPTIONAL_FIELDS as f64;
        let reliability = self.source_reliability(&record.source_agent);
        let has_salary = if record.compensation.is_some() { 1.0 } else { 0.0 };
        let has_description = record
            .description
            .as_ref()
            .map(|d| d.len() >= 200)
            .unwrap_or(false) as u8 as f64;

        (0.4 * field_completeness + 0.3 * reliability + 0.2 * has_salary + 0.1 * has_description).clamp(0.0, 1.0)
    }

    /// Returns the canonical records accumulated so far, soft-capped at
    /// `results_wanted` when `truncate` is requested (spec §4.6: excess
    /// records still exist for cross-agent merging, just not returned
    /// unless asked for).
    pub fn finalize(&self, results_wanted: u32, truncate: bool) -> (Vec<JobRecord>, MergeStats) {
        let mut records: Vec<JobRecord> = self.by_id.values().cloned().collect();
        records.sort_by(|a, b| b.quality_score.partial_cmp(&a.quality_score).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.id.cmp(&b.id)));

        let stats = MergeStats {
            merged_count: records.len(),
            dedup_collapsed_count: self.dedup_collapsed_count,
        };

        if truncate {
            records.truncate(results_wanted as usize);
        }

        (records, stats)
    }
}

/// 11 optional/best-effort fields counted toward `field_completeness`
/// (everything in `JobRecord` that can legitimately be absent).
const TOTAL_OPTIONAL_FIELDS: usize = 11;

fn field_completeness_count(record: &JobRecord) -> usize {
    let mut count = 0;
    if record.direct_apply_url.is_some() {
        count += 1;
    }
    if record.company_url.is_some() {
        count += 1;
    }
    if record.company_logo.is_some() {
        count += 1;
    }
    if record.company_size.is_some() {
        count += 1;
    }
    if record.company_industry.is_some() {
        count += 1;
    }
    if record.posted_at.is_some() {
        count += 1;
    }
    if record.description.is_some() {
        count += 1;
    }
    if record.job_type.is_some() {
        count += 1;
    }
    if record.seniority.is_some() {
        count += 1;
    }
    if record.compensation.is_some() {
        count += 1;
    }
    if !record.skills.is_empty() {
        count += 1;
    }
    count
}

/// Normalization pass (spec §4.6): location parsing, relative-date
/// resolution, compensation canonicalization, skill dedup. Idempotent —
/// running it twice produces the same output (spec §8 round-trip law).
pub fn normalize(record: &mut JobRecord) {
    record.location = normalize_location(&record.location);
    record.skills = JobRecord::lowercase_unique_skills(std::mem::take(&mut record.skills));
    if let Some(compensation) = record.compensation.take() {
        record.compensation = Some(compensation.normalized());
    }
}

fn normalize_location(location: &Location) -> Location {
    let raw = location.raw.trim();
    let lower = raw.to_lowercase();
    let is_remote = location.is_remote
        || ["remote", "wfh", "work from home", "anywhere", "telecommute"]
            .iter()
            .any(|kw| lower.contains(kw));

    if location.city.is_some() || location.state.is_some() || location.country.is_some() {
        return Location {
            raw: raw.to_string(),
            is_remote,
            ..location.clone()
        };
    }

    let parts: Vec<&str> = raw.split(',').map(str::trim).filter(|p| !p.is_empty()).collect();
    let (city, state, country) = match parts.len() {
        0 => (None, None, None),
        1 => (Some(parts[0].to_string()), None, None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string()), None),
        _ => (
            Some(parts[0].to_string()),
            Some(parts[1].to_string()),
            Some(parts[parts.len() - 1].to_string()),
        ),
    };

    Location {
        raw: raw.to_string(),
        city,
        state,
        country,
        is_remote,
    }
}

/// Resolves a relative posting string (`"2 days ago"`, `"yesterday"`,
/// `"just posted"`) against the agent's `scraped_at` timestamp.
pub fn resolve_relative_posted_at(relative: &str, scraped_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lower = relative.trim().to_lowercase();
    if lower.contains("just posted") || lower.contains("today") {
        return Some(scraped_at);
    }
    if lower.contains("yesterday") {
        return Some(scraped_at - ChronoDuration::days(1));
    }

    let digits: String = lower.chars().take_while(|c| c.is_ascii_digit()).collect();
    let n: i64 = digits.parse().ok()?;
    if lower.contains("hour") {
        Some(scraped_at - ChronoDuration::hours(n))
    } else if lower.contains("day") {
        Some(scraped_at - ChronoDuration::days(n))
    } else if lower.contains("week") {
        Some(scraped_at - ChronoDuration::weeks(n))
    } else if lower.contains("month") {
        Some(scraped_at - ChronoDuration::days(n * 30))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Compensation, CompensationInterval, CompensationSource, DescriptionFormat};
    use std::sync::Arc;

    fn sample_record(id: &str, source_agent: &str, title: &str, company: &str) -> JobRecord {
        JobRecord {
            id: id.to_string(),
            source_agent: source_agent.to_string(),
            source_url: "https://example.com".to_string(),
            direct_apply_url: None,
            title: title.to_string(),
            company: company.to_string(),
            company_url: None,
            company_logo: None,
            company_size: None,
            company_industry: None,
            location: Location::from_raw("Berlin, Germany"),
            posted_at: None,
            scraped_at: Utc::now(),
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

    #[test]
    fn near_duplicate_cross_source_merge_backfills_salary() {
        let registry = Arc::new(AgentRegistry::new());
        let mut merger = Merger::new(registry, DedupPolicy::IdAndFingerprint);

        let mut linkedin_record = sample_record("linkedin:1", "linkedin", "Rust Engineer", "Acme Corp");
        linkedin_record.description = Some("Build distributed systems.".to_string());

        let mut indeed_record = sample_record("indeed:1", "indeed", "Rust Engineer", "Acme Corp");
        indeed_record.description = Some("Build distributed systems.".to_string());
        indeed_record.compensation = Some(Compensation {
            min: 100_000.0,
            max: 140_000.0,
            currency: "USD".to_string(),
            interval: CompensationInterval::Year,
            source: CompensationSource::Listing,
        });

        merger.ingest(linkedin_record);
        merger.ingest(indeed_record);

        let (records, stats) = merger.finalize(20, false);
        assert_eq!(records.len(), 1);
        assert_eq!(stats.dedup_collapsed_count, 1);
        assert!(records[0].compensation.is_some());
        assert!(records[0].aliases.contains(&"indeed:1".to_string()));
    }

    #[test]
    fn exact_id_dedup_discards_later_arrival() {
        let registry = Arc::new(AgentRegistry::new());
        let mut merger = Merger::new(registry, DedupPolicy::IdAndFingerprint);
        merger.ingest(sample_record("linkedin:1", "linkedin", "Rust Engineer", "Acme Corp"));
        merger.ingest(sample_record("linkedin:1", "linkedin", "Rust Engineer (dup)", "Acme Corp"));
        let (records, _) = merger.finalize(20, false);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Rust Engineer");
    }

    #[test]
    fn dedup_is_idempotent() {
        let registry = Arc::new(AgentRegistry::new());
        let mut merger = Merger::new(registry, DedupPolicy::IdAndFingerprint);
        let record = sample_record("linkedin:1", "linkedin", "Rust Engineer", "Acme Corp");
        merger.ingest(record.clone());
        let (first, _) = merger.finalize(20, false);
        merger.ingest(record);
        let (second, _) = merger.finalize(20, false);
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn strict_id_only_keeps_cross_source_near_duplicates_separate() {
        let registry = Arc::new(AgentRegistry::new());
        let mut merger = Merger::new(registry, DedupPolicy::StrictIdOnly);

        let mut linkedin_record = sample_record("linkedin:1", "linkedin", "Rust Engineer", "Acme Corp");
        linkedin_record.description = Some("Build distributed systems.".to_string());
        let mut indeed_record = sample_record("indeed:1", "indeed", "Rust Engineer", "Acme Corp");
        indeed_record.description = Some("Build distributed systems.".to_string());

        merger.ingest(linkedin_record);
        merger.ingest(indeed_record);

        let (records, stats) = merger.finalize(20, false);
        assert_eq!(records.len(), 2);
        assert_eq!(stats.dedup_collapsed_count, 0);
    }

    #[test]
    fn quality_score_stays_in_bounds() {
        let registry = Arc::new(AgentRegistry::new());
        let mut merger = Merger::new(registry, DedupPolicy::IdAndFingerprint);
        merger.ingest(sample_record("linkedin:1", "linkedin", "Rust Engineer", "Acme Corp"));
        let (records, _) = merger.finalize(20, false);
        assert!(records[0].quality_score >= 0.0 && records[0].quality_score <= 1.0);
    }

    #[test]
    fn relative_posted_at_resolves_against_scraped_at() {
        let scraped_at = Utc::now();
        let resolved = resolve_relative_posted_at("2 days ago", scraped_at).unwrap();
        assert_eq!(resolved, scraped_at - ChronoDuration::days(2));
    }
}
