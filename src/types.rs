//! Canonical data shapes: the `Query` input and the 34-field `JobRecord`
//! output schema (spec §3), plus the closed enums shared across every
//! component (`Region`, `Industry`, `Seniority`, ...).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Hard cap on `Query::results_wanted` (spec §3).
pub const MAX_RESULTS_WANTED: u32 = 500;
pub const DEFAULT_RESULTS_WANTED: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Temporary,
    Internship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seniority {
    Intern,
    Junior,
    Mid,
    Senior,
    Lead,
    Unknown,
}

impl Default for Seniority {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Geographic region, closed set (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    NorthAmerica,
    Europe,
    Oceania,
    EastAsia,
    SoutheastAsia,
    SouthAsia,
    MiddleEast,
    Africa,
    LatinAmerica,
    Global,
    Unknown,
}

impl Region {
    pub const ALL: [Region; 11] = [
        Region::NorthAmerica,
        Region::Europe,
        Region::Oceania,
        Region::EastAsia,
        Region::SoutheastAsia,
        Region::SouthAsia,
        Region::MiddleEast,
        Region::Africa,
        Region::LatinAmerica,
        Region::Global,
        Region::Unknown,
    ];
}

impl Default for Region {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Industry vertical, closed set (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Industry {
    Technology,
    Finance,
    Healthcare,
    Construction,
    Education,
    Retail,
    Manufacturing,
    Government,
    Other,
    Unknown,
}

impl Default for Industry {
    fn default() -> Self {
        Self::Unknown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptionFormat {
    Plain,
    Markdown,
    Html,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompensationInterval {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompensationSource {
    Listing,
    Estimate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingKind {
    Organic,
    Sponsored,
}

/// User-facing query. Immutable once constructed via [`Query::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    text: String,
    location: Option<String>,
    results_wanted: u32,
    max_age_hours: Option<u32>,
    job_type: Option<JobType>,
    is_remote: Option<bool>,
    country_hint: Option<String>,
    language_hint: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(EngineError::EmptyQuery);
        }
        Ok(Self {
            text,
            location: None,
            results_wanted: DEFAULT_RESULTS_WANTED,
            max_age_hours: None,
            job_type: None,
            is_remote: None,
            country_hint: None,
            language_hint: None,
        })
    }

    pub fn with_results_wanted(mut self, results_wanted: u32) -> Result<Self> {
        if results_wanted == 0 || results_wanted > MAX_RESULTS_WANTED {
            return Err(EngineError::ResultsWantedOutOfRange {
                got: results_wanted,
                max: MAX_RESULTS_WANTED,
            });
        }
        self.results_wanted = results_wanted;
        Ok(self)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_max_age_hours(mut self, hours: u32) -> Self {
        self.max_age_hours = Some(hours);
        self
    }

    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = Some(job_type);
        self
    }

    pub fn with_is_remote(mut self, is_remote: bool) -> Self {
        self.is_remote = Some(is_remote);
        self
    }

    pub fn with_country_hint(mut self, country: impl Into<String>) -> Self {
        self.country_hint = Some(country.into());
        self
    }

    pub fn with_language_hint(mut self, language: impl Into<String>) -> Self {
        self.language_hint = Some(language.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn results_wanted(&self) -> u32 {
        self.results_wanted
    }

    pub fn max_age_hours(&self) -> Option<u32> {
        self.max_age_hours
    }

    pub fn job_type(&self) -> Option<JobType> {
        self.job_type
    }

    pub fn is_remote(&self) -> Option<bool> {
        self.is_remote
    }

    pub fn country_hint(&self) -> Option<&str> {
        self.country_hint.as_deref()
    }

    pub fn language_hint(&self) -> Option<&str> {
        self.language_hint.as_deref()
    }
}

/// Parsed location, produced by the Merger's normalization step (spec §4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    pub raw: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub is_remote: bool,
}

impl Location {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            city: None,
            state: None,
            country: None,
            is_remote: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compensation {
    pub min: f64,
    pub max: f64,
    pub currency: String,
    pub interval: CompensationInterval,
    pub source: CompensationSource,
}

impl Compensation {
    /// Normalize `min <= max`, swapping if the source reported them inverted.
    pub fn normalized(mut self) -> Self {
        if self.min > self.max {
            std::mem::swap(&mut self.min, &mut self.max);
        }
        self
    }
}

/// The 34-field canonical job record (spec §3, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub source_agent: String,
    pub source_url: String,
    pub direct_apply_url: Option<String>,
    pub title: String,
    pub company: String,
    pub company_url: Option<String>,
    pub company_logo: Option<String>,
    pub company_size: Option<String>,
    pub company_industry: Option<String>,
    pub location: Location,
    pub posted_at: Option<DateTime<Utc>>,
    pub scraped_at: DateTime<Utc>,
    pub description: Option<String>,
    pub description_format: DescriptionFormat,
    pub job_type: Option<JobType>,
    pub seniority: Option<Seniority>,
    pub compensation: Option<Compensation>,
    pub skills: Vec<String>,
    pub benefits: Vec<String>,
    pub listing_kind: Option<ListingKind>,
    pub dedup_key: String,
    pub quality_score: f64,
    pub aliases: Vec<String>,
    pub source_warnings: Vec<String>,
    pub attempts: u32,
}

impl JobRecord {
    /// Normalized fingerprint used for cross-source near-duplicate detection
    /// (spec §3 invariants, §4.6): title ⊕ company ⊕ city ⊕ first 120 chars
    /// of the description, each case/whitespace-folded.
    pub fn compute_dedup_key(
        title: &str,
        company: &str,
        city: Option<&str>,
        description: Option<&str>,
    ) -> String {
        let norm = |s: &str| -> String {
            s.chars()
                .filter(|c| c.is_alphanumeric() || c.is_whitespace())
                .flat_map(|c| c.to_lowercase())
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        };

        let desc_prefix = description
            .map(|d| d.chars().take(120).collect::<String>())
            .unwrap_or_default();

        format!(
            "{}\u{1}{}\u{1}{}\u{1}{}",
            norm(title),
            norm(company),
            norm(city.unwrap_or_default()),
            norm(&desc_prefix)
        )
    }

    pub fn lowercase_unique_skills(skills: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for skill in skills {
            let lower = skill.to_lowercase();
            if seen.insert(lower.clone()) {
                out.push(lower);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_rejects_empty_text() {
        assert!(Query::new("   ").is_err());
    }

    #[test]
    fn query_rejects_out_of_range_results_wanted() {
        let q = Query::new("rust engineer").unwrap();
        assert!(q.with_results_wanted(0).is_err());
        let q = Query::new("rust engineer").unwrap();
        assert!(q.with_results_wanted(501).is_err());
    }

    #[test]
    fn query_defaults() {
        let q = Query::new("rust engineer").unwrap();
        assert_eq!(q.results_wanted(), DEFAULT_RESULTS_WANTED);
        assert!(q.location().is_none());
    }

    #[test]
    fn dedup_key_is_case_and_space_insensitive() {
        let a = JobRecord::compute_dedup_key(
            "Senior  Rust Engineer",
            "Acme Corp",
            Some("Berlin"),
            Some("Build distributed systems in Rust."),
        );
        let b = JobRecord::compute_dedup_key(
            "senior rust engineer",
            "ACME CORP",
            Some("berlin"),
            Some("Build distributed systems in Rust."),
        );
        assert_eq!(a, b);
    }

    #[test]
    fn compensation_normalizes_inverted_range() {
        let comp = Compensation {
            min: 200_000.0,
            max: 100_000.0,
            currency: "USD".to_string(),
            interval: CompensationInterval::Year,
            source: CompensationSource::Listing,
        }
        .normalized();
        assert!(comp.min <= comp.max);
    }

    #[test]
    fn skills_dedup_case_insensitive() {
        let skills = JobRecord::lowercase_unique_skills(vec![
            "Rust".to_string(),
            "rust".to_string(),
            "Kubernetes".to_string(),
        ]);
        assert_eq!(skills, vec!["rust".to_string(), "kubernetes".to_string()]);
    }
}
