//! Agent Registry & Capability Catalog (spec §4.1, component C2).
//!
//! Single read-only source of truth for the closed nine-agent set. Loaded
//! once and never mutated at runtime — unlike the teacher's CSV-backed,
//! `RwLock`-guarded registry (which accepted live reloads of an open-ended
//! agent directory), this catalog is static data, so a plain `HashMap` is
//! enough: there is nothing to race against.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::{Industry, Region};

/// Closed set of concrete scraping agents (spec §9 Open Question: the
/// registry is authoritative over README-vs-router drift in the source;
/// unknown ids are rejected at construction, never silently accepted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum AgentId {
    LinkedIn,
    Indeed,
    Glassdoor,
    GoogleJobs,
    ZipRecruiter,
    Seek,
    Naukri,
    Bayt,
    BdJobs,
}

impl AgentId {
    pub const ALL: [AgentId; 9] = [
        AgentId::LinkedIn,
        AgentId::Indeed,
        AgentId::Glassdoor,
        AgentId::GoogleJobs,
        AgentId::ZipRecruiter,
        AgentId::Seek,
        AgentId::Naukri,
        AgentId::Bayt,
        AgentId::BdJobs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentId::LinkedIn => "linkedin",
            AgentId::Indeed => "indeed",
            AgentId::Glassdoor => "glassdoor",
            AgentId::GoogleJobs => "google_jobs",
            AgentId::ZipRecruiter => "zip_recruiter",
            AgentId::Seek => "seek",
            AgentId::Naukri => "naukri",
            AgentId::Bayt => "bayt",
            AgentId::BdJobs => "bdjobs",
        }
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Salary,
    RemoteFilter,
    DateFilter,
    Description,
    CompanyRating,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests_per_minute: u32,
    pub burst: u32,
}

/// Static metadata describing one agent's coverage, reliability prior, and
/// call budget. Never mutated after the registry is built (spec §3).
#[derive(Debug, Clone)]
pub struct AgentDescriptor {
    pub id: AgentId,
    pub primary_regions: HashSet<Region>,
    pub excluded_regions: HashSet<Region>,
    pub industry_affinity: HashMap<Industry, f64>,
    pub reliability_score: f64,
    pub avg_latency_ms: u64,
    pub rate_limit: RateLimit,
    pub capabilities: HashSet<Capability>,
    pub max_results_per_call: u32,
    pub supports_job_type_filter: bool,
}

impl AgentDescriptor {
    /// Whether this agent is "global-capable": not excluded from `Global`
    /// and not scoped to a single primary region only.
    pub fn is_global_capable(&self) -> bool {
        !self.excluded_regions.contains(&Region::Global) && self.primary_regions.contains(&Region::Global)
    }

    pub fn industry_affinity(&self, industry: Industry) -> f64 {
        self.industry_affinity.get(&industry).copied().unwrap_or(0.2)
    }
}

fn affinity(pairs: &[(Industry, f64)]) -> HashMap<Industry, f64> {
    pairs.iter().copied().collect()
}

fn regions(rs: &[Region]) -> HashSet<Region> {
    rs.iter().copied().collect()
}

fn default_rate_limit() -> RateLimit {
    // Sensible defaults per spec §9: the source never specified per-agent
    // rate limits uniformly; 30 rpm / burst 5 is the fallback every
    // descriptor below overrides deliberately.
    RateLimit {
        requests_per_minute: 30,
        burst: 5,
    }
}

fn build_catalog() -> HashMap<AgentId, AgentDescriptor> {
    use Capability::*;
    use Industry::*;
    use Region::*;

    let mut map = HashMap::new();

    map.insert(
        AgentId::LinkedIn,
        AgentDescriptor {
            id: AgentId::LinkedIn,
            primary_regions: regions(&[Global, NorthAmerica, Europe]),
            excluded_regions: HashSet::new(),
            industry_affinity: affinity(&[(Technology, 0.9), (Finance, 0.7), (Healthcare, 0.5)]),
            reliability_score: 0.9,
            avg_latency_ms: 1800,
            rate_limit: RateLimit {
                requests_per_minute: 20,
                burst: 4,
            },
            capabilities: [Salary, RemoteFilter, DateFilter, Description, CompanyRating]
                .into_iter()
                .collect(),
            max_results_per_call: 25,
            supports_job_type_filter: true,
        },
    );

    map.insert(
        AgentId::Indeed,
        AgentDescriptor {
            id: AgentId::Indeed,
            primary_regions: regions(&[Global, NorthAmerica, Europe, Oceania]),
            excluded_regions: HashSet::new(),
            industry_affinity: affinity(&[(Technology, 0.8), (Retail, 0.7), (Manufacturing, 0.6)]),
            reliability_score: 0.85,
            avg_latency_ms: 1200,
            rate_limit: RateLimit {
                requests_per_minute: 30,
                burst: 6,
            },
            capabilities: [Salary, RemoteFilter, DateFilter, Description]
                .into_iter()
                .collect(),
            max_results_per_call: 30,
            supports_job_type_filter: true,
        },
    );

    map.insert(
        AgentId::Glassdoor,
        AgentDescriptor {
            id: AgentId::Glassdoor,
            // spec §9: Glassdoor's source had an unpatched "not available for
            // WORLDWIDE" defect. This registry excludes Global outright —
            // the routing engine's hard filter (§4.4 step 7) is a second,
            // independent backstop, not the only fix.
            primary_regions: regions(&[NorthAmerica, Europe]),
            excluded_regions: regions(&[Global]),
            industry_affinity: affinity(&[(Technology, 0.75), (Finance, 0.65)]),
            reliability_score: 0.75,
            avg_latency_ms: 2200,
            rate_limit: default_rate_limit(),
            capabilities: [Salary, Description, CompanyRating].into_iter().collect(),
            max_results_per_call: 20,
            supports_job_type_filter: false,
        },
    );

    map.insert(
        AgentId::GoogleJobs,
        AgentDescriptor {
            id: AgentId::GoogleJobs,
            primary_regions: regions(&[Global]),
            excluded_regions: HashSet::new(),
            industry_affinity: affinity(&[
                (Technology, 0.6),
                (Healthcare, 0.6),
                (Education, 0.6),
                (Government, 0.6),
            ]),
            reliability_score: 0.7,
            avg_latency_ms: 2600,
            rate_limit: RateLimit {
                requests_per_minute: 25,
                burst: 5,
            },
            capabilities: [DateFilter, Description].into_iter().collect(),
            max_results_per_call: 40,
            supports_job_type_filter: false,
        },
    );

    map.insert(
        AgentId::ZipRecruiter,
        AgentDescriptor {
            id: AgentId::ZipRecruiter,
            primary_regions: regions(&[NorthAmerica]),
            excluded_regions: regions(&[
                Europe,
                Oceania,
                EastAsia,
                SoutheastAsia,
                SouthAsia,
                MiddleEast,
                Africa,
                LatinAmerica,
                Global,
            ]),
            industry_affinity: affinity(&[(Technology, 0.6), (Retail, 0.6), (Construction, 0.5)]),
            reliability_score: 0.7,
            avg_latency_ms: 1500,
            rate_limit: default_rate_limit(),
            capabilities: [Salary, RemoteFilter, Description].into_iter().collect(),
            max_results_per_call: 25,
            supports_job_type_filter: true,
        },
    );

    map.insert(
        AgentId::Seek,
        AgentDescriptor {
            id: AgentId::Seek,
            primary_regions: regions(&[Oceania]),
            excluded_regions: regions(&[
                NorthAmerica,
                Europe,
                EastAsia,
                SoutheastAsia,
                SouthAsia,
                MiddleEast,
                Africa,
                LatinAmerica,
                Global,
            ]),
            industry_affinity: affinity(&[(Construction, 0.6), (Healthcare, 0.6), (Technology, 0.5)]),
            reliability_score: 0.8,
            avg_latency_ms: 1600,
            rate_limit: default_rate_limit(),
            capabilities: [Salary, Description, CompanyRating].into_iter().collect(),
            max_results_per_call: 20,
            supports_job_type_filter: true,
        },
    );

    map.insert(
        AgentId::Naukri,
        AgentDescriptor {
            id: AgentId::Naukri,
            primary_regions: regions(&[SouthAsia]),
            excluded_regions: regions(&[
                NorthAmerica,
                Europe,
                Oceania,
                EastAsia,
                SoutheastAsia,
                MiddleEast,
                Africa,
                LatinAmerica,
                Global,
            ]),
            industry_affinity: affinity(&[(Technology, 0.75), (Finance, 0.5)]),
            reliability_score: 0.65,
            avg_latency_ms: 2000,
            rate_limit: default_rate_limit(),
            capabilities: [Description].into_iter().collect(),
            max_results_per_call: 25,
            supports_job_type_filter: false,
        },
    );

    map.insert(
        AgentId::Bayt,
        AgentDescriptor {
            id: AgentId::Bayt,
            primary_regions: regions(&[MiddleEast]),
            excluded_regions: regions(&[
                NorthAmerica,
                Europe,
                Oceania,
                EastAsia,
                SoutheastAsia,
                SouthAsia,
                Africa,
                LatinAmerica,
                Global,
            ]),
            industry_affinity: affinity(&[(Construction, 0.6), (Government, 0.5)]),
            reliability_score: 0.6,
            avg_latency_ms: 2400,
            rate_limit: default_rate_limit(),
            capabilities: [Description].into_iter().collect(),
            max_results_per_call: 20,
            supports_job_type_filter: false,
        },
    );

    map.insert(
        AgentId::BdJobs,
        AgentDescriptor {
            id: AgentId::BdJobs,
            primary_regions: regions(&[SouthAsia]),
            excluded_regions: regions(&[
                NorthAmerica,
                Europe,
                Oceania,
                EastAsia,
                SoutheastAsia,
                MiddleEast,
                Africa,
                LatinAmerica,
                Global,
            ]),
            industry_affinity: affinity(&[(Manufacturing, 0.5), (Retail, 0.5)]),
            reliability_score: 0.55,
            // Heaviest of the nine: a headless-browser agent needs a longer
            // latency budget so the scheduler doesn't starve it (spec §4.2).
            avg_latency_ms: 3200,
            rate_limit: RateLimit {
                requests_per_minute: 15,
                burst: 3,
            },
            capabilities: HashSet::new(),
            max_results_per_call: 15,
            supports_job_type_filter: false,
        },
    );

    map
}

/// Read-only catalog of the nine agents. Construct once with
/// [`AgentRegistry::new`] and share via `Arc` (the registry itself has no
/// interior mutability — there is nothing left to protect).
pub struct AgentRegistry {
    agents: HashMap<AgentId, AgentDescriptor>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: build_catalog(),
        }
    }

    pub fn get_all_agents(&self) -> Vec<&AgentDescriptor> {
        let mut all: Vec<&AgentDescriptor> = self.agents.values().collect();
        all.sort_by_key(|a| a.id);
        all
    }

    pub fn get(&self, agent_id: AgentId) -> Option<&AgentDescriptor> {
        self.agents.get(&agent_id)
    }

    pub fn supports_region(&self, agent_id: AgentId, region: Region) -> bool {
        match self.agents.get(&agent_id) {
            Some(descriptor) => !descriptor.excluded_regions.contains(&region),
            None => false,
        }
    }

    pub fn supports_industry(&self, agent_id: AgentId, industry: Industry) -> f64 {
        self.agents
            .get(&agent_id)
            .map(|d| d.industry_affinity(industry))
            .unwrap_or(0.2)
    }

    pub fn count(&self) -> usize {
        self.agents.len()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_carries_all_nine_agents() {
        let registry = AgentRegistry::new();
        assert_eq!(registry.count(), 9);
        for id in AgentId::ALL {
            assert!(registry.get(id).is_some(), "missing descriptor for {id}");
        }
    }

    #[test]
    fn glassdoor_excludes_global_region() {
        let registry = AgentRegistry::new();
        assert!(!registry.supports_region(AgentId::Glassdoor, Region::Global));
    }

    #[test]
    fn geo_specific_agents_exclude_global() {
        let registry = AgentRegistry::new();
        for id in [AgentId::ZipRecruiter, AgentId::Seek, AgentId::Naukri, AgentId::Bayt, AgentId::BdJobs] {
            assert!(
                !registry.supports_region(id, Region::Global),
                "{id} should exclude Global"
            );
        }
    }

    #[test]
    fn industry_affinity_defaults_to_point_two() {
        let registry = AgentRegistry::new();
        assert_eq!(
            registry.supports_industry(AgentId::BdJobs, Industry::Technology),
            0.2
        );
    }
}
