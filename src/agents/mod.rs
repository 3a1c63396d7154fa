//! Concrete scraper implementations, one module per job board (spec §4.2).
//!
//! Each agent is a thin unit struct that supplies its identity and a handful
//! of agent-specific knobs to [`common::run_scrape`], which owns the actual
//! deadline/cancellation-honoring loop shared by all nine.

pub mod common;

mod bayt;
mod bdjobs;
mod glassdoor;
mod google_jobs;
mod indeed;
mod linkedin;
mod naukri;
mod seek;
mod zip_recruiter;

pub use bayt::BaytAgent;
pub use bdjobs::BdJobsAgent;
pub use glassdoor::GlassdoorAgent;
pub use google_jobs::GoogleJobsAgent;
pub use indeed::IndeedAgent;
pub use linkedin::LinkedInAgent;
pub use naukri::NaukriAgent;
pub use seek::SeekAgent;
pub use zip_recruiter::ZipRecruiterAgent;

use std::collections::HashMap;

use crate::agent::Agent;
use crate::registry::AgentId;

/// Builds the default agent instance set, keyed by id, for wiring into the
/// [`crate::engine::Engine`] (spec §9's "Engine owns registry + agents").
pub fn build_default_agents() -> HashMap<AgentId, Box<dyn Agent>> {
    let mut agents: HashMap<AgentId, Box<dyn Agent>> = HashMap::new();
    agents.insert(AgentId::LinkedIn, Box::new(LinkedInAgent));
    agents.insert(AgentId::Indeed, Box::new(IndeedAgent));
    agents.insert(AgentId::Glassdoor, Box::new(GlassdoorAgent));
    agents.insert(AgentId::GoogleJobs, Box::new(GoogleJobsAgent));
    agents.insert(AgentId::ZipRecruiter, Box::new(ZipRecruiterAgent));
    agents.insert(AgentId::Seek, Box::new(SeekAgent));
    agents.insert(AgentId::Naukri, Box::new(NaukriAgent));
    agents.insert(AgentId::Bayt, Box::new(BaytAgent));
    agents.insert(AgentId::BdJobs, Box::new(BdJobsAgent));
    agents
}
