//! BDJobs agent — Bangladesh only, headless-browser backed (spec §4.2: the
//! heaviest of the nine, hence the longer per-record latency below and the
//! larger `avg_latency_ms` the registry budgets for it).

use async_trait::async_trait;
use tokio::time::Duration;

use crate::agent::{Agent, ScrapeInput, ScrapeOutput};
use crate::registry::AgentId;

use super::common::{run_scrape, AgentProfile};

pub struct BdJobsAgent;

#[async_trait]
impl Agent for BdJobsAgent {
    fn id(&self) -> AgentId {
        AgentId::BdJobs
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        let profile = AgentProfile {
            id: AgentId::BdJobs,
            domain: "bdjobs.com",
            has_salary: false,
            per_record_latency: Duration::from_millis(160),
        };
        run_scrape(&profile, input).await
    }
}
