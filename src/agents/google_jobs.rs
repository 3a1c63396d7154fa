//! Google Jobs aggregator agent — global reach, thin per-record metadata.

use async_trait::async_trait;
use tokio::time::Duration;

use crate::agent::{Agent, ScrapeInput, ScrapeOutput};
use crate::registry::AgentId;

use super::common::{run_scrape, AgentProfile};

pub struct GoogleJobsAgent;

#[async_trait]
impl Agent for GoogleJobsAgent {
    fn id(&self) -> AgentId {
        AgentId::GoogleJobs
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        let profile = AgentProfile {
            id: AgentId::GoogleJobs,
            domain: "google.com",
            has_salary: false,
            per_record_latency: Duration::from_millis(100),
        };
        run_scrape(&profile, input).await
    }
}
