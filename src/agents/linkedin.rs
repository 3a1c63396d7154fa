//! LinkedIn Jobs agent — global-capable, primary candidate for most queries.

use async_trait::async_trait;
use tokio::time::Duration;

use crate::agent::{Agent, ScrapeInput, ScrapeOutput};
use crate::registry::AgentId;

use super::common::{run_scrape, AgentProfile};

pub struct LinkedInAgent;

#[async_trait]
impl Agent for LinkedInAgent {
    fn id(&self) -> AgentId {
        AgentId::LinkedIn
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        let profile = AgentProfile {
            id: AgentId::LinkedIn,
            domain: "linkedin.com",
            has_salary: true,
            per_record_latency: Duration::from_millis(70),
        };
        run_scrape(&profile, input).await
    }
}
