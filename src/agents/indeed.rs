//! Indeed agent — broad regional coverage, JSON-API backed.

use async_trait::async_trait;
use tokio::time::Duration;

use crate::agent::{Agent, ScrapeInput, ScrapeOutput};
use crate::registry::AgentId;

use super::common::{run_scrape, AgentProfile};

pub struct IndeedAgent;

#[async_trait]
impl Agent for IndeedAgent {
    fn id(&self) -> AgentId {
        AgentId::Indeed
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        let profile = AgentProfile {
            id: AgentId::Indeed,
            domain: "indeed.com",
            has_salary: true,
            per_record_latency: Duration::from_millis(45),
        };
        run_scrape(&profile, input).await
    }
}
