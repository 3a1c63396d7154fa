//! Naukri agent — India only.

use async_trait::async_trait;
use tokio::time::Duration;

use crate::agent::{Agent, ScrapeInput, ScrapeOutput};
use crate::registry::AgentId;

use super::common::{run_scrape, AgentProfile};

pub struct NaukriAgent;

#[async_trait]
impl Agent for NaukriAgent {
    fn id(&self) -> AgentId {
        AgentId::Naukri
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        let profile = AgentProfile {
            id: AgentId::Naukri,
            domain: "naukri.com",
            has_salary: false,
            per_record_latency: Duration::from_millis(80),
        };
        run_scrape(&profile, input).await
    }
}
