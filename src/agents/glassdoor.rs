//! Glassdoor agent — North America / Europe only, never Global (spec §9).

use async_trait::async_trait;
use tokio::time::Duration;

use crate::agent::{Agent, ScrapeInput, ScrapeOutput};
use crate::registry::AgentId;

use super::common::{run_scrape, AgentProfile};

pub struct GlassdoorAgent;

#[async_trait]
impl Agent for GlassdoorAgent {
    fn id(&self) -> AgentId {
        AgentId::Glassdoor
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        let profile = AgentProfile {
            id: AgentId::Glassdoor,
            domain: "glassdoor.com",
            has_salary: true,
            per_record_latency: Duration::from_millis(90),
        };
        run_scrape(&profile, input).await
    }
}
