//! Bayt agent — MENA region only.

use async_trait::async_trait;
use tokio::time::Duration;

use crate::agent::{Agent, ScrapeInput, ScrapeOutput};
use crate::registry::AgentId;

use super::common::{run_scrape, AgentProfile};

pub struct BaytAgent;

#[async_trait]
impl Agent for BaytAgent {
    fn id(&self) -> AgentId {
        AgentId::Bayt
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        let profile = AgentProfile {
            id: AgentId::Bayt,
            domain: "bayt.com",
            has_salary: false,
            per_record_latency: Duration::from_millis(95),
        };
        run_scrape(&profile, input).await
    }
}
