//! Seek agent — Australia / New Zealand only.

use async_trait::async_trait;
use tokio::time::Duration;

use crate::agent::{Agent, ScrapeInput, ScrapeOutput};
use crate::registry::AgentId;

use super::common::{run_scrape, AgentProfile};

pub struct SeekAgent;

#[async_trait]
impl Agent for SeekAgent {
    fn id(&self) -> AgentId {
        AgentId::Seek
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        let profile = AgentProfile {
            id: AgentId::Seek,
            domain: "seek.com.au",
            has_salary: true,
            per_record_latency: Duration::from_millis(65),
        };
        run_scrape(&profile, input).await
    }
}
