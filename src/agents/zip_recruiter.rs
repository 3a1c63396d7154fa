//! ZipRecruiter agent — North America only.

use async_trait::async_trait;
use tokio::time::Duration;

use crate::agent::{Agent, ScrapeInput, ScrapeOutput};
use crate::registry::AgentId;

use super::common::{run_scrape, AgentProfile};

pub struct ZipRecruiterAgent;

#[async_trait]
impl Agent for ZipRecruiterAgent {
    fn id(&self) -> AgentId {
        AgentId::ZipRecruiter
    }

    async fn scrape(&self, input: ScrapeInput) -> ScrapeOutput {
        let profile = AgentProfile {
            id: AgentId::ZipRecruiter,
            domain: "ziprecruiter.com",
            has_salary: true,
            per_record_latency: Duration::from_millis(60),
        };
        run_scrape(&profile, input).await
    }
}
