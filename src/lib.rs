//! Intent routing and concurrent execution core for a multi-platform
//! job-search aggregator.
//!
//! Given a free-form query, this crate classifies its region/industry/
//! seniority ([`intent`]), selects a subset of the nine job-board agents
//! best suited to serve it ([`routing`]), runs them concurrently under
//! per-agent rate limits, retries, and circuit breaking ([`scheduler`]),
//! and merges/deduplicates/scores the results into one canonical schema
//! ([`merger`]). [`engine::Engine`] is the entry point most callers want.

pub mod agent;
pub mod agents;
pub mod config;
pub mod engine;
pub mod error;
pub mod intent;
pub mod merger;
pub mod observability;
pub mod registry;
pub mod routing;
pub mod scheduler;
pub mod types;

pub use engine::{Engine, RunOptions, RunResult};
pub use error::{EngineError, Result};
pub use observability::RunReport;
pub use types::{JobRecord, Query};
