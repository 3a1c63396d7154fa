//! Crate-wide error type for programmer-facing failures.
//!
//! Per-agent and per-run failures are never raised as `Result::Err` — they
//! are reified as `AgentExecution` terminal states and carried in the
//! `RunReport` (see `observability`). `EngineError` exists only for the
//! handful of failures that indicate a caller misused the API.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("query text must not be empty")]
    EmptyQuery,

    #[error("results_wanted must be between 1 and {max}, got {got}")]
    ResultsWantedOutOfRange { got: u32, max: u32 },

    #[error("unknown agent id in configuration: {0}")]
    UnknownAgentId(String),

    #[error("composite score weights must sum to 1.0, got {0}")]
    InvalidScoreWeights(f64),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("force_agents referenced an id not present in the registry: {0}")]
    ForcedAgentNotRegistered(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
