//! Engine-wide configuration surface (spec §6), loadable from TOML the way
//! the teacher's manifest/profile configs are (`serde` + `toml`), with
//! every knob defaulted so a bare `EngineConfig::default()` is a fully
//! usable engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::routing::{RoutingConfig, ScoreWeights};
use crate::scheduler::SchedulerConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub k_primary: usize,
    pub k_secondary: usize,
    pub k_fallback: usize,
    pub composite_score_weights: (f64, f64, f64),
    pub min_selection_score: f64,
    pub min_results_for_success_cap: u32,
    pub token_wait_budget_ratio: f64,
    pub circuit_breaker_cool_down_secs: u64,
    pub failure_threshold: u32,
    pub retry_max_attempts: u32,
    pub retry_base_backoff_secs: u64,
    pub max_concurrent_agents: usize,
    pub run_deadline_secs: u64,
    pub dedup_policy: DedupPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DedupPolicy {
    StrictIdOnly,
    IdAndFingerprint,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self::IdAndFingerprint
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            k_primary: 2,
            k_secondary: 2,
            k_fallback: 2,
            composite_score_weights: (0.5, 0.3, 0.2),
            min_selection_score: 0.15,
            min_results_for_success_cap: 10,
            token_wait_budget_ratio: 0.5,
            circuit_breaker_cool_down_secs: 30,
            failure_threshold: 3,
            retry_max_attempts: 3,
            retry_base_backoff_secs: 1,
            max_concurrent_agents: 4,
            run_deadline_secs: 120,
            dedup_policy: DedupPolicy::IdAndFingerprint,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(raw).map_err(EngineError::ConfigParse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let (region, industry, reliability) = self.composite_score_weights;
        let sum = region + industry + reliability;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::InvalidScoreWeights(sum));
        }
        Ok(())
    }

    pub fn routing_config(&self) -> RoutingConfig {
        let (region, industry, reliability) = self.composite_score_weights;
        RoutingConfig {
            k_primary: self.k_primary,
            k_secondary: self.k_secondary,
            k_fallback: self.k_fallback,
            score_weights: ScoreWeights { region, industry, reliability },
            min_selection_score: self.min_selection_score,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_concurrent_agents: self.max_concurrent_agents,
            token_wait_budget_ratio: self.token_wait_budget_ratio,
            circuit_breaker_cool_down: Duration::from_secs(self.circuit_breaker_cool_down_secs),
            failure_threshold: self.failure_threshold,
            retry_max_attempts: self.retry_max_attempts,
            retry_base_backoff: Duration::from_secs(self.retry_base_backoff_secs),
            k_fallback: self.k_fallback,
        }
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn weights_must_sum_to_one() {
        let mut config = EngineConfig::default();
        config.composite_score_weights = (0.5, 0.5, 0.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let config = EngineConfig::from_toml_str("k_primary = 3\n").unwrap();
        assert_eq!(config.k_primary, 3);
        assert_eq!(config.k_secondary, 2);
    }
}
