//! Routing Engine (spec §4.4, component C5).
//!
//! Candidate scoring and ranked selection, structured so every decision is
//! traceable — the shape of `RoutingDecision`/`RoutingReason` below is
//! grounded on the weighted-scoring, audit-trail router pattern found in
//! the pack's Rustic-AI `router.rs` (`RoutingDecision { agent, confidence,
//! reason, alternatives, ... }`), generalized from single-agent selection
//! to the ordered multi-agent selection this spec requires.

use crate::intent::IntentResult;
use crate::registry::{AgentId, AgentRegistry};
use crate::types::Region;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRole {
    Primary,
    Secondary,
    Fallback,
}

#[derive(Debug, Clone)]
pub struct SelectedAgent {
    pub agent_id: AgentId,
    pub role: SelectionRole,
    pub weight: f64,
}

#[derive(Debug, Clone)]
pub struct RejectedAgent {
    pub agent_id: AgentId,
    pub reason: String,
}

/// Per-candidate component scores, retained for the audit trail (spec §4.4
/// step 9: the trail must be stable/deterministic for identical input).
#[derive(Debug, Clone)]
pub struct CandidateScore {
    pub agent_id: AgentId,
    pub region_score: f64,
    pub industry_score: f64,
    pub reliability_score: f64,
    pub composite_score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct RoutingReason {
    pub candidates: Vec<CandidateScore>,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RoutingDecision {
    pub selected: Vec<SelectedAgent>,
    pub rejected: Vec<RejectedAgent>,
    pub predicted_confidence: f64,
    pub reasoning: RoutingReason,
}

#[derive(Debug, Clone)]
pub struct ScoreWeights {
    pub region: f64,
    pub industry: f64,
    pub reliability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            region: 0.5,
            industry: 0.3,
            reliability: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub k_primary: usize,
    pub k_secondary: usize,
    pub k_fallback: usize,
    pub score_weights: ScoreWeights,
    pub min_selection_score: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            k_primary: 2,
            k_secondary: 2,
            k_fallback: 2,
            score_weights: ScoreWeights::default(),
            min_selection_score: 0.15,
        }
    }
}

/// Runs the full selection algorithm (spec §4.4 steps 1-9).
pub fn route(
    intent: &IntentResult,
    registry: &AgentRegistry,
    config: &RoutingConfig,
    force_agents: Option<&[AgentId]>,
) -> RoutingDecision {
    if intent.is_job_related == Some(false) {
        return RoutingDecision {
            selected: Vec::new(),
            rejected: Vec::new(),
            predicted_confidence: 0.0,
            reasoning: RoutingReason {
                candidates: Vec::new(),
                notes: vec!["query_rejected: is_job_related=false".to_string()],
            },
        };
    }

    if let Some(forced) = force_agents {
        return route_forced(forced, registry);
    }

    let detected_region = intent.region;
    let effective_region = if detected_region == Region::Unknown {
        Region::Global
    } else {
        detected_region
    };

    let mut rejected = Vec::new();
    let mut scored: Vec<CandidateScore> = Vec::new();

    for descriptor in registry.get_all_agents() {
        if descriptor.excluded_regions.contains(&effective_region) {
            rejected.push(RejectedAgent {
                agent_id: descriptor.id,
                reason: format!("excludes region {effective_region:?}"),
            });
            continue;
        }

        let region_score = if detected_region == Region::Unknown {
            if descriptor.is_global_capable() {
                0.6
            } else {
                0.0
            }
        } else if descriptor.primary_regions.contains(&effective_region) {
            1.0
        } else if descriptor.is_global_capable() {
            0.4
        } else {
            0.0
        };

        let industry_score = descriptor.industry_affinity(intent.industry);
        let weights = &config.score_weights;
        let composite_score = (weights.region * region_score
            + weights.industry * industry_score
            + weights.reliability * descriptor.reliability_score)
            * intent.overall_confidence;

        scored.push(CandidateScore {
            agent_id: descriptor.id,
            region_score,
            industry_score,
            reliability_score: descriptor.reliability_score,
            composite_score,
        });
    }

    scored.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.reliability_score.partial_cmp(&a.reliability_score).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.agent_id.as_str().cmp(b.agent_id.as_str()))
    });

    let mut selected = Vec::new();
    let (mut primary_count, mut secondary_count, mut fallback_count) = (0usize, 0usize, 0usize);

    for candidate in &scored {
        if candidate.composite_score < config.min_selection_score {
            if fallback_count < config.k_fallback {
                selected.push(SelectedAgent {
                    agent_id: candidate.agent_id,
                    role: SelectionRole::Fallback,
                    weight: candidate.composite_score,
                });
                fallback_count += 1;
            } else {
                rejected.push(RejectedAgent {
                    agent_id: candidate.agent_id,
                    reason: format!("composite score {:.3} below minimum {:.3}", candidate.composite_score, config.min_selection_score),
                });
            }
            continue;
        }

        if primary_count < config.k_primary {
            selected.push(SelectedAgent {
                agent_id: candidate.agent_id,
                role: SelectionRole::Primary,
                weight: candidate.composite_score,
            });
            primary_count += 1;
        } else if secondary_count < config.k_secondary {
            selected.push(SelectedAgent {
                agent_id: candidate.agent_id,
                role: SelectionRole::Secondary,
                weight: candidate.composite_score,
            });
            secondary_count += 1;
        } else if fallback_count < config.k_fallback {
            selected.push(SelectedAgent {
                agent_id: candidate.agent_id,
                role: SelectionRole::Fallback,
                weight: candidate.composite_score,
            });
            fallback_count += 1;
        } else {
            rejected.push(RejectedAgent {
                agent_id: candidate.agent_id,
                reason: "exceeds primary/secondary/fallback selection capacity".to_string(),
            });
        }
    }

    let mut notes = Vec::new();

    // Step 7: hard re-verification, independent of the step-2 filter above
    // (spec §4.4 step 7, the WORLDWIDE-leak regression fix).
    let before = selected.len();
    selected.retain(|s| {
        let excluded = registry
            .get(s.agent_id)
            .map(|d| d.excluded_regions.contains(&effective_region))
            .unwrap_or(true);
        if excluded {
            rejected.push(RejectedAgent {
                agent_id: s.agent_id,
                reason: format!("hard region-exclusion re-check removed it for {effective_region:?}"),
            });
        }
        !excluded
    });
    if selected.len() != before {
        notes.push("hard region-exclusion re-check removed a leaked candidate".to_string());
    }

    // Step 8: diversity rule.
    let has_global_capable_selected = selected
        .iter()
        .any(|s| registry.get(s.agent_id).map(|d| d.is_global_capable()).unwrap_or(false));
    let dedicated_specialists_selected = selected
        .iter()
        .filter(|s| registry.get(s.agent_id).map(|d| !d.is_global_capable()).unwrap_or(false))
        .count();

    if !has_global_capable_selected && dedicated_specialists_selected < 2 {
        if let Some(pos) = rejected
            .iter()
            .position(|r| registry.get(r.agent_id).map(|d| d.is_global_capable()).unwrap_or(false))
        {
            let promoted = rejected.remove(pos);
            let weight = scored
                .iter()
                .find(|c| c.agent_id == promoted.agent_id)
                .map(|c| c.composite_score)
                .unwrap_or(0.0);
            selected.push(SelectedAgent {
                agent_id: promoted.agent_id,
                role: SelectionRole::Fallback,
                weight,
            });
            notes.push(format!("diversity rule promoted {} as a global-capable fallback", promoted.agent_id));
        }
    }

    let predicted_confidence = scored
        .iter()
        .filter(|c| selected.iter().any(|s| s.agent_id == c.agent_id))
        .map(|c| c.composite_score)
        .fold(0.0_f64, f64::max);

    RoutingDecision {
        selected,
        rejected,
        predicted_confidence,
        reasoning: RoutingReason {
            candidates: scored,
            notes,
        },
    }
}

fn route_forced(forced: &[AgentId], registry: &AgentRegistry) -> RoutingDecision {
    let selected = forced
        .iter()
        .filter(|id| registry.get(**id).is_some())
        .map(|id| SelectedAgent {
            agent_id: *id,
            role: SelectionRole::Primary,
            weight: 1.0,
        })
        .collect();

    RoutingDecision {
        selected,
        rejected: Vec::new(),
        predicted_confidence: 1.0,
        reasoning: RoutingReason {
            candidates: Vec::new(),
            notes: vec!["force_agents override bypassed scoring".to_string()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Industry;

    fn europe_intent() -> IntentResult {
        IntentResult {
            region: Region::Europe,
            region_confidence: 0.9,
            industry: Industry::Technology,
            industry_confidence: 0.8,
            extracted_location: Some("europe".to_string()),
            extracted_job_titles: vec!["engineer".to_string()],
            extracted_skills: Vec::new(),
            seniority: crate::types::Seniority::Unknown,
            is_remote: None,
            is_job_related: Some(true),
            overall_confidence: 0.9,
        }
    }

    #[test]
    fn europe_query_never_selects_geo_excluded_agents() {
        let registry = AgentRegistry::new();
        let decision = route(&europe_intent(), &registry, &RoutingConfig::default(), None);
        for selected in &decision.selected {
            let descriptor = registry.get(selected.agent_id).unwrap();
            assert!(!descriptor.excluded_regions.contains(&Region::Europe));
        }
    }

    #[test]
    fn rejected_query_selects_nothing() {
        let mut intent = europe_intent();
        intent.is_job_related = Some(false);
        let registry = AgentRegistry::new();
        let decision = route(&intent, &registry, &RoutingConfig::default(), None);
        assert!(decision.selected.is_empty());
    }

    #[test]
    fn routing_is_deterministic() {
        let registry = AgentRegistry::new();
        let intent = europe_intent();
        let a = route(&intent, &registry, &RoutingConfig::default(), None);
        let b = route(&intent, &registry, &RoutingConfig::default(), None);
        let ids_a: Vec<_> = a.selected.iter().map(|s| s.agent_id).collect();
        let ids_b: Vec<_> = b.selected.iter().map(|s| s.agent_id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn unknown_region_only_considers_global_capable_agents() {
        let mut intent = europe_intent();
        intent.region = Region::Unknown;
        intent.region_confidence = 0.0;
        let registry = AgentRegistry::new();
        let decision = route(&intent, &registry, &RoutingConfig::default(), None);
        for candidate in &decision.reasoning.candidates {
            let descriptor = registry.get(candidate.agent_id).unwrap();
            assert!(descriptor.is_global_capable());
        }
    }
}
