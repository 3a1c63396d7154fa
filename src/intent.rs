//! Intent Classifier (spec §4.3, component C4).
//!
//! No teacher module does free-text classification, so this component is
//! built directly from the spec's description rather than adapted from an
//! existing file; its composite-score-then-threshold shape mirrors the
//! weighted-scoring pattern the routing engine also uses (see
//! `routing.rs`, itself grounded on the Rustic-AI router's scoring style).

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;

use crate::types::{Industry, Region, Seniority};

/// Rule-based classification is mandatory and deterministic; the oracle is
/// an optional collaborator layered on top (spec §4.3).
#[derive(Debug, Clone)]
pub struct IntentResult {
    pub region: Region,
    pub region_confidence: f64,
    pub industry: Industry,
    pub industry_confidence: f64,
    pub extracted_location: Option<String>,
    pub extracted_job_titles: Vec<String>,
    pub extracted_skills: Vec<String>,
    pub seniority: Seniority,
    pub is_remote: Option<bool>,
    /// `None` means "unknown" (spec §3: a tri-state, not a bool).
    pub is_job_related: Option<bool>,
    pub overall_confidence: f64,
}

/// Optional LLM-based collaborator (spec §4.3, §6). The core runs fine
/// without one; on error or timeout the caller should fall back to pure
/// rule-based classification (enforced by `engine.rs`, not here).
#[async_trait]
pub trait IntentOracle: Send + Sync {
    async fn analyze(&self, text: &str, hint: Option<&str>) -> anyhow::Result<IntentResult>;
}

const REGION_THRESHOLD: f64 = 0.25;
const INDUSTRY_THRESHOLD: f64 = 0.25;
const JOB_RELATED_OVERRIDE_THRESHOLD: f64 = 0.3;

fn region_lexicon() -> &'static [(Region, &'static [&'static str])] {
    &[
        (
            Region::NorthAmerica,
            &["north america", "usa", "united states", "canada", "u.s.", "us "],
        ),
        (
            Region::Europe,
            &["europe", "european union", "eu ", "germany", "france", "uk", "united kingdom"],
        ),
        (
            Region::Oceania,
            &["australia", "new zealand", "oceania", "aus ", "sydney", "melbourne"],
        ),
        (
            Region::EastAsia,
            &["japan", "china", "korea", "east asia", "tokyo", "beijing", "seoul"],
        ),
        (
            Region::SoutheastAsia,
            &["southeast asia", "singapore", "vietnam", "thailand", "indonesia", "philippines"],
        ),
        (
            Region::SouthAsia,
            &["india", "south asia", "bangladesh", "pakistan", "sri lanka"],
        ),
        (
            Region::MiddleEast,
            &["middle east", "uae", "dubai", "saudi", "qatar", "bayt"],
        ),
        (Region::Africa, &["africa", "nigeria", "kenya", "south africa"]),
        (
            Region::LatinAmerica,
            &["latin america", "brazil", "mexico", "argentina", "latam"],
        ),
        (Region::Global, &["worldwide", "global", "anywhere in the world", "remote global"]),
    ]
}

fn industry_lexicon() -> &'static [(Industry, &'static [&'static str])] {
    &[
        (
            Industry::Technology,
            &["software", "engineer", "developer", "backend", "frontend", "devops", "data scientist", "ai engineer", "ml engineer"],
        ),
        (
            Industry::Finance,
            &["finance", "accountant", "banking", "investment", "trader", "actuary"],
        ),
        (
            Industry::Healthcare,
            &["nurse", "healthcare", "physician", "clinical", "hospital", "medical"],
        ),
        (
            Industry::Construction,
            &["construction", "site supervisor", "civil engineer", "contractor"],
        ),
        (Industry::Education, &["teacher", "professor", "tutor", "education", "lecturer"]),
        (Industry::Retail, &["retail", "cashier", "store manager", "merchandiser"]),
        (
            Industry::Manufacturing,
            &["manufacturing", "factory", "assembly line", "production operator"],
        ),
        (
            Industry::Government,
            &["government", "public sector", "civil service", "municipal"],
        ),
    ]
}

fn job_title_lexicon() -> &'static [&'static str] {
    &[
        "engineer", "developer", "scientist", "manager", "analyst", "designer", "architect",
        "technician", "specialist", "consultant", "administrator", "nurse", "teacher", "accountant",
    ]
}

fn job_verb_lexicon() -> &'static [&'static str] {
    &["hiring", "hire", "apply", "job", "jobs", "career", "careers", "vacancy", "vacancies", "openings", "recruiting"]
}

fn non_job_lexicon() -> &'static [&'static str] {
    &["movie", "recipe", "weather", "song", "lyrics", "game walkthrough", "sports score"]
}

fn seniority_lexicon() -> &'static [(Seniority, &'static str)] {
    // Ranked: first match in the query wins when more than one appears.
    &[
        (Seniority::Lead, "lead"),
        (Seniority::Senior, "senior"),
        (Seniority::Senior, "sr."),
        (Seniority::Junior, "junior"),
        (Seniority::Junior, "jr."),
        (Seniority::Intern, "intern"),
        (Seniority::Mid, "mid-level"),
        (Seniority::Mid, "mid level"),
    ]
}

fn remote_lexicon() -> &'static [&'static str] {
    &["remote", "wfh", "work from home", "anywhere", "telecommute"]
}

fn tokenize(text: &str) -> Vec<String> {
    let re = Regex::new(r"[A-Za-z][A-Za-z0-9+.#]*").expect("static pattern compiles");
    re.find_iter(text).map(|m| m.as_str().to_lowercase()).collect()
}

/// Deterministic rule-based classification. Always runs; the oracle (if
/// configured) layers on top via [`merge_with_oracle`].
pub fn classify_rule_based(text: &str, country_hint: Option<&str>, language_hint: Option<&str>) -> IntentResult {
    let lower = text.to_lowercase();

    let extracted_job_titles: Vec<String> = job_title_lexicon()
        .iter()
        .filter(|kw| lower.contains(*kw))
        .map(|kw| kw.to_string())
        .collect();

    let skill_tokens = tokenize(&lower);
    let extracted_skills: Vec<String> = skill_tokens
        .iter()
        .filter(|t| SKILL_LEXICON.contains(&t.as_str()))
        .cloned()
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let title_score = if extracted_job_titles.is_empty() { 0.0 } else { 0.4 };
    let skill_score = (extracted_skills.len() as f64 * 0.1).min(0.3);
    let verb_score = if job_verb_lexicon().iter().any(|kw| lower.contains(kw)) {
        0.2
    } else {
        0.0
    };
    let location_score = if region_lexicon().iter().any(|(_, kws)| kws.iter().any(|kw| lower.contains(kw))) {
        0.1
    } else {
        0.0
    };
    let job_relevance_score = (title_score + skill_score + verb_score + location_score).min(1.0);

    let (region, region_confidence) = classify_region(&lower, country_hint, language_hint);
    let (industry, industry_confidence) = classify_industry(&lower);

    let seniority = seniority_lexicon()
        .iter()
        .find(|(_, kw)| lower.contains(kw))
        .map(|(s, _)| *s)
        .unwrap_or_default();

    let is_remote = if remote_lexicon().iter().any(|kw| lower.contains(kw)) {
        Some(true)
    } else {
        None
    };

    let extracted_location = region_lexicon()
        .iter()
        .flat_map(|(_, kws)| kws.iter())
        .find(|kw| lower.contains(*kw))
        .map(|kw| kw.trim().to_string());

    let hits_non_job_lexicon = non_job_lexicon().iter().any(|kw| lower.contains(kw));
    let is_job_related = if hits_non_job_lexicon
        && job_relevance_score < JOB_RELATED_OVERRIDE_THRESHOLD
        && extracted_job_titles.is_empty()
        && extracted_skills.is_empty()
    {
        Some(false)
    } else {
        Some(true)
    };

    let overall_confidence = (job_relevance_score + region_confidence + industry_confidence) / 3.0;

    IntentResult {
        region,
        region_confidence,
        industry,
        industry_confidence,
        extracted_location,
        extracted_job_titles,
        extracted_skills,
        seniority,
        is_remote,
        is_job_related,
        overall_confidence,
    }
}

const SKILL_LEXICON: &[&str] = &[
    "rust", "python", "java", "golang", "javascript", "typescript", "kubernetes", "docker",
    "aws", "azure", "gcp", "sql", "react", "terraform", "ansible", "spark", "kafka",
];

/// Region classification with the spec's exact tie-break order: region
/// keyword hits in the query text outrank a country hint, which in turn
/// outranks a language hint. Keyword hits are scored by count (mirroring
/// `classify_industry`) and gated on `REGION_THRESHOLD`, not accepted on
/// the first match alone.
fn classify_region(lower: &str, country_hint: Option<&str>, language_hint: Option<&str>) -> (Region, f64) {
    let mut best: Option<(Region, f64)> = None;
    for (region, keywords) in region_lexicon() {
        let hits = keywords.iter().filter(|kw| lower.contains(**kw)).count();
        if hits == 0 {
            continue;
        }
        let score = (hits as f64 * 0.35).min(0.95);
        if best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
            best = Some((*region, score));
        }
    }
    if let Some((region, score)) = best {
        if score >= REGION_THRESHOLD {
            return (region, score);
        }
    }

    if let Some(hint) = country_hint {
        let hint_lower = hint.to_lowercase();
        for (region, keywords) in region_lexicon() {
            if keywords.iter().any(|kw| hint_lower.contains(kw.trim())) {
                return (*region, 0.6);
            }
        }
    }

    if let Some(hint) = language_hint {
        let hint_lower = hint.to_lowercase();
        match hint_lower.as_str() {
            "en-us" | "en" => return (Region::NorthAmerica, 0.3),
            "en-gb" | "de" | "fr" => return (Region::Europe, 0.3),
            "hi" => return (Region::SouthAsia, 0.3),
            "ar" => return (Region::MiddleEast, 0.3),
            _ => {}
        }
    }

    (Region::Unknown, 0.0)
}

fn classify_industry(lower: &str) -> (Industry, f64) {
    let mut best: Option<(Industry, f64)> = None;
    for (industry, keywords) in industry_lexicon() {
        let hits = keywords.iter().filter(|kw| lower.contains(**kw)).count();
        if hits == 0 {
            continue;
        }
        let score = (hits as f64 * 0.35).min(0.95);
        if best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
            best = Some((*industry, score));
        }
    }
    match best {
        Some((industry, score)) if score >= INDUSTRY_THRESHOLD => (industry, score),
        _ => (Industry::Unknown, 0.0),
    }
}

/// Merge an oracle's output with the rule-based result per spec §4.3: union
/// of extracted entities, maximum of each confidence field, with the
/// mandated override for oracle over-rejection.
pub fn merge_with_oracle(rule_based: IntentResult, oracle: IntentResult) -> IntentResult {
    let mut extracted_job_titles = rule_based.extracted_job_titles.clone();
    for title in oracle.extracted_job_titles {
        if !extracted_job_titles.contains(&title) {
            extracted_job_titles.push(title);
        }
    }

    let mut extracted_skills = rule_based.extracted_skills.clone();
    for skill in oracle.extracted_skills {
        if !extracted_skills.contains(&skill) {
            extracted_skills.push(skill);
        }
    }

    let rule_job_relevance_score = (rule_based.overall_confidence * 3.0
        - rule_based.region_confidence
        - rule_based.industry_confidence)
        .max(0.0);

    let mut is_job_related = match (rule_based.is_job_related, oracle.is_job_related) {
        (Some(a), Some(b)) => Some(a || b),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    // Oracle over-rejection override (spec §4.3): the rule-based pass found
    // enough signal on its own, so an oracle "not job related" is overruled.
    if oracle.is_job_related == Some(false)
        && rule_job_relevance_score >= JOB_RELATED_OVERRIDE_THRESHOLD
        && (!rule_based.extracted_job_titles.is_empty() || !rule_based.extracted_skills.is_empty())
    {
        is_job_related = Some(true);
    }

    IntentResult {
        region: if oracle.region_confidence > rule_based.region_confidence {
            oracle.region
        } else {
            rule_based.region
        },
        region_confidence: rule_based.region_confidence.max(oracle.region_confidence),
        industry: if oracle.industry_confidence > rule_based.industry_confidence {
            oracle.industry
        } else {
            rule_based.industry
        },
        industry_confidence: rule_based.industry_confidence.max(oracle.industry_confidence),
        extracted_location: rule_based.extracted_location.or(oracle.extracted_location),
        extracted_job_titles,
        extracted_skills,
        seniority: if rule_based.seniority == Seniority::Unknown {
            oracle.seniority
        } else {
            rule_based.seniority
        },
        is_remote: rule_based.is_remote.or(oracle.is_remote),
        is_job_related,
        overall_confidence: rule_based.overall_confidence.max(oracle.overall_confidence),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn europe_ai_engineer_query_classifies_as_expected() {
        let result = classify_rule_based("I want to find AI Engineer jobs in Europe", None, None);
        assert_eq!(result.region, Region::Europe);
        assert_eq!(result.industry, Industry::Technology);
        assert_eq!(result.is_job_related, Some(true));
    }

    #[test]
    fn non_job_query_is_rejected() {
        let result = classify_rule_based("recommend me a movie", None, None);
        assert_eq!(result.is_job_related, Some(false));
    }

    #[test]
    fn oracle_over_rejection_is_overridden() {
        let rule_based = classify_rule_based("Data Scientist roles near Kaohsiung", None, None);
        assert!(!rule_based.extracted_job_titles.is_empty());

        let oracle_result = IntentResult {
            region: Region::Unknown,
            region_confidence: 0.0,
            industry: Industry::Unknown,
            industry_confidence: 0.0,
            extracted_location: Some("Kaohsiung".to_string()),
            extracted_job_titles: Vec::new(),
            extracted_skills: Vec::new(),
            seniority: Seniority::Unknown,
            is_remote: None,
            is_job_related: Some(false),
            overall_confidence: 0.1,
        };

        let merged = merge_with_oracle(rule_based, oracle_result);
        assert_eq!(merged.is_job_related, Some(true));
    }

    #[test]
    fn seniority_prefers_earlier_ranked_keyword() {
        let result = classify_rule_based("Senior Lead Rust Engineer", None, None);
        assert_eq!(result.seniority, Seniority::Lead);
    }
}
