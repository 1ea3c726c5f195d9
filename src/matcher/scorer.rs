//! Combined scoring and top-N selection

use super::types::{CandidateSet, MatchField};
use catalog_match_common::{MatchResult, MatchStatus};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

/// A selected candidate
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub item_code: String,
    /// Mean of the fuzzy components, `None` when there are none
    pub score: Option<f64>,
    pub components: BTreeMap<MatchField, f64>,
}

/// Arithmetic mean of the recorded fuzzy components.
pub fn combined_score(components: &BTreeMap<MatchField, f64>) -> Option<f64> {
    if components.is_empty() {
        return None;
    }
    Some(components.values().sum::<f64>() / components.len() as f64)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Rank by combined score (descending, ties by item code) and keep `top_n`
/// distinct item codes.
pub fn rank(set: &CandidateSet<'_>, top_n: usize) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = set
        .iter()
        .map(|c| Ranked {
            item_code: c.item_code().to_string(),
            score: combined_score(&c.scores),
            components: c.scores.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| {
        let by_score = match (a.score, b.score) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_score.then_with(|| a.item_code.cmp(&b.item_code))
    });

    let mut seen = HashSet::new();
    ranked.retain(|r| seen.insert(r.item_code.clone()));
    ranked.truncate(top_n);
    ranked
}

/// Turn the selection into a result row.
pub fn to_result(source_item_code: &str, ranked: Vec<Ranked>, status: MatchStatus) -> MatchResult {
    let scored = ranked.iter().any(|r| r.score.is_some());

    let scores = scored.then(|| {
        ranked
            .iter()
            .map(|r| round2(r.score.unwrap_or(0.0)))
            .collect()
    });

    let breakdown = if scored {
        ranked
            .iter()
            .map(|r| {
                r.components
                    .iter()
                    .map(|(field, value)| (field.name().to_string(), round2(*value)))
                    .collect()
            })
            .collect()
    } else {
        Vec::new()
    };

    MatchResult {
        source_item_code: source_item_code.to_string(),
        matched_item_codes: ranked.into_iter().map(|r| r.item_code).collect(),
        scores,
        breakdown,
        status,
    }
}
