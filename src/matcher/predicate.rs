//! Stage predicates
//!
//! Every stage delegates its comparison to one `Predicate`. The local
//! strategies live here; the decision-service strategy lives in
//! `crate::service` and implements the same trait.

use super::types::{StageSpec, Strategy};
use crate::normalizer::{canonical_quantity, partial_ratio, FieldValue};
use catalog_match_common::{Error, Result};
use std::sync::Arc;

/// Result of comparing a search value with one candidate value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accept,
    Reject,
    /// Similarity on a 0-100 scale
    Score(f64),
}

impl Verdict {
    /// Whether a hard gate keeps the candidate
    pub fn passes(self) -> bool {
        match self {
            Verdict::Accept => true,
            Verdict::Reject => false,
            Verdict::Score(s) => s > 0.0,
        }
    }

    /// Score a soft gate ranks by
    pub fn score(self) -> f64 {
        match self {
            Verdict::Accept => 100.0,
            Verdict::Reject => 0.0,
            Verdict::Score(s) => s,
        }
    }
}

/// How an empty result is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Keep the passing subset; empty ends the record
    Hard,
    /// Rank and keep the top-K; never empties
    Soft,
}

pub trait Predicate: Send + Sync {
    fn strategy(&self) -> Strategy;

    fn gate(&self) -> Gate {
        match self.strategy() {
            Strategy::Fuzzy => Gate::Soft,
            _ => Gate::Hard,
        }
    }

    /// Validate the record's own value once per stage.
    fn check_search(&self, _search: &FieldValue) -> Result<()> {
        Ok(())
    }

    fn evaluate(&self, search: &FieldValue, candidate: &FieldValue) -> Result<Verdict>;
}

/// Builds predicates for strategies not implemented locally.
pub trait PredicateProvider: Send + Sync {
    fn predicate_for(&self, spec: &StageSpec) -> Result<Arc<dyn Predicate>>;
}

fn text<'v>(value: &'v FieldValue, side: &str) -> Result<&'v str> {
    value
        .as_text()
        .ok_or_else(|| Error::malformed(side, value.to_string(), "expected a text value"))
}

/// Normalized equality
#[derive(Debug, Default)]
pub struct ExactMatch;

impl Predicate for ExactMatch {
    fn strategy(&self) -> Strategy {
        Strategy::Exact
    }

    fn evaluate(&self, search: &FieldValue, candidate: &FieldValue) -> Result<Verdict> {
        let equal = match (search, candidate) {
            (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
            (
                FieldValue::Size { quantity: qa, unit: ua },
                FieldValue::Size { quantity: qb, unit: ub },
            ) => qa == qb && ua == ub,
            _ => false,
        };
        Ok(if equal { Verdict::Accept } else { Verdict::Reject })
    }
}

/// Case-insensitive containment of the search value in the candidate
#[derive(Debug, Default)]
pub struct SubstringMatch;

impl Predicate for SubstringMatch {
    fn strategy(&self) -> Strategy {
        Strategy::Substring
    }

    fn evaluate(&self, search: &FieldValue, candidate: &FieldValue) -> Result<Verdict> {
        let needle = text(search, "search")?.to_lowercase();
        let haystack = text(candidate, "candidate")?.to_lowercase();
        Ok(if haystack.contains(&needle) {
            Verdict::Accept
        } else {
            Verdict::Reject
        })
    }
}

/// Substring-tolerant similarity
#[derive(Debug, Default)]
pub struct FuzzyScore;

impl Predicate for FuzzyScore {
    fn strategy(&self) -> Strategy {
        Strategy::Fuzzy
    }

    fn evaluate(&self, search: &FieldValue, candidate: &FieldValue) -> Result<Verdict> {
        let a = text(candidate, "candidate")?;
        let b = text(search, "search")?;
        Ok(Verdict::Score(partial_ratio(a, b)))
    }
}

/// Equality of canonical base quantities
#[derive(Debug, Default)]
pub struct NumericUnitMatch;

impl NumericUnitMatch {
    fn parts(value: &FieldValue) -> Result<(&str, &str)> {
        match value {
            FieldValue::Size { quantity, unit } => Ok((quantity.as_str(), unit.as_str())),
            FieldValue::Text(s) => Err(Error::malformed("pack_size", s.clone(), "expected quantity and unit")),
        }
    }
}

impl Predicate for NumericUnitMatch {
    fn strategy(&self) -> Strategy {
        Strategy::Numeric
    }

    fn check_search(&self, search: &FieldValue) -> Result<()> {
        let (quantity, unit) = Self::parts(search)?;
        canonical_quantity(quantity, unit).map(|_| ())
    }

    fn evaluate(&self, search: &FieldValue, candidate: &FieldValue) -> Result<Verdict> {
        let (sq, su) = Self::parts(search)?;
        let (cq, cu) = Self::parts(candidate)?;

        let matched = match (canonical_quantity(sq, su)?, canonical_quantity(cq, cu)?) {
            (Some(a), Some(b)) => a.same_as(&b),
            // unrecognized units never match
            _ => false,
        };
        Ok(if matched { Verdict::Accept } else { Verdict::Reject })
    }
}

/// Local predicate for a strategy, `None` for `Service`.
pub fn local_predicate(strategy: Strategy) -> Option<Arc<dyn Predicate>> {
    match strategy {
        Strategy::Exact => Some(Arc::new(ExactMatch)),
        Strategy::Substring => Some(Arc::new(SubstringMatch)),
        Strategy::Fuzzy => Some(Arc::new(FuzzyScore)),
        Strategy::Numeric => Some(Arc::new(NumericUnitMatch)),
        Strategy::Service => None,
    }
}
