use crate::normalizer::{FieldValue, NormalizedItem, NormalizedRecord};
use catalog_match_common::CatalogColumn;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute (or attribute group) a stage compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Category,
    Manufacturer,
    Brand,
    PackType,
    /// Quantity + unit, compared as a base quantity
    PackSize,
}

impl MatchField {
    pub fn name(self) -> &'static str {
        match self {
            MatchField::Category => "category",
            MatchField::Manufacturer => "manufacturer",
            MatchField::Brand => "brand",
            MatchField::PackType => "pack_type",
            MatchField::PackSize => "pack_size",
        }
    }

    /// Catalog columns the field needs in the schema
    pub fn columns(self) -> &'static [CatalogColumn] {
        match self {
            MatchField::Category => &[CatalogColumn::CategoryCode],
            MatchField::Manufacturer => &[CatalogColumn::Manufacturer],
            MatchField::Brand => &[CatalogColumn::Brand],
            MatchField::PackType => &[CatalogColumn::PackType],
            MatchField::PackSize => &[CatalogColumn::Quantity, CatalogColumn::Unit],
        }
    }

    pub fn search_value(self, record: &NormalizedRecord) -> FieldValue {
        match self {
            MatchField::Category => FieldValue::Text(record.category.clone()),
            MatchField::Manufacturer => FieldValue::Text(record.manufacturer.clone()),
            MatchField::Brand => FieldValue::Text(record.brand.clone()),
            MatchField::PackType => FieldValue::Text(record.pack_type.clone()),
            MatchField::PackSize => record.pack_size.clone(),
        }
    }

    /// `None` when the catalog row lacks the value
    pub fn candidate_value(self, item: &NormalizedItem) -> Option<FieldValue> {
        match self {
            MatchField::Category => item.category.clone().map(FieldValue::Text),
            MatchField::Manufacturer => item.manufacturer.clone().map(FieldValue::Text),
            MatchField::Brand => item.brand.clone().map(FieldValue::Text),
            MatchField::PackType => item.pack_type.clone().map(FieldValue::Text),
            MatchField::PackSize => item.pack_size.clone(),
        }
    }

    /// Comparison rule handed to the decision service
    pub fn default_rule(self) -> &'static str {
        match self {
            MatchField::Category => {
                "Both values are numerical category codes. They must be an exact match. Ignore leading or trailing whitespace."
            }
            MatchField::Manufacturer | MatchField::Brand => {
                "The search value must be an exact match or contained within the row value. Ignore differences in case."
            }
            MatchField::PackType => {
                "Both values describe a package type. They must name the same package type. Ignore case."
            }
            MatchField::PackSize => {
                "The quantity must match exactly as a number and the unit must match exactly as letters. Ignore case."
            }
        }
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison strategy of a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Normalized equality (hard gate)
    Exact,
    /// Case-insensitive containment (hard gate)
    Substring,
    /// Similarity score with top-K retention (soft gate)
    Fuzzy,
    /// Equality of canonical base quantities (hard gate)
    Numeric,
    /// External decision service verdict (hard gate)
    Service,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Exact => "exact",
            Strategy::Substring => "substring",
            Strategy::Fuzzy => "fuzzy",
            Strategy::Numeric => "numeric",
            Strategy::Service => "service",
        };
        f.write_str(name)
    }
}

/// One configured pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub field: MatchField,
    pub strategy: Strategy,
    /// Fuzzy stages only; falls back to the run-wide top-K
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,
    /// Service stages only; falls back to the field's default rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl StageSpec {
    pub fn new(field: MatchField, strategy: Strategy) -> Self {
        Self {
            field,
            strategy,
            top_k: None,
            rule: None,
        }
    }

    pub fn name(&self) -> String {
        format!("{}:{}", self.field, self.strategy)
    }

    pub fn rule(&self) -> &str {
        self.rule.as_deref().unwrap_or_else(|| self.field.default_rule())
    }
}

/// Preset stage lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Hard gates first, then fuzzy manufacturer/brand ranking
    #[default]
    Fuzzy,
    /// Exact and substring predicates only
    Exact,
    /// Text attributes delegated to the decision service
    Service,
}

impl PipelineMode {
    pub fn stages(self) -> Vec<StageSpec> {
        use MatchField::*;
        use Strategy::*;

        match self {
            PipelineMode::Fuzzy => vec![
                StageSpec::new(Category, Exact),
                StageSpec::new(PackSize, Numeric),
                StageSpec::new(PackType, Exact),
                StageSpec::new(Manufacturer, Fuzzy),
                StageSpec::new(Brand, Fuzzy),
            ],
            PipelineMode::Exact => vec![
                StageSpec::new(Category, Exact),
                StageSpec::new(PackSize, Numeric),
                StageSpec::new(PackType, Exact),
                StageSpec::new(Manufacturer, Substring),
                StageSpec::new(Brand, Substring),
            ],
            // local gate first, so the service only sees what survives it
            PipelineMode::Service => vec![
                StageSpec::new(PackSize, Numeric),
                StageSpec::new(Category, Service),
                StageSpec::new(PackType, Service),
                StageSpec::new(Manufacturer, Service),
                StageSpec::new(Brand, Service),
            ],
        }
    }
}

/// What happens when a hard gate eliminates every candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyPolicy {
    /// Report no match
    #[default]
    NoMatch,
    /// Use the last non-empty candidate set before the eliminating stage
    LastNonEmpty,
}

/// Normalized catalog row the pipeline works on
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub item_code: String,
    pub normalized: NormalizedItem,
}

/// A catalog row still in play, with the fuzzy scores it collected
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub entry: &'a CatalogEntry,
    pub scores: BTreeMap<MatchField, f64>,
}

impl<'a> Candidate<'a> {
    pub fn new(entry: &'a CatalogEntry) -> Self {
        Self {
            entry,
            scores: BTreeMap::new(),
        }
    }

    pub fn item_code(&self) -> &str {
        &self.entry.item_code
    }
}

/// Candidate set for one record at one stage
#[derive(Debug, Clone, Default)]
pub struct CandidateSet<'a> {
    candidates: Vec<Candidate<'a>>,
}

impl<'a> CandidateSet<'a> {
    pub fn from_entries(entries: &'a [CatalogEntry]) -> Self {
        Self {
            candidates: entries.iter().map(Candidate::new).collect(),
        }
    }

    pub fn from_candidates(candidates: Vec<Candidate<'a>>) -> Self {
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate<'a>> {
        self.candidates.iter()
    }

    pub fn into_candidates(self) -> Vec<Candidate<'a>> {
        self.candidates
    }
}

/// Remembers the last candidate set a stage left non-empty.
#[derive(Debug, Default)]
pub struct CandidateTracker<'a> {
    last: Option<CandidateSet<'a>>,
}

impl<'a> CandidateTracker<'a> {
    /// Record the set a stage produced. Empty sets are ignored.
    pub fn record(&mut self, set: &CandidateSet<'a>) {
        if !set.is_empty() {
            self.last = Some(set.clone());
        }
    }

    pub fn into_last_non_empty(self) -> Option<CandidateSet<'a>> {
        self.last
    }
}

/// Why a stage did not run for a record
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The catalog schema lacks a column the stage needs
    MissingColumn(CatalogColumn),
    /// The record has nothing to rank by
    EmptySearchValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StageStatus {
    Applied,
    Skipped(SkipReason),
    /// The record's own value could not be coerced; it fails the stage
    RecordFailed(String),
}

/// Per-stage summary for one record
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: String,
    pub position: usize,
    pub before: usize,
    pub after: usize,
    pub status: StageStatus,
}

/// End state of the pipeline for one record
#[derive(Debug)]
pub enum PipelineOutcome<'a> {
    /// All stages ran; the set is non-empty
    Completed(CandidateSet<'a>),
    /// A hard gate (or an empty catalog) left nothing
    Eliminated {
        stage: Option<String>,
        last_non_empty: Option<CandidateSet<'a>>,
    },
}

/// Outcome plus the per-stage reports
#[derive(Debug)]
pub struct PipelineRun<'a> {
    pub outcome: PipelineOutcome<'a>,
    pub reports: Vec<StageReport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(code: &str) -> CatalogEntry {
        CatalogEntry {
            item_code: code.into(),
            normalized: NormalizedItem {
                category: None,
                manufacturer: None,
                brand: None,
                pack_type: None,
                pack_size: None,
            },
        }
    }

    #[test]
    fn test_tracker_ignores_empty_sets() {
        let entries = vec![entry("A1"), entry("B2")];
        assert!(CandidateTracker::default().into_last_non_empty().is_none());

        let mut tracker = CandidateTracker::default();
        tracker.record(&CandidateSet::from_entries(&entries));
        tracker.record(&CandidateSet::default());

        let set = tracker.into_last_non_empty().unwrap();
        let codes: Vec<&str> = set.iter().map(|c| c.item_code()).collect();
        assert_eq!(codes, vec!["A1", "B2"]);
    }

    #[test]
    fn test_mode_presets_put_hard_gates_first() {
        let stages = PipelineMode::Fuzzy.stages();
        let first_fuzzy = stages
            .iter()
            .position(|s| s.strategy == Strategy::Fuzzy)
            .unwrap();
        assert!(stages[..first_fuzzy]
            .iter()
            .all(|s| s.strategy != Strategy::Fuzzy));
        assert_eq!(stages[0].field, MatchField::Category);
    }

    #[test]
    fn test_service_preset_runs_local_gate_first() {
        let stages = PipelineMode::Service.stages();
        assert_eq!(stages[0], StageSpec::new(MatchField::PackSize, Strategy::Numeric));
        assert!(stages[1..].iter().all(|s| s.strategy == Strategy::Service));
    }

    #[test]
    fn test_stage_spec_serde() {
        let spec: StageSpec =
            serde_json::from_str(r#"{"field": "pack_size", "strategy": "numeric"}"#).unwrap();
        assert_eq!(spec, StageSpec::new(MatchField::PackSize, Strategy::Numeric));
        assert_eq!(spec.name(), "pack_size:numeric");
    }

    #[test]
    fn test_empty_policy_serde() {
        let policy: EmptyPolicy = serde_json::from_str(r#""last-non-empty""#).unwrap();
        assert_eq!(policy, EmptyPolicy::LastNonEmpty);
    }

    #[test]
    fn test_pack_size_needs_both_columns() {
        assert_eq!(
            MatchField::PackSize.columns(),
            &[CatalogColumn::Quantity, CatalogColumn::Unit]
        );
    }
}
