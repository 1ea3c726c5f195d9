//! Catalog and transaction record types
//!
//! Shared between the loaders, the matching engine and the exporters:
//! - CatalogItem: one row of the master product catalog
//! - TransactionRecord: one transaction line item to reconcile
//! - MatchResult: the engine's answer for one transaction

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Columns a catalog source may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogColumn {
    ItemCode,
    CategoryCode,
    Manufacturer,
    Brand,
    PackType,
    Quantity,
    Unit,
}

impl CatalogColumn {
    pub const ALL: [CatalogColumn; 7] = [
        CatalogColumn::ItemCode,
        CatalogColumn::CategoryCode,
        CatalogColumn::Manufacturer,
        CatalogColumn::Brand,
        CatalogColumn::PackType,
        CatalogColumn::Quantity,
        CatalogColumn::Unit,
    ];
}

impl fmt::Display for CatalogColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CatalogColumn::ItemCode => "item_code",
            CatalogColumn::CategoryCode => "category_code",
            CatalogColumn::Manufacturer => "manufacturer",
            CatalogColumn::Brand => "brand",
            CatalogColumn::PackType => "pack_type",
            CatalogColumn::Quantity => "quantity",
            CatalogColumn::Unit => "unit",
        };
        f.write_str(name)
    }
}

/// One master catalog row. Any field but the item code may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogItem {
    pub item_code: String,
    pub category_code: Option<String>,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    pub pack_type: Option<String>,
    pub quantity: Option<String>,
    pub unit: Option<String>,
}

/// One transaction line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionRecord {
    pub item_code: String,
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    pub pack_type: Option<String>,
    pub pack_size_raw: Option<String>,
    pub description: Option<String>,
}

/// How a result was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchStatus {
    /// Every stage ran and left candidates.
    Matched,
    /// A hard gate emptied the set; candidates come from the last non-empty set.
    Fallback { stage: String },
    /// Nothing matched. `stage` names the eliminating stage when there was one.
    NoMatch { stage: Option<String> },
    /// The record could not be processed.
    Failed { reason: String },
}

/// Matching output for one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub source_item_code: String,

    /// Best catalog codes first
    #[serde(default)]
    pub matched_item_codes: Vec<String>,

    /// Combined scores, parallel to `matched_item_codes`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<f64>>,

    /// Per-field fuzzy components, parallel to `matched_item_codes`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdown: Vec<BTreeMap<String, f64>>,

    pub status: MatchStatus,
}

impl MatchResult {
    pub fn no_match(source_item_code: impl Into<String>, stage: Option<String>) -> Self {
        Self {
            source_item_code: source_item_code.into(),
            matched_item_codes: Vec::new(),
            scores: None,
            breakdown: Vec::new(),
            status: MatchStatus::NoMatch { stage },
        }
    }

    pub fn failed(source_item_code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_item_code: source_item_code.into(),
            matched_item_codes: Vec::new(),
            scores: None,
            breakdown: Vec::new(),
            status: MatchStatus::Failed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_match(&self) -> bool {
        !self.matched_item_codes.is_empty()
    }
}
