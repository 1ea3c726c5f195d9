//! Field normalization
//!
//! Brings transaction and catalog values into one comparable form before the
//! pass pipeline sees them.
//!
//! ## Steps
//! 1. Text canonicalization (case, whitespace, dash and quote variants)
//! 2. Synonym resolution for units of measure and pack types
//! 3. Pack size decomposition into quantity + unit

pub mod measurements;
pub mod similarity;

pub use measurements::{canonical_quantity, split_pack_size, BaseQuantity, Dimension, Unit};
pub use similarity::partial_ratio;

use catalog_match_common::{CatalogItem, SynonymClass, SynonymTable, TransactionRecord};
use regex::Regex;
use std::fmt;

/// Lower-case, trim, collapse whitespace and unify dash/quote variants.
///
/// Idempotent: canonicalizing a canonical value returns it unchanged.
pub fn canonical_text(value: &str) -> String {
    lazy_static::lazy_static! {
        static ref DASH_RE: Regex = Regex::new(r"[\x{2010}-\x{2015}\x{2212}\x{FE63}\x{FF0D}]").unwrap();
        static ref SINGLE_QUOTE_RE: Regex = Regex::new(r"[\x{2018}\x{2019}\x{201A}\x{2032}`]").unwrap();
        static ref DOUBLE_QUOTE_RE: Regex = Regex::new(r"[\x{201C}\x{201D}\x{201E}\x{2033}]").unwrap();
        static ref SPACE_RE: Regex = Regex::new(r"[\s\x{3000}]+").unwrap();
    }

    let lowered = value.to_lowercase();
    let dashed = DASH_RE.replace_all(&lowered, "-");
    let quoted = SINGLE_QUOTE_RE.replace_all(&dashed, "'");
    let quoted = DOUBLE_QUOTE_RE.replace_all(&quoted, "\"");
    SPACE_RE.replace_all(quoted.trim(), " ").trim().to_string()
}

/// Canonical text followed by a synonym lookup.
pub fn canonical_token(value: &str, class: SynonymClass, synonyms: &SynonymTable) -> String {
    let text = canonical_text(value);
    synonyms.resolve(class, &text).to_string()
}

/// A normalized value handed to a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    /// Quantity digits and canonical unit token
    Size { quantity: String, unit: String },
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Size { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::Size { quantity, unit } => quantity.is_empty() && unit.is_empty(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Size { quantity, unit } => {
                write!(f, "{}", format!("{} {}", quantity, unit).trim())
            }
        }
    }
}

/// Transaction record after normalization. Missing fields become empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub item_code: String,
    pub category: String,
    pub manufacturer: String,
    pub brand: String,
    pub pack_type: String,
    pub pack_size: FieldValue,
    pub description: String,
}

/// Catalog row after normalization. Absence is preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub category: Option<String>,
    pub manufacturer: Option<String>,
    pub brand: Option<String>,
    pub pack_type: Option<String>,
    /// `None` when either quantity or unit is absent
    pub pack_size: Option<FieldValue>,
}

pub fn normalize_record(record: &TransactionRecord, synonyms: &SynonymTable) -> NormalizedRecord {
    let text = |v: &Option<String>| v.as_deref().map(canonical_text).unwrap_or_default();

    let (quantity, unit) = split_pack_size(record.pack_size_raw.as_deref().unwrap_or(""));

    NormalizedRecord {
        item_code: record.item_code.trim().to_string(),
        category: text(&record.category),
        manufacturer: text(&record.manufacturer),
        brand: text(&record.brand),
        pack_type: record
            .pack_type
            .as_deref()
            .map(|v| canonical_token(v, SynonymClass::PackType, synonyms))
            .unwrap_or_default(),
        pack_size: FieldValue::Size {
            quantity,
            unit: canonical_token(&unit, SynonymClass::Unit, synonyms),
        },
        description: text(&record.description),
    }
}

pub fn normalize_item(item: &CatalogItem, synonyms: &SynonymTable) -> NormalizedItem {
    let text = |v: &Option<String>| v.as_deref().map(canonical_text);

    let pack_size = match (item.quantity.as_deref(), item.unit.as_deref()) {
        (Some(quantity), Some(unit)) => Some(FieldValue::Size {
            quantity: quantity.trim().to_string(),
            unit: canonical_token(unit, SynonymClass::Unit, synonyms),
        }),
        _ => None,
    };

    NormalizedItem {
        category: text(&item.category_code),
        manufacturer: text(&item.manufacturer),
        brand: text(&item.brand),
        pack_type: item
            .pack_type
            .as_deref()
            .map(|v| canonical_token(v, SynonymClass::PackType, synonyms)),
        pack_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_text() {
        assert_eq!(canonical_text("  Acme   Co  "), "acme co");
        assert_eq!(canonical_text("Coca\u{2013}Cola"), "coca-cola");
        assert_eq!(canonical_text("Rock\u{2019}s\u{3000}Bar"), "rock's bar");
        assert_eq!(canonical_text("A\tB\nC"), "a b c");
    }

    #[test]
    fn test_canonical_text_idempotent() {
        for raw in ["  Acme   Co ", "TIN C", "Coca\u{2014}Cola", "\u{201C}Q\u{201D}", ""] {
            let once = canonical_text(raw);
            assert_eq!(canonical_text(&once), once);
        }
    }

    #[test]
    fn test_canonical_token_synonyms() {
        let table = SynonymTable::retail_preset();
        assert_eq!(canonical_token(" TIN ", SynonymClass::PackType, &table), "can");
        assert_eq!(canonical_token("Litre", SynonymClass::Unit, &table), "l");
        assert_eq!(canonical_token("Sachet", SynonymClass::PackType, &table), "sachet");
    }

    #[test]
    fn test_canonical_token_idempotent() {
        let table = SynonymTable::retail_preset();
        for raw in ["Tin", "PET", "gljar", "pouch", "ML", "kgs"] {
            for class in [SynonymClass::PackType, SynonymClass::Unit] {
                let once = canonical_token(raw, class, &table);
                assert_eq!(canonical_token(&once, class, &table), once);
            }
        }
    }

    #[test]
    fn test_normalize_record() {
        let record = TransactionRecord {
            item_code: " T1 ".into(),
            category: Some("10".into()),
            manufacturer: Some("ACME".into()),
            pack_type: Some("CAN".into()),
            pack_size_raw: Some("330ML".into()),
            ..Default::default()
        };
        let normalized = normalize_record(&record, &SynonymTable::retail_preset());
        assert_eq!(normalized.item_code, "T1");
        assert_eq!(normalized.manufacturer, "acme");
        assert_eq!(normalized.brand, "");
        assert_eq!(normalized.pack_type, "can");
        assert_eq!(
            normalized.pack_size,
            FieldValue::Size {
                quantity: "330".into(),
                unit: "ml".into()
            }
        );
    }

    #[test]
    fn test_normalize_item_keeps_absence() {
        let item = CatalogItem {
            item_code: "A1".into(),
            pack_type: Some("Tin".into()),
            quantity: Some("330".into()),
            ..Default::default()
        };
        let normalized = normalize_item(&item, &SynonymTable::retail_preset());
        assert_eq!(normalized.pack_type.as_deref(), Some("can"));
        assert!(normalized.brand.is_none());
        assert!(normalized.pack_size.is_none());
    }

    #[test]
    fn test_field_value_display() {
        let size = FieldValue::Size {
            quantity: "330".into(),
            unit: "ml".into(),
        };
        assert_eq!(size.to_string(), "330 ml");
        assert_eq!(FieldValue::Text("acme".into()).to_string(), "acme");
    }
}
