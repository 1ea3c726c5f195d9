//! Synonym tables
//!
//! Maps spelling variants of units of measure and pack types onto one
//! canonical token. Lookups are exact on already-canonicalized text; a token
//! the table does not know passes through unchanged.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute classes that carry a synonym table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynonymClass {
    Unit,
    PackType,
}

/// Synonym definitions per attribute class
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SynonymTable {
    /// Unit of measure variants
    #[serde(default)]
    pub uom: HashMap<String, String>,
    /// Pack type variants
    #[serde(default)]
    pub pack_type: HashMap<String, String>,
}

impl SynonymTable {
    /// Built-in preset by name
    pub fn from_preset(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "default" | "retail" => Some(Self::retail_preset()),
            "none" | "empty" => Some(Self::default()),
            _ => None,
        }
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Keys and values are lower-cased and trimmed on load.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: Self = serde_json::from_str(json)?;
        Ok(Self {
            uom: clean_map(raw.uom),
            pack_type: clean_map(raw.pack_type),
        })
    }

    /// Retail preset: the variants seen in item masters and sales sheets.
    pub fn retail_preset() -> Self {
        let mut table = Self::default();

        for (from, to) in [
            ("ml", "ml"),
            ("millilitre", "ml"),
            ("milliliter", "ml"),
            ("l", "l"),
            ("litre", "l"),
            ("liter", "l"),
            ("ltr", "l"),
            ("g", "g"),
            ("gm", "g"),
            ("gram", "g"),
            ("grams", "g"),
            ("kg", "kg"),
            ("kgs", "kg"),
            ("kilogram", "kg"),
            ("no", "pcs"),
            ("nos", "pcs"),
            ("pc", "pcs"),
            ("pcs", "pcs"),
        ] {
            table.uom.insert(from.into(), to.into());
        }

        for (from, to) in [
            ("can", "can"),
            ("tin", "can"),
            ("tin c", "can"),
            ("pet", "bottle"),
            ("pbt", "bottle"),
            ("plbot", "bottle"),
            ("glbot", "bottle"),
            ("jar", "jar"),
            ("pljar", "jar"),
            ("gljar", "jar"),
            ("tpk", "tpk"),
            ("rgb", "rgb"),
            ("hl", "hl"),
        ] {
            table.pack_type.insert(from.into(), to.into());
        }

        table
    }

    fn map_for(&self, class: SynonymClass) -> &HashMap<String, String> {
        match class {
            SynonymClass::Unit => &self.uom,
            SynonymClass::PackType => &self.pack_type,
        }
    }

    /// Canonical token for `value`, or `value` itself when unknown.
    pub fn resolve<'a>(&'a self, class: SynonymClass, value: &'a str) -> &'a str {
        self.map_for(class)
            .get(value)
            .map(|s| s.as_str())
            .unwrap_or(value)
    }

    /// Merge another table in; entries from `other` win.
    pub fn merge(&mut self, other: &SynonymTable) {
        self.uom.extend(other.uom.clone());
        self.pack_type.extend(other.pack_type.clone());
    }
}

fn clean_map(map: HashMap<String, String>) -> HashMap<String, String> {
    map.into_iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.trim().to_lowercase()))
        .filter(|(k, _)| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retail_preset() {
        let table = SynonymTable::from_preset("default").unwrap();
        assert_eq!(table.resolve(SynonymClass::Unit, "litre"), "l");
        assert_eq!(table.resolve(SynonymClass::PackType, "tin"), "can");
        assert_eq!(table.resolve(SynonymClass::PackType, "tin c"), "can");
        assert_eq!(table.resolve(SynonymClass::PackType, "pet"), "bottle");
    }

    #[test]
    fn test_unknown_passes_through() {
        let table = SynonymTable::retail_preset();
        assert_eq!(table.resolve(SynonymClass::PackType, "sachet"), "sachet");
        assert_eq!(table.resolve(SynonymClass::Unit, "oz"), "oz");
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let table = SynonymTable::retail_preset();
        for value in ["tin", "pbt", "jar", "pouch"] {
            let once = table.resolve(SynonymClass::PackType, value);
            assert_eq!(table.resolve(SynonymClass::PackType, once), once);
        }
    }

    #[test]
    fn test_from_json_cleans_keys() {
        let table = SynonymTable::from_json(r#"{"pack_type": {" Pouch ": "Bag"}}"#).unwrap();
        assert_eq!(table.resolve(SynonymClass::PackType, "pouch"), "bag");
        assert!(table.uom.is_empty());
    }

    #[test]
    fn test_merge_later_wins() {
        let mut table = SynonymTable::retail_preset();
        let custom = SynonymTable::from_json(r#"{"pack_type": {"pet": "pet"}}"#).unwrap();
        table.merge(&custom);
        assert_eq!(table.resolve(SynonymClass::PackType, "pet"), "pet");
        assert_eq!(table.resolve(SynonymClass::PackType, "tin"), "can");
    }

    #[test]
    fn test_unknown_preset() {
        assert!(SynonymTable::from_preset("pharma").is_none());
    }
}
