//! Pack size decomposition and canonical base units
//!
//! A transaction carries its pack size as one composite string ("330ML",
//! "1 Ltr"); the catalog carries quantity and unit in separate columns. Both
//! sides are reduced to a base quantity (millilitres, grams or pieces) before
//! comparison.

use catalog_match_common::{Error, Result};
use regex::Regex;

/// Split a composite pack size into its digit-only and letter-only parts.
///
/// `"750ml"` → `("750", "ml")`. A string without digits or letters yields an
/// empty component for that part.
pub fn split_pack_size(raw: &str) -> (String, String) {
    let quantity: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let unit: String = raw.chars().filter(|c| c.is_alphabetic()).collect();
    (quantity, unit)
}

/// Physical dimension of a base quantity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Volume,
    Mass,
    Count,
}

/// Units the converter recognizes (after synonym resolution)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Milliliter,
    Liter,
    Gram,
    Kilogram,
    Piece,
}

impl Unit {
    /// Parse a canonical unit token.
    pub fn parse(token: &str) -> Option<Unit> {
        match token {
            "ml" => Some(Unit::Milliliter),
            "l" => Some(Unit::Liter),
            "g" => Some(Unit::Gram),
            "kg" => Some(Unit::Kilogram),
            "pcs" => Some(Unit::Piece),
            _ => None,
        }
    }

    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Milliliter | Unit::Liter => Dimension::Volume,
            Unit::Gram | Unit::Kilogram => Dimension::Mass,
            Unit::Piece => Dimension::Count,
        }
    }

    /// Factor to the base unit of the dimension
    pub fn factor(self) -> f64 {
        match self {
            Unit::Liter | Unit::Kilogram => 1000.0,
            Unit::Milliliter | Unit::Gram | Unit::Piece => 1.0,
        }
    }
}

/// A quantity expressed in ml, g or pieces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseQuantity {
    pub value: f64,
    pub dimension: Dimension,
}

impl BaseQuantity {
    /// Same dimension and equal value within float noise.
    pub fn same_as(&self, other: &BaseQuantity) -> bool {
        if self.dimension != other.dimension {
            return false;
        }
        let scale = self.value.abs().max(other.value.abs()).max(1.0);
        (self.value - other.value).abs() <= scale * 1e-9
    }
}

/// Parse a quantity string strictly (plain decimal, optional thousands commas).
pub fn parse_quantity(quantity: &str) -> Result<f64> {
    lazy_static::lazy_static! {
        static ref QUANTITY_RE: Regex = Regex::new(r"^\d+(?:\.\d+)?$").unwrap();
    }

    let cleaned = quantity.trim().replace(',', "");
    if cleaned.is_empty() {
        return Err(Error::malformed("quantity", quantity, "empty quantity"));
    }
    if !QUANTITY_RE.is_match(&cleaned) {
        return Err(Error::malformed("quantity", quantity, "not a number"));
    }

    cleaned
        .parse::<f64>()
        .map_err(|e| Error::malformed("quantity", quantity, e.to_string()))
}

/// Convert quantity + unit to a base quantity.
///
/// `unit` must already be canonical (synonyms resolved). An unrecognized unit
/// gives `Ok(None)`, which never matches anything; a quantity that is not a
/// number is a `MalformedValue` error.
pub fn canonical_quantity(quantity: &str, unit: &str) -> Result<Option<BaseQuantity>> {
    let value = parse_quantity(quantity)?;

    Ok(Unit::parse(unit).map(|u| BaseQuantity {
        value: value * u.factor(),
        dimension: u.dimension(),
    }))
}
