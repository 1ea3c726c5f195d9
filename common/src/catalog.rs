//! Master catalog
//!
//! Holds the catalog rows together with the set of columns the source schema
//! declared, so a matching stage can ask whether its attribute exists at all.

use crate::types::{CatalogColumn, CatalogItem};
use std::collections::BTreeSet;

/// Whole catalog, read-only once built
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// All rows in source order
    items: Vec<CatalogItem>,
    /// Columns present in the source schema
    columns: BTreeSet<CatalogColumn>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>, columns: impl IntoIterator<Item = CatalogColumn>) -> Self {
        let mut columns: BTreeSet<CatalogColumn> = columns.into_iter().collect();
        columns.insert(CatalogColumn::ItemCode);

        Self { items, columns }
    }

    /// Catalog whose schema declares every column.
    pub fn with_all_columns(items: Vec<CatalogItem>) -> Self {
        Self::new(items, CatalogColumn::ALL)
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether the source schema carries `column`
    pub fn has_column(&self, column: CatalogColumn) -> bool {
        self.columns.contains(&column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<CatalogItem> {
        vec![
            CatalogItem {
                item_code: "A1".into(),
                category_code: Some("10".into()),
                brand: Some("Fizz".into()),
                ..Default::default()
            },
            CatalogItem {
                item_code: "B2".into(),
                category_code: Some("20".into()),
                ..Default::default()
            },
            CatalogItem {
                item_code: "C3".into(),
                category_code: Some("10".into()),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_schema_columns() {
        let catalog = Catalog::new(sample(), [CatalogColumn::CategoryCode, CatalogColumn::Brand]);
        assert!(catalog.has_column(CatalogColumn::ItemCode));
        assert!(catalog.has_column(CatalogColumn::Brand));
        assert!(!catalog.has_column(CatalogColumn::Quantity));
    }

    #[test]
    fn test_item_order_is_kept() {
        let catalog = Catalog::with_all_columns(sample());
        let codes: Vec<&str> = catalog.items().iter().map(|i| i.item_code.as_str()).collect();
        assert_eq!(codes, vec!["A1", "B2", "C3"]);
        assert_eq!(catalog.len(), 3);
    }
}
