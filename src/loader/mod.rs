//! Catalog and transaction providers
//!
//! Both sources are read fully into memory before matching starts. Failing
//! to read either one aborts the run.

pub mod table;

pub use table::{read_table, sheet_names, SourceKind, Table};

use crate::config::{CatalogColumns, TransactionColumns};
use crate::error::{CatalogMatchError, Result};
use catalog_match_common::{Catalog, CatalogColumn, CatalogItem, TransactionRecord};
use std::path::Path;
use tracing::{debug, warn};

/// Load the product catalog. Only the item code column is required; every
/// other configured column that is absent becomes a schema gap.
pub fn load_catalog(path: &Path, sheet: Option<&str>, columns: &CatalogColumns) -> Result<Catalog> {
    let table = read_table(path, sheet)?;

    let idx = |column: CatalogColumn| {
        let name = match column {
            CatalogColumn::ItemCode => &columns.item_code,
            CatalogColumn::CategoryCode => &columns.category_code,
            CatalogColumn::Manufacturer => &columns.manufacturer,
            CatalogColumn::Brand => &columns.brand,
            CatalogColumn::PackType => &columns.pack_type,
            CatalogColumn::Quantity => &columns.quantity,
            CatalogColumn::Unit => &columns.unit,
        };
        table.column(name)
    };

    let Some(code_idx) = idx(CatalogColumn::ItemCode) else {
        return Err(CatalogMatchError::InvalidSource {
            path: path.display().to_string(),
            reason: format!("missing item code column '{}'", columns.item_code),
        });
    };

    let present: Vec<CatalogColumn> = CatalogColumn::ALL
        .iter()
        .copied()
        .filter(|c| idx(*c).is_some())
        .collect();

    let mut items = Vec::with_capacity(table.rows.len());
    for (line, row) in table.rows.iter().enumerate() {
        let Some(item_code) = table.cell(row, Some(code_idx)) else {
            debug!("Catalog row {} has no item code, skipped", line + 2);
            continue;
        };
        items.push(CatalogItem {
            item_code,
            category_code: table.cell(row, idx(CatalogColumn::CategoryCode)),
            manufacturer: table.cell(row, idx(CatalogColumn::Manufacturer)),
            brand: table.cell(row, idx(CatalogColumn::Brand)),
            pack_type: table.cell(row, idx(CatalogColumn::PackType)),
            quantity: table.cell(row, idx(CatalogColumn::Quantity)),
            unit: table.cell(row, idx(CatalogColumn::Unit)),
        });
    }

    Ok(Catalog::new(items, present))
}

/// Load transaction records in input order.
pub fn load_transactions(
    path: &Path,
    sheet: Option<&str>,
    columns: &TransactionColumns,
) -> Result<Vec<TransactionRecord>> {
    let table = read_table(path, sheet)?;

    let named = [
        &columns.item_code,
        &columns.category,
        &columns.manufacturer,
        &columns.brand,
        &columns.pack_type,
        &columns.pack_size,
        &columns.description,
    ];
    let indices: Vec<Option<usize>> = named.iter().map(|name| table.column(name)).collect();

    if indices.iter().all(Option::is_none) {
        return Err(CatalogMatchError::InvalidSource {
            path: path.display().to_string(),
            reason: format!("none of the expected columns found (headers: {})", table.headers.join(", ")),
        });
    }
    for (name, index) in named.iter().zip(&indices) {
        if index.is_none() {
            warn!("Transactions {} have no '{}' column", path.display(), name);
        }
    }

    Ok(table
        .rows
        .iter()
        .map(|row| TransactionRecord {
            item_code: table.cell(row, indices[0]).unwrap_or_default(),
            category: table.cell(row, indices[1]),
            manufacturer: table.cell(row, indices[2]),
            brand: table.cell(row, indices[3]),
            pack_type: table.cell(row, indices[4]),
            pack_size_raw: table.cell(row, indices[5]),
            description: table.cell(row, indices[6]),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_catalog_csv_with_gap() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.csv");
        std::fs::write(
            &path,
            "ItemCode,CatCode,Company,PackType,Qty,UOM\nA1,10,Acme Co,can,330,ml\n,10,Orphan,can,1,l\nB2,20,Bolt,,1,l\n",
        )
        .unwrap();

        let catalog = load_catalog(&path, None, &CatalogColumns::default()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(!catalog.has_column(CatalogColumn::Brand));
        assert!(catalog.has_column(CatalogColumn::Unit));

        let b2 = catalog.items().iter().find(|i| i.item_code == "B2").unwrap();
        assert_eq!(b2.pack_type, None);
        assert_eq!(b2.quantity.as_deref(), Some("1"));
    }

    #[test]
    fn test_load_catalog_requires_item_code() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("master.csv");
        std::fs::write(&path, "code,company\nA1,Acme\n").unwrap();

        let err = load_catalog(&path, None, &CatalogColumns::default()).unwrap_err();
        assert!(matches!(err, CatalogMatchError::InvalidSource { .. }));
    }

    #[test]
    fn test_load_transactions_keeps_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aug.csv");
        std::fs::write(
            &path,
            "ITEMCODE,CATEGORY,MANUFACTURE,BRAND,PACKTYPE,PACKSIZE,ITEMDESC\n\
             T2,10,ACME,,CAN,330ML,Acme cola\n\
             T1,20,Bolt,Bolt,PET,1L,\n",
        )
        .unwrap();

        let records = load_transactions(&path, None, &TransactionColumns::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item_code, "T2");
        assert_eq!(records[0].brand, None);
        assert_eq!(records[0].pack_size_raw.as_deref(), Some("330ML"));
        assert_eq!(records[1].item_code, "T1");
        assert_eq!(records[1].description, None);
    }

    #[test]
    fn test_load_transactions_rejects_foreign_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("other.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let err = load_transactions(&path, None, &TransactionColumns::default()).unwrap_err();
        assert!(matches!(err, CatalogMatchError::InvalidSource { .. }));
    }
}
