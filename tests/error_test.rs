//! Error cases
//!
//! Sources that cannot be read and configs that cannot run.

use catalog_match::config::{CatalogColumns, Config, TransactionColumns};
use catalog_match::error::CatalogMatchError;
use catalog_match::loader::{load_catalog, load_transactions, read_table};
use catalog_match::matcher::{MatchContext, MatchField, MatchOptions, StageSpec, Strategy};
use catalog_match_common::{Catalog, SynonymTable};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

/// Missing file
#[test]
fn test_missing_catalog_file() {
    let result = load_catalog(
        Path::new("/nonexistent/path/12345/catalog.csv"),
        None,
        &CatalogColumns::default(),
    );
    assert!(matches!(result, Err(CatalogMatchError::FileNotFound(_))));
}

/// Unsupported extension
#[test]
fn test_unsupported_source_type() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.txt");
    fs::write(&path, "itemcode\nA1\n").unwrap();

    let err = read_table(&path, None).unwrap_err();
    assert!(matches!(err, CatalogMatchError::InvalidSource { .. }));
    assert!(err.to_string().contains("unsupported file type"));
}

/// A catalog without its item code column cannot be used
#[test]
fn test_catalog_without_code_column() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("catalog.csv");
    fs::write(&path, "catcode,company\n10,Acme\n").unwrap();

    let err = load_catalog(&path, None, &CatalogColumns::default()).unwrap_err();
    assert!(err.to_string().contains("itemcode"));
}

/// Transactions with none of the expected headers
#[test]
fn test_transactions_with_unknown_headers() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("aug.csv");
    fs::write(&path, "foo,bar\n1,2\n").unwrap();

    let result = load_transactions(&path, None, &TransactionColumns::default());
    assert!(matches!(result, Err(CatalogMatchError::InvalidSource { .. })));
}

/// A service stage needs a provider
#[test]
fn test_service_stage_without_provider() {
    let specs = [StageSpec::new(MatchField::Brand, Strategy::Service)];
    let result = MatchContext::build(
        Arc::new(Catalog::default()),
        SynonymTable::default(),
        &specs,
        MatchOptions::default(),
        None,
    );
    assert!(result.is_err());
}

/// Fuzzy top-K of zero is rejected
#[test]
fn test_zero_top_k_config() {
    let config = Config {
        top_k: 0,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

/// Error display
#[test]
fn test_error_display() {
    let err = CatalogMatchError::SheetNotFound {
        path: "aug.xlsx".into(),
        sheet: "Sep".into(),
        available: "Jul, Aug".into(),
    };
    assert_eq!(
        err.to_string(),
        "Sheet 'Sep' not found in aug.xlsx (available: Jul, Aug)"
    );

    let common = catalog_match_common::Error::malformed("quantity", "12x", "not a number");
    let err: CatalogMatchError = common.into();
    assert_eq!(err.to_string(), "Malformed quantity value '12x': not a number");
}
