//! catalog-match common library
//!
//! Types shared by the loaders, the matching engine and the exporters

pub mod types;
pub mod alias;
pub mod error;
pub mod catalog;

pub use types::{CatalogColumn, CatalogItem, MatchResult, MatchStatus, TransactionRecord};
pub use alias::{SynonymClass, SynonymTable};
pub use error::{Error, Result};
pub use catalog::Catalog;
