//! catalog-match
//!
//! Reconciles transaction line items against a master product catalog:
//! field normalization, a progressive pass pipeline, fuzzy scoring and
//! top-N selection per transaction.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod matcher;
pub mod normalizer;
pub mod service;
pub mod sheet_selector;
