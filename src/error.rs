use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogMatchError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Cannot read workbook {path}: {reason}")]
    Workbook { path: String, reason: String },

    #[error("Sheet '{sheet}' not found in {path} (available: {available})")]
    SheetNotFound {
        path: String,
        sheet: String,
        available: String,
    },

    #[error("Invalid source {path}: {reason}")]
    InvalidSource { path: String, reason: String },

    #[error("Export error: {0}")]
    Export(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] catalog_match_common::Error),
}

pub type Result<T> = std::result::Result<T, CatalogMatchError>;
