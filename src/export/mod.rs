pub mod csv;
pub mod excel;
pub mod pass_dump;

pub use pass_dump::PassDump;

use crate::error::Result;
use catalog_match_common::{MatchResult, MatchStatus};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// Separator between multiple codes or scores in one cell
pub const JOIN_SEPARATOR: &str = " || ";

pub const HEADERS: [&str; 5] = ["t_itemcode", "m_itemcode(s)", "final_score", "status", "stage"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
        }
    }
}

/// One result flattened to the exported columns
pub fn result_row(result: &MatchResult) -> [String; 5] {
    let codes = result.matched_item_codes.join(JOIN_SEPARATOR);
    let scores = result
        .scores
        .as_ref()
        .map(|scores| {
            scores
                .iter()
                .map(|s| format!("{:.2}", s))
                .collect::<Vec<_>>()
                .join(JOIN_SEPARATOR)
        })
        .unwrap_or_default();

    let (status, stage) = match &result.status {
        MatchStatus::Matched => ("matched", String::new()),
        MatchStatus::Fallback { stage } => ("fallback", stage.clone()),
        MatchStatus::NoMatch { stage } => ("no_match", stage.clone().unwrap_or_default()),
        MatchStatus::Failed { reason } => ("failed", reason.clone()),
    };

    [
        result.source_item_code.clone(),
        codes,
        scores,
        status.to_string(),
        stage,
    ]
}

fn output_path_for_format(output: &Path, stem: &str, format: ExportFormat) -> PathBuf {
    if output.is_dir() || output.extension().is_none() {
        output.join(format!("{}.{}", stem, format.extension()))
    } else {
        output.to_path_buf()
    }
}

/// Write `results` to `output` (a file, or a directory that receives
/// `{stem}.{ext}`). Returns the written path.
pub fn export_results(
    results: &[MatchResult],
    format: ExportFormat,
    output: &Path,
    stem: &str,
) -> Result<PathBuf> {
    let path = output_path_for_format(output, stem, format);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    match format {
        ExportFormat::Csv => csv::write_csv(results, &path)?,
        ExportFormat::Xlsx => excel::write_xlsx(results, &path)?,
        ExportFormat::Json => {
            let json = serde_json::to_string_pretty(results)?;
            std::fs::write(&path, json)?;
        }
    }

    Ok(path)
}
