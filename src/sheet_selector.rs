//! Interactive worksheet selection

use crate::error::{CatalogMatchError, Result};
use crate::loader;
use dialoguer::Select;
use std::io::IsTerminal;
use std::path::Path;

/// What to do about a workbook's sheets when none was named
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetChoice {
    /// CSV file or single-sheet workbook
    Only(Option<String>),
    /// Several sheets; the user has to pick
    Ask(Vec<String>),
}

pub fn classify(names: Vec<String>) -> SheetChoice {
    match names.len() {
        0 => SheetChoice::Only(None),
        1 => SheetChoice::Only(names.into_iter().next()),
        _ => SheetChoice::Ask(names),
    }
}

/// Sheet to read from `path`. An explicit `requested` name wins; otherwise
/// a multi-sheet workbook prompts, or falls back to the first sheet when
/// stdin is not a terminal.
pub fn select_sheet(path: &Path, requested: Option<&str>) -> Result<Option<String>> {
    if let Some(name) = requested {
        return Ok(Some(name.to_string()));
    }

    match classify(loader::sheet_names(path)?) {
        SheetChoice::Only(name) => Ok(name),
        SheetChoice::Ask(names) => {
            if !std::io::stdin().is_terminal() {
                println!("⚠ {} has {} sheets; using '{}'", path.display(), names.len(), names[0]);
                return Ok(Some(names[0].clone()));
            }

            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let index = Select::new()
                .with_prompt(format!("Select the sheet to read from {}", file_name))
                .items(&names)
                .default(0)
                .interact()
                .map_err(|e| CatalogMatchError::Config(format!("sheet selection failed: {}", e)))?;

            println!("→ using sheet '{}'", names[index]);
            Ok(Some(names[index].clone()))
        }
    }
}
