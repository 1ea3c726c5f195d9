//! Raw tabular input: spreadsheets via calamine, CSV via csv

use crate::error::{CatalogMatchError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// Header row plus data rows, every cell as trimmed text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Column index by header name, ignoring case and surrounding spaces.
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
    }

    /// Cell text, `None` when missing or blank.
    pub fn cell(&self, row: &[String], column: Option<usize>) -> Option<String> {
        column
            .and_then(|i| row.get(i))
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Workbook,
    Csv,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceKind::Workbook),
            "csv" => Ok(SourceKind::Csv),
            _ => Err(CatalogMatchError::InvalidSource {
                path: path.display().to_string(),
                reason: format!("unsupported file type '{}'", ext),
            }),
        }
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(CatalogMatchError::FileNotFound(path.display().to_string()))
    }
}

/// Worksheet names of a workbook; a CSV file has none.
pub fn sheet_names(path: &Path) -> Result<Vec<String>> {
    ensure_exists(path)?;
    match SourceKind::from_path(path)? {
        SourceKind::Csv => Ok(Vec::new()),
        SourceKind::Workbook => {
            let workbook = open_workbook_auto(path).map_err(|e| CatalogMatchError::Workbook {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            Ok(workbook.sheet_names().to_vec())
        }
    }
}

/// Read a table. `sheet` picks a worksheet (first sheet when `None`) and is
/// ignored for CSV.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table> {
    ensure_exists(path)?;
    match SourceKind::from_path(path)? {
        SourceKind::Workbook => read_workbook(path, sheet),
        SourceKind::Csv => read_csv(path),
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.trim().to_string(),
        // whole numbers come back as floats; "330.0" must read as "330"
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
        Data::Float(n) => n.to_string(),
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let display = path.display().to_string();
    let mut workbook = open_workbook_auto(path).map_err(|e| CatalogMatchError::Workbook {
        path: display.clone(),
        reason: e.to_string(),
    })?;

    let names = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(wanted))
            .cloned()
            .ok_or_else(|| CatalogMatchError::SheetNotFound {
                path: display.clone(),
                sheet: wanted.to_string(),
                available: names.join(", "),
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| CatalogMatchError::InvalidSource {
                path: display.clone(),
                reason: "workbook has no sheets".into(),
            })?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| CatalogMatchError::Workbook {
            path: display.clone(),
            reason: format!("sheet '{}': {}", name, e),
        })?;

    let mut rows = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = rows.next().ok_or_else(|| CatalogMatchError::InvalidSource {
        path: display.clone(),
        reason: format!("sheet '{}' is empty", name),
    })?;

    Ok(Table {
        headers,
        rows: rows.filter(|r| r.iter().any(|c| !c.is_empty())).collect(),
    })
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(CatalogMatchError::InvalidSource {
            path: path.display().to_string(),
            reason: "missing header row".into(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.iter().any(|c| !c.is_empty()) {
            rows.push(row);
        }
    }

    Ok(Table { headers, rows })
}
