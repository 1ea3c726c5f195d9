//! Excel output

use super::{result_row, HEADERS};
use crate::error::{CatalogMatchError, Result};
use catalog_match_common::MatchResult;
use rust_xlsxwriter::*;
use std::path::Path;

const COLUMN_WIDTHS: [f64; 5] = [16.0, 36.0, 24.0, 12.0, 24.0];

pub fn write_xlsx(results: &[MatchResult], output_path: &Path) -> Result<()> {
    build_workbook(results)
        .and_then(|mut workbook| workbook.save(output_path))
        .map_err(|e| CatalogMatchError::Export(format!("xlsx {}: {}", output_path.display(), e)))
}

fn build_workbook(results: &[MatchResult]) -> std::result::Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new()
        .set_bold()
        .set_border(FormatBorder::Thin)
        .set_background_color(Color::RGB(0xD9E1F2));

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("matches")?;

    for (col, (header, width)) in HEADERS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *header, &header_format)?;
        worksheet.set_column_width(col, width)?;
    }

    for (i, result) in results.iter().enumerate() {
        let row = (i + 1) as u32;
        for (col, value) in result_row(result).iter().enumerate() {
            worksheet.write_string(row, col as u16, value)?;
        }
    }
    worksheet.set_freeze_panes(1, 0)?;

    Ok(workbook)
}
