//! CSV output

use super::{result_row, HEADERS};
use crate::error::Result;
use catalog_match_common::MatchResult;
use std::path::Path;

pub fn write_csv(results: &[MatchResult], output_path: &Path) -> Result<()> {
    let mut writer = ::csv::Writer::from_path(output_path)?;
    writer.write_record(HEADERS)?;
    for result in results {
        writer.write_record(result_row(result))?;
    }
    writer.flush()?;
    Ok(())
}
