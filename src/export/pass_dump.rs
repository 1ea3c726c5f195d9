//! Per-pass candidate dumps
//!
//! Debugging aid: after every stage that ran, the surviving candidates of a
//! record are written to `pass_{record}_{stage}.csv`.

use crate::matcher::{MatchField, PassObserver, StageEvent, StageStatus};
use catalog_match_common::Result;
use std::io;
use std::path::PathBuf;

const SCORE_FIELDS: [MatchField; 2] = [MatchField::Manufacturer, MatchField::Brand];

pub struct PassDump {
    dir: PathBuf,
}

impl PassDump {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn file_name(record_index: usize, stage: &str) -> String {
        format!("pass_{}_{}.csv", record_index, stage.replace(':', "_"))
    }
}

impl PassObserver for PassDump {
    fn on_stage(&self, event: &StageEvent<'_, '_>) -> Result<()> {
        if matches!(event.report.status, StageStatus::Skipped(_)) {
            return Ok(());
        }

        let path = self
            .dir
            .join(Self::file_name(event.record_index, &event.report.stage));
        let mut writer = csv::Writer::from_path(&path).map_err(io::Error::from)?;

        writer
            .write_record([
                "itemcode",
                "catcode",
                "company",
                "brand",
                "packtype",
                "packsize",
                "company_score",
                "brand_score",
            ])
            .map_err(io::Error::from)?;

        for candidate in event.candidates.iter() {
            let item = &candidate.entry.normalized;
            let score = |field: MatchField| {
                candidate
                    .scores
                    .get(&field)
                    .map(|s| format!("{:.2}", s))
                    .unwrap_or_default()
            };
            let [company_score, brand_score] = SCORE_FIELDS.map(score);

            writer
                .write_record([
                    candidate.item_code().to_string(),
                    item.category.clone().unwrap_or_default(),
                    item.manufacturer.clone().unwrap_or_default(),
                    item.brand.clone().unwrap_or_default(),
                    item.pack_type.clone().unwrap_or_default(),
                    item.pack_size.as_ref().map(|s| s.to_string()).unwrap_or_default(),
                    company_score,
                    brand_score,
                ])
                .map_err(io::Error::from)?;
        }

        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_is_path_safe() {
        assert_eq!(
            PassDump::file_name(31, "pack_size:numeric"),
            "pass_31_pack_size_numeric.csv"
        );
    }
}
