//! Matching engine
//!
//! `MatchContext` is built once per run and shared read-only by every worker.
//! Each record goes normalize → pipeline → scorer on its own.

pub mod pipeline;
pub mod predicate;
pub mod scorer;
pub mod types;

pub use pipeline::{PassObserver, Pipeline, Stage, StageEvent};
pub use predicate::{Gate, Predicate, PredicateProvider, Verdict};
pub use types::{
    CandidateSet, CandidateTracker, CatalogEntry, EmptyPolicy, MatchField, PipelineMode,
    PipelineOutcome, SkipReason, StageReport, StageSpec, StageStatus, Strategy,
};

use crate::error::Result;
use crate::normalizer::{normalize_item, normalize_record};
use catalog_match_common::{Catalog, MatchResult, MatchStatus, SynonymTable, TransactionRecord};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{error, info};

/// Run-wide matching knobs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Candidates a fuzzy stage keeps
    pub top_k: usize,
    /// Codes reported per record
    pub top_n: usize,
    pub on_empty: EmptyPolicy,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            top_n: 3,
            on_empty: EmptyPolicy::NoMatch,
        }
    }
}

pub struct MatchContext {
    entries: Vec<CatalogEntry>,
    synonyms: SynonymTable,
    pipeline: Pipeline,
    options: MatchOptions,
    observer: Option<Arc<dyn PassObserver>>,
}

impl MatchContext {
    pub fn new(
        catalog: Arc<Catalog>,
        synonyms: SynonymTable,
        pipeline: Pipeline,
        options: MatchOptions,
    ) -> Self {
        let entries = catalog
            .items()
            .iter()
            .map(|item| CatalogEntry {
                item_code: item.item_code.trim().to_string(),
                normalized: normalize_item(item, &synonyms),
            })
            .collect();

        info!(
            "Match context ready: {} catalog items, {} stages, on_empty={:?}",
            catalog.len(),
            pipeline.len(),
            options.on_empty
        );

        Self {
            entries,
            synonyms,
            pipeline,
            options,
            observer: None,
        }
    }

    /// Compile `specs` against the catalog and build the context.
    pub fn build(
        catalog: Arc<Catalog>,
        synonyms: SynonymTable,
        specs: &[StageSpec],
        options: MatchOptions,
        provider: Option<&dyn PredicateProvider>,
    ) -> Result<Self> {
        let pipeline = Pipeline::from_specs(specs, &catalog, options.top_k, provider)?;
        Ok(Self::new(catalog, synonyms, pipeline, options))
    }

    pub fn with_observer(mut self, observer: Arc<dyn PassObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Resolve one transaction. Never fails; problems become result statuses.
    pub fn match_record(&self, index: usize, record: &TransactionRecord) -> MatchResult {
        let normalized = normalize_record(record, &self.synonyms);
        let code = normalized.item_code.clone();
        let run = self
            .pipeline
            .run(index, &normalized, &self.entries, self.observer.as_deref());

        match run.outcome {
            PipelineOutcome::Completed(set) => {
                scorer::to_result(&code, scorer::rank(&set, self.options.top_n), MatchStatus::Matched)
            }
            PipelineOutcome::Eliminated {
                stage,
                last_non_empty,
            } => match (self.options.on_empty, last_non_empty) {
                (EmptyPolicy::LastNonEmpty, Some(set)) => scorer::to_result(
                    &code,
                    scorer::rank(&set, self.options.top_n),
                    MatchStatus::Fallback {
                        stage: stage.unwrap_or_default(),
                    },
                ),
                _ => MatchResult::no_match(code, stage),
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Match every record, preserving input order.
///
/// `workers == 1` runs on the calling thread; `0` uses every available core.
/// A panic inside one record is caught and reported as a `failed` result.
pub fn run_batch(
    ctx: &MatchContext,
    records: &[TransactionRecord],
    workers: usize,
    progress: Option<&ProgressBar>,
) -> Result<Vec<MatchResult>> {
    let workers = if workers == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        workers
    };

    let process = |index: usize, record: &TransactionRecord| -> MatchResult {
        let result = match panic::catch_unwind(AssertUnwindSafe(|| ctx.match_record(index, record))) {
            Ok(result) => result,
            Err(payload) => {
                let reason = panic_message(&*payload);
                error!("Record {} ({}) failed: {}", index, record.item_code, reason);
                MatchResult::failed(record.item_code.trim(), reason)
            }
        };
        if let Some(pb) = progress {
            pb.inc(1);
        }
        result
    };

    if workers <= 1 || records.len() <= 1 {
        return Ok(records
            .iter()
            .enumerate()
            .map(|(index, record)| process(index, record))
            .collect());
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(workers).build()?;

    let mut slots: Vec<Option<MatchResult>> = vec![None; records.len()];
    pool.install(|| {
        slots
            .par_iter_mut()
            .enumerate()
            .for_each(|(index, slot)| *slot = Some(process(index, &records[index])));
    });

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_match_common::CatalogItem;

    fn acme_catalog() -> Arc<Catalog> {
        Arc::new(Catalog::with_all_columns(vec![
            CatalogItem {
                item_code: "A1".into(),
                category_code: Some("10".into()),
                manufacturer: Some("Acme Co".into()),
                pack_type: Some("can".into()),
                quantity: Some("330".into()),
                unit: Some("ml".into()),
                ..Default::default()
            },
            CatalogItem {
                item_code: "B7".into(),
                category_code: Some("10".into()),
                manufacturer: Some("Bolt Beverages".into()),
                pack_type: Some("bottle".into()),
                quantity: Some("1".into()),
                unit: Some("l".into()),
                ..Default::default()
            },
            CatalogItem {
                item_code: "C3".into(),
                category_code: Some("20".into()),
                manufacturer: Some("Acme Co".into()),
                pack_type: Some("can".into()),
                quantity: Some("330".into()),
                unit: Some("ml".into()),
                ..Default::default()
            },
        ]))
    }

    fn context(on_empty: EmptyPolicy) -> MatchContext {
        let options = MatchOptions {
            on_empty,
            ..Default::default()
        };
        MatchContext::build(
            acme_catalog(),
            SynonymTable::retail_preset(),
            &PipelineMode::Fuzzy.stages(),
            options,
            None,
        )
        .unwrap()
    }

    fn acme_record(code: &str, category: &str, size: &str) -> TransactionRecord {
        TransactionRecord {
            item_code: code.into(),
            category: Some(category.into()),
            manufacturer: Some("ACME".into()),
            pack_type: Some("CAN".into()),
            pack_size_raw: Some(size.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_acme_scenario() {
        let ctx = context(EmptyPolicy::NoMatch);
        let result = ctx.match_record(0, &acme_record("T1", "10", "330ML"));

        assert_eq!(result.source_item_code, "T1");
        assert_eq!(result.matched_item_codes, vec!["A1"]);
        assert_eq!(result.status, MatchStatus::Matched);
        assert!(result.breakdown[0]["manufacturer"] >= 90.0);
        assert!(result.scores.unwrap()[0] >= 90.0);
    }

    #[test]
    fn test_absent_category_is_no_match_under_both_policies() {
        for policy in [EmptyPolicy::NoMatch, EmptyPolicy::LastNonEmpty] {
            let ctx = context(policy);
            let result = ctx.match_record(0, &acme_record("T2", "99", "330ML"));
            assert!(result.matched_item_codes.is_empty());
            assert!(result.scores.is_none());
            assert_eq!(
                result.status,
                MatchStatus::NoMatch {
                    stage: Some("category:exact".into())
                }
            );
        }
    }

    #[test]
    fn test_fallback_uses_last_non_empty_set() {
        let record = acme_record("T3", "10", "750ml");

        let strict = context(EmptyPolicy::NoMatch).match_record(0, &record);
        assert!(strict.matched_item_codes.is_empty());

        let lenient = context(EmptyPolicy::LastNonEmpty).match_record(0, &record);
        assert_eq!(lenient.matched_item_codes, vec!["A1", "B7"]);
        assert_eq!(
            lenient.status,
            MatchStatus::Fallback {
                stage: "pack_size:numeric".into()
            }
        );
    }

    #[test]
    fn test_unit_synonyms_match_across_sides() {
        let ctx = context(EmptyPolicy::NoMatch);
        let record = TransactionRecord {
            item_code: "T4".into(),
            category: Some("10".into()),
            manufacturer: Some("Bolt".into()),
            pack_type: Some("PET".into()),
            pack_size_raw: Some("1000 Millilitre".into()),
            ..Default::default()
        };
        assert_eq!(ctx.match_record(0, &record).matched_item_codes, vec!["B7"]);
    }

    #[test]
    fn test_top_n_bound() {
        let items = (0..10)
            .map(|i| CatalogItem {
                item_code: format!("X{:02}", i),
                manufacturer: Some(format!("acme {}", i)),
                ..Default::default()
            })
            .collect();
        let catalog = Arc::new(Catalog::with_all_columns(items));
        let specs = [StageSpec::new(MatchField::Manufacturer, Strategy::Fuzzy)];
        let ctx = MatchContext::build(
            catalog,
            SynonymTable::default(),
            &specs,
            MatchOptions::default(),
            None,
        )
        .unwrap();

        let result = ctx.match_record(0, &acme_record("T5", "10", "330ml"));
        assert_eq!(result.matched_item_codes.len(), 3);
        assert_eq!(result.scores.as_ref().map(Vec::len), Some(3));
    }

    #[test]
    fn test_batch_preserves_order_and_is_deterministic() {
        let ctx = context(EmptyPolicy::NoMatch);
        let records: Vec<_> = (0..40)
            .map(|i| {
                let category = if i % 3 == 0 { "99" } else { "10" };
                acme_record(&format!("T{}", i), category, "330ml")
            })
            .collect();

        let sequential = run_batch(&ctx, &records, 1, None).unwrap();
        let parallel = run_batch(&ctx, &records, 4, None).unwrap();

        assert_eq!(sequential, parallel);
        for (i, result) in parallel.iter().enumerate() {
            assert_eq!(result.source_item_code, format!("T{}", i));
            assert_eq!(result.is_match(), i % 3 != 0);
        }
    }

    struct PanicOn(usize);

    impl PassObserver for PanicOn {
        fn on_stage(&self, event: &StageEvent<'_, '_>) -> catalog_match_common::Result<()> {
            if event.record_index == self.0 {
                panic!("observer blew up");
            }
            Ok(())
        }
    }

    #[test]
    fn test_panic_is_isolated_to_one_record() {
        let ctx = context(EmptyPolicy::NoMatch).with_observer(Arc::new(PanicOn(1)));
        let records: Vec<_> = (0..3)
            .map(|i| acme_record(&format!("T{}", i), "10", "330ml"))
            .collect();

        let results = run_batch(&ctx, &records, 2, None).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_match());
        assert_eq!(
            results[1].status,
            MatchStatus::Failed {
                reason: "observer blew up".into()
            }
        );
        assert!(results[2].is_match());
    }
}
