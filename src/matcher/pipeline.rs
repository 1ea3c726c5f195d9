//! Pass pipeline
//!
//! An ordered list of stages, each comparing one field with one predicate.
//! Hard gates keep the passing subset and end the record when nothing is
//! left; soft gates rank and keep the top-K.

use super::predicate::{local_predicate, Gate, Predicate, PredicateProvider};
use super::types::{
    Candidate, CandidateSet, CandidateTracker, CatalogEntry, PipelineOutcome, PipelineRun,
    SkipReason, StageReport, StageSpec, StageStatus, Strategy,
};
use crate::normalizer::NormalizedRecord;
use catalog_match_common::{Catalog, CatalogColumn, Error, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a stage hands to a `PassObserver`
pub struct StageEvent<'e, 'a> {
    pub record_index: usize,
    pub record: &'e NormalizedRecord,
    pub report: &'e StageReport,
    pub candidates: &'e CandidateSet<'a>,
}

/// Hook called after every stage. Failures are logged and ignored.
pub trait PassObserver: Send + Sync {
    fn on_stage(&self, event: &StageEvent<'_, '_>) -> Result<()>;
}

/// One compiled pass
pub struct Stage {
    pub spec: StageSpec,
    name: String,
    predicate: Arc<dyn Predicate>,
    missing_column: Option<CatalogColumn>,
    top_k: usize,
}

impl Stage {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gate(&self) -> Gate {
        self.predicate.gate()
    }

    /// Column whose absence turns the stage into a no-op
    pub fn missing_column(&self) -> Option<CatalogColumn> {
        self.missing_column
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("missing_column", &self.missing_column)
            .field("top_k", &self.top_k)
            .finish()
    }
}

#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Compile stage specs against the catalog schema.
    ///
    /// Service stages need a `provider`; a run without one is a config error.
    pub fn from_specs(
        specs: &[StageSpec],
        catalog: &Catalog,
        default_top_k: usize,
        provider: Option<&dyn PredicateProvider>,
    ) -> Result<Self> {
        let mut stages = Vec::with_capacity(specs.len());

        for spec in specs {
            let name = spec.name();

            let predicate = match local_predicate(spec.strategy) {
                Some(p) => p,
                None => match provider {
                    Some(provider) => provider.predicate_for(spec)?,
                    None => {
                        return Err(Error::Config(format!(
                            "stage {} needs a decision service, but none is configured",
                            name
                        )))
                    }
                },
            };

            let top_k = spec.top_k.unwrap_or(default_top_k);
            if spec.strategy == Strategy::Fuzzy && top_k == 0 {
                return Err(Error::Config(format!("stage {}: top_k must be at least 1", name)));
            }

            let missing_column = spec
                .field
                .columns()
                .iter()
                .copied()
                .find(|c| !catalog.has_column(*c));
            if let Some(column) = missing_column {
                warn!("Catalog has no '{}' column; stage {} will be skipped", column, name);
            }

            stages.push(Stage {
                spec: spec.clone(),
                name,
                predicate,
                missing_column,
                top_k,
            });
        }

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage for one record over the normalized catalog.
    pub fn run<'a>(
        &self,
        record_index: usize,
        record: &NormalizedRecord,
        entries: &'a [CatalogEntry],
        observer: Option<&dyn PassObserver>,
    ) -> PipelineRun<'a> {
        let mut set = CandidateSet::from_entries(entries);
        let mut tracker = CandidateTracker::default();
        let mut reports = Vec::with_capacity(self.stages.len());

        if set.is_empty() {
            return PipelineRun {
                outcome: PipelineOutcome::Eliminated {
                    stage: None,
                    last_non_empty: None,
                },
                reports,
            };
        }

        for (position, stage) in self.stages.iter().enumerate() {
            let before = set.len();
            let (next, status) = self.apply(stage, record, set);
            set = next;

            let report = StageReport {
                stage: stage.name.clone(),
                position,
                before,
                after: set.len(),
                status,
            };
            debug!(
                record = %record.item_code,
                stage = %report.stage,
                before = report.before,
                after = report.after,
                status = ?report.status,
                "pass finished"
            );

            if let Some(observer) = observer {
                let event = StageEvent {
                    record_index,
                    record,
                    report: &report,
                    candidates: &set,
                };
                if let Err(e) = observer.on_stage(&event) {
                    warn!("Pass observer failed at {}: {}", report.stage, e);
                }
            }

            let applied = report.status == StageStatus::Applied;
            reports.push(report);

            if set.is_empty() {
                return PipelineRun {
                    outcome: PipelineOutcome::Eliminated {
                        stage: Some(stage.name.clone()),
                        last_non_empty: tracker.into_last_non_empty(),
                    },
                    reports,
                };
            }
            if applied {
                tracker.record(&set);
            }
        }

        PipelineRun {
            outcome: PipelineOutcome::Completed(set),
            reports,
        }
    }

    fn apply<'a>(
        &self,
        stage: &Stage,
        record: &NormalizedRecord,
        set: CandidateSet<'a>,
    ) -> (CandidateSet<'a>, StageStatus) {
        if let Some(column) = stage.missing_column {
            return (set, StageStatus::Skipped(SkipReason::MissingColumn(column)));
        }

        let field = stage.spec.field;
        let search = field.search_value(record);

        match stage.gate() {
            Gate::Soft => {
                if search.is_empty() {
                    return (set, StageStatus::Skipped(SkipReason::EmptySearchValue));
                }

                let mut scored: Vec<(f64, Candidate<'a>)> = set
                    .into_candidates()
                    .into_iter()
                    .map(|mut candidate| {
                        let score = match field.candidate_value(&candidate.entry.normalized) {
                            Some(value) => match stage.predicate.evaluate(&search, &value) {
                                Ok(verdict) => verdict.score(),
                                Err(e) => {
                                    debug!("{} scored 0 at {}: {}", candidate.item_code(), stage.name, e);
                                    0.0
                                }
                            },
                            None => 0.0,
                        };
                        candidate.scores.insert(field, score);
                        (score, candidate)
                    })
                    .collect();

                scored.sort_by(|(sa, a), (sb, b)| {
                    sb.total_cmp(sa).then_with(|| a.item_code().cmp(b.item_code()))
                });
                scored.truncate(stage.top_k);

                let kept = scored.into_iter().map(|(_, c)| c).collect();
                (CandidateSet::from_candidates(kept), StageStatus::Applied)
            }
            Gate::Hard => {
                if let Err(e) = stage.predicate.check_search(&search) {
                    warn!("Record {} fails {}: {}", record.item_code, stage.name, e);
                    return (CandidateSet::default(), StageStatus::RecordFailed(e.to_string()));
                }

                let kept = set
                    .into_candidates()
                    .into_iter()
                    .filter(|candidate| {
                        let Some(value) = field.candidate_value(&candidate.entry.normalized) else {
                            return false;
                        };
                        match stage.predicate.evaluate(&search, &value) {
                            Ok(verdict) => verdict.passes(),
                            Err(e) => {
                                debug!("{} rejected at {}: {}", candidate.item_code(), stage.name, e);
                                false
                            }
                        }
                    })
                    .collect();

                (CandidateSet::from_candidates(kept), StageStatus::Applied)
            }
        }
    }
}
