//! Stage wiring: normalizer, reconciler and resolver over one table, then the
//! two store adapters.

use std::path::Path;

use chrono::Utc;
use log::{error, info};
use uuid::Uuid;

use crate::{
    config::Credentials,
    data::CensusTable,
    error::{SchemaError, StoreError},
    normalize::{self, LabelMapping, RenameSummary},
    persist::{
        BatchReport,
        document::{DocumentStore, JsonLinesStore},
        relational::RelationalStore,
    },
    reconcile::{self, BoundaryChange, ReconcileSummary},
    resolve::{self, MissingnessReport},
};

#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub table: CensusTable,
    pub renamed: RenameSummary,
    pub reconciled: ReconcileSummary,
    pub missingness: MissingnessReport,
}

/// Runs the three transformation stages in order. Any schema problem aborts.
pub fn clean_table(
    mut table: CensusTable,
    mapping: &LabelMapping,
    changes: &[BoundaryChange],
) -> Result<CleanOutcome, SchemaError> {
    let renamed = normalize::normalize(&mut table, mapping)?;
    let reconciled = reconcile::reconcile(&mut table, changes)?;
    let missingness = resolve::resolve_missing(&mut table)?;
    Ok(CleanOutcome {
        table,
        renamed,
        reconciled,
        missingness,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct StoreTargets<'a> {
    pub documents: &'a Path,
    pub database: &'a Path,
    pub credentials: Option<&'a Credentials>,
    /// Recorded in the load audit trail.
    pub source: &'a str,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub reports: Vec<BatchReport>,
    /// Store-level failures; each one abandoned the rest of its stage.
    pub failures: Vec<StoreError>,
    pub run_id: Option<Uuid>,
}

impl LoadOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, err: StoreError) {
        error!("{err}");
        self.failures.push(err);
    }
}

/// Persists the finalized table into both stores. A failure in one store
/// does not prevent the other from loading.
pub fn persist(table: &CensusTable, targets: &StoreTargets<'_>) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    match JsonLinesStore::open(targets.documents) {
        Ok(mut store) => load_documents(&mut store, table, &mut outcome),
        Err(err) => outcome.fail(err),
    }

    let started_at = Utc::now();
    match RelationalStore::open(targets.database, targets.credentials) {
        Ok(mut store) => match store.load(table) {
            Ok(reports) => {
                match store.record_run(started_at, targets.source, table.len(), &reports) {
                    Ok(run_id) => outcome.run_id = Some(run_id),
                    Err(err) => outcome.fail(err),
                }
                outcome.reports.extend(reports);
            }
            Err(err) => outcome.fail(err),
        },
        Err(err) => outcome.fail(err),
    }

    info!(
        "Load finished: {} table report(s), {} store failure(s)",
        outcome.reports.len(),
        outcome.failures.len()
    );
    outcome
}

pub fn load_documents(
    store: &mut dyn DocumentStore,
    table: &CensusTable,
    outcome: &mut LoadOutcome,
) {
    match store.replace_all(table) {
        Ok(report) => outcome.reports.push(report),
        Err(err) => outcome.fail(err),
    }
}
