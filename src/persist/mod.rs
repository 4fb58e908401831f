//! Persistence of the finalized table into the document and relational stores.
//!
//! Every row write yields a [`RowOutcome`]. Outcomes are folded into one
//! [`BatchReport`] per target table, so a failed row is visible in the report
//! instead of vanishing into a log line.

pub mod document;
pub mod relational;

use log::warn;
use serde::Serialize;

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Stored,
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub table: String,
    pub stored: usize,
    pub skipped: Vec<SkippedRow>,
}

impl BatchReport {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            stored: 0,
            skipped: Vec::new(),
        }
    }

    pub fn record(&mut self, key: impl Into<String>, outcome: RowOutcome) {
        match outcome {
            RowOutcome::Stored => self.stored += 1,
            RowOutcome::Skipped { reason } => {
                let key = key.into();
                warn!("Skipped {} row '{}': {}", self.table, key, reason);
                self.skipped.push(SkippedRow { key, reason });
            }
        }
    }

    /// Folds a single row write into the report. Connectivity failures are
    /// handed back to the caller since the rest of the batch cannot proceed.
    pub fn absorb(
        &mut self,
        key: impl Into<String>,
        result: Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        match result {
            Ok(()) => {
                self.record(key, RowOutcome::Stored);
                Ok(())
            }
            Err(StoreError::Persistence { reason, .. }) => {
                self.record(key, RowOutcome::Skipped { reason });
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn total(&self) -> usize {
        self.stored + self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

pub fn summary_headers() -> Vec<String> {
    vec![
        "table".to_string(),
        "stored".to_string(),
        "skipped".to_string(),
    ]
}

pub fn summary_rows(reports: &[BatchReport]) -> Vec<Vec<String>> {
    reports
        .iter()
        .map(|r| {
            vec![
                r.table.clone(),
                r.stored.to_string(),
                r.skipped_count().to_string(),
            ]
        })
        .collect()
}
