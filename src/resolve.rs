//! Missing-value resolution for the additive field triples.
//!
//! Each triple `(total, part_a, part_b)` gets exactly one pass, in this order:
//!
//! 1. a missing `total` becomes `part_a + part_b` when both parts are present;
//! 2. a missing `part_a` becomes `total - part_b`;
//! 3. a missing `part_b` becomes `total - part_a`.
//!
//! Later steps see values filled by earlier ones. Present values are never
//! overwritten. Rows with two or more fields of a triple missing stay partly
//! unresolved: the pass does not iterate to a fixed point. A sum or difference
//! that overflows `i64` leaves the cell missing.

use log::{info, warn};
use serde::Serialize;

use crate::{
    data::{CensusTable, Value},
    error::SchemaError,
    fields::{self, Triple},
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMissingness {
    pub field: String,
    pub before_percent: f64,
    pub after_percent: f64,
    pub filled: usize,
}

/// Before/after missingness for the tracked fields. Informational only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MissingnessReport {
    pub rows: usize,
    pub fields: Vec<FieldMissingness>,
}

impl MissingnessReport {
    pub fn field(&self, name: &str) -> Option<&FieldMissingness> {
        self.fields.iter().find(|f| f.field == name)
    }

    pub fn table_headers() -> Vec<String> {
        vec![
            "field".to_string(),
            "Missing_data_before(%)".to_string(),
            "Missing_data_after(%)".to_string(),
            "filled".to_string(),
        ]
    }

    pub fn table_rows(&self) -> Vec<Vec<String>> {
        self.fields
            .iter()
            .map(|f| {
                vec![
                    f.field.clone(),
                    format!("{:.2}", f.before_percent),
                    format!("{:.2}", f.after_percent),
                    f.filled.to_string(),
                ]
            })
            .collect()
    }
}

/// Percentage of rows where `column` is missing. Zero for an empty table.
pub fn missing_percent(table: &CensusTable, column: usize) -> f64 {
    if table.is_empty() {
        return 0.0;
    }
    table.missing_count(column) as f64 / table.len() as f64 * 100.0
}

#[derive(Debug, Clone, Copy)]
struct TripleColumns {
    total: usize,
    part_a: usize,
    part_b: usize,
}

impl TripleColumns {
    fn locate(table: &CensusTable, triple: &Triple) -> Result<Self, SchemaError> {
        Ok(Self {
            total: table.require_column(triple.total)?,
            part_a: table.require_column(triple.part_a)?,
            part_b: table.require_column(triple.part_b)?,
        })
    }
}

/// Fill counts per field, in triple order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillCounts {
    pub counts: Vec<(&'static str, usize)>,
}

impl FillCounts {
    pub fn get(&self, field: &str) -> usize {
        self.counts
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    fn bump(&mut self, field: &'static str) {
        match self.counts.iter_mut().find(|(name, _)| *name == field) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((field, 1)),
        }
    }
}

/// Runs one pass per triple over `table` in place.
pub fn fill_triples(table: &mut CensusTable, triples: &[Triple]) -> Result<FillCounts, SchemaError> {
    let located = triples
        .iter()
        .map(|t| TripleColumns::locate(table, t).map(|cols| (t, cols)))
        .collect::<Result<Vec<_>, _>>()?;
    let mut counts = FillCounts::default();

    for (triple, cols) in located {
        // Rule 1: total from both parts.
        for row in 0..table.len() {
            if table.get(row, cols.total).is_some() {
                continue;
            }
            if let (Some(a), Some(b)) = (table.count(row, cols.part_a)?, table.count(row, cols.part_b)?) {
                match a.checked_add(b) {
                    Some(total) => {
                        table.set(row, cols.total, Some(Value::Integer(total)));
                        counts.bump(triple.total);
                    }
                    None => overflowed(triple.total, row),
                }
            }
        }
        // Rule 2: part_a from total.
        for row in 0..table.len() {
            if table.get(row, cols.part_a).is_some() {
                continue;
            }
            if let (Some(total), Some(b)) = (table.count(row, cols.total)?, table.count(row, cols.part_b)?) {
                match total.checked_sub(b) {
                    Some(a) => {
                        table.set(row, cols.part_a, Some(Value::Integer(a)));
                        counts.bump(triple.part_a);
                    }
                    None => overflowed(triple.part_a, row),
                }
            }
        }
        // Rule 3: part_b from total.
        for row in 0..table.len() {
            if table.get(row, cols.part_b).is_some() {
                continue;
            }
            if let (Some(total), Some(a)) = (table.count(row, cols.total)?, table.count(row, cols.part_a)?) {
                match total.checked_sub(a) {
                    Some(b) => {
                        table.set(row, cols.part_b, Some(Value::Integer(b)));
                        counts.bump(triple.part_b);
                    }
                    None => overflowed(triple.part_b, row),
                }
            }
        }
    }
    Ok(counts)
}

fn overflowed(field: &str, row: usize) {
    warn!("Row {}: derived '{}' overflows, left missing", row + 1, field);
}

/// Resolves the standard triples and reports missingness of the tracked fields.
pub fn resolve_missing(table: &mut CensusTable) -> Result<MissingnessReport, SchemaError> {
    let tracked = fields::TRACKED_FIELDS
        .iter()
        .map(|name| table.require_column(name).map(|idx| (*name, idx)))
        .collect::<Result<Vec<_>, _>>()?;
    let before = tracked
        .iter()
        .map(|(_, idx)| missing_percent(table, *idx))
        .collect::<Vec<_>>();

    let counts = fill_triples(table, &fields::TRIPLES)?;

    let report = MissingnessReport {
        rows: table.len(),
        fields: tracked
            .iter()
            .zip(before)
            .map(|((name, idx), before_percent)| FieldMissingness {
                field: name.to_string(),
                before_percent,
                after_percent: missing_percent(table, *idx),
                filled: counts.get(name),
            })
            .collect(),
    };
    let filled: usize = counts.counts.iter().map(|(_, n)| n).sum();
    info!(
        "Filled {} missing cell(s) across {} row(s)",
        filled,
        table.len()
    );
    Ok(report)
}
