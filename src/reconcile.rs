//! Reassigns districts to regions formed after the census was taken.
//!
//! Matching is exact district-name equality. Names that do not occur in the
//! table are ignored, since a list may cover several dataset versions.
//! Applying the same changes twice leaves the table as the first pass did.

use std::{collections::HashSet, path::Path};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::{debug, info};
use serde::Serialize;

use crate::{
    data::{CensusTable, Value},
    error::SchemaError,
    fields, io_utils,
};

pub const TELANGANA: &str = "Telangana";
pub const LADAKH: &str = "Ladakh";
pub const LADAKH_DISTRICTS: [&str; 2] = ["Leh(Ladakh)", "Kargil"];

/// A newly formed region and the districts it took over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryChange {
    pub region: String,
    pub districts: HashSet<String>,
}

impl BoundaryChange {
    pub fn new<I, S>(region: impl Into<String>, districts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            region: region.into(),
            districts: districts.into_iter().map(Into::into).collect(),
        }
    }

    /// Reads the district list from a newline-delimited file.
    pub fn from_list_file(
        region: impl Into<String>,
        path: &Path,
        encoding: &'static Encoding,
    ) -> Result<Self> {
        let region = region.into();
        let districts = io_utils::read_lines(path, encoding)
            .with_context(|| format!("Loading district list for '{region}'"))?;
        debug!(
            "Loaded {} district name(s) for '{}' from {:?}",
            districts.len(),
            region,
            path
        );
        Ok(Self::new(region, districts))
    }

    pub fn ladakh() -> Self {
        Self::new(LADAKH, LADAKH_DISTRICTS)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    /// Districts whose region actually changed, as (district, from, to).
    pub reassigned: Vec<(String, String, String)>,
    /// Listed district names with no row in the table.
    pub unmatched: Vec<String>,
}

/// Applies `changes` in order. A district named by more than one change ends
/// up in the region of the last one.
pub fn reconcile(
    table: &mut CensusTable,
    changes: &[BoundaryChange],
) -> Result<ReconcileSummary, SchemaError> {
    let district_col = table.require_column(fields::DISTRICT)?;
    let region_col = table.require_column(fields::REGION)?;
    let mut summary = ReconcileSummary::default();

    for change in changes {
        let mut matched = HashSet::new();
        for row in 0..table.len() {
            let Some(district) = table.text(row, district_col).map(|d| d.into_owned()) else {
                continue;
            };
            if !change.districts.contains(&district) {
                continue;
            }
            matched.insert(district.clone());
            let previous = table
                .text(row, region_col)
                .map(|r| r.into_owned())
                .unwrap_or_default();
            if previous == change.region {
                continue;
            }
            table.set(row, region_col, Some(Value::Text(change.region.clone())));
            summary
                .reassigned
                .push((district, previous, change.region.clone()));
        }
        let mut unmatched = change
            .districts
            .iter()
            .filter(|name| !matched.contains(*name))
            .cloned()
            .collect::<Vec<_>>();
        unmatched.sort();
        if !unmatched.is_empty() {
            debug!(
                "{} district name(s) listed for '{}' are not in the table: {:?}",
                unmatched.len(),
                change.region,
                unmatched
            );
        }
        summary.unmatched.extend(unmatched);
    }

    info!(
        "Reassigned {} district(s) across {} boundary change(s)",
        summary.reassigned.len(),
        changes.len()
    );
    Ok(summary)
}
