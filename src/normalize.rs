//! Schema normalization: raw labels to canonical field names, and region
//! names to a single casing and conjunction style.

use std::{
    borrow::Cow,
    collections::{BTreeMap, HashSet},
    sync::OnceLock,
};

use log::{debug, info};
use regex::{Captures, Regex};

use crate::{
    data::{CensusTable, Value},
    error::SchemaError,
    fields,
};

/// Raw label to canonical label pairs, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMapping {
    entries: Vec<(String, String)>,
}

impl Default for LabelMapping {
    fn default() -> Self {
        Self {
            entries: fields::LABEL_MAPPING
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }
}

impl LabelMapping {
    /// Built-in mapping with `overrides` layered on top. An override for an
    /// existing raw label replaces its target.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut mapping = Self::default();
        for (from, to) in overrides {
            match mapping.entries.iter_mut().find(|(raw, _)| raw == from) {
                Some(entry) => entry.1 = to.clone(),
                None => mapping.entries.push((from.clone(), to.clone())),
            }
        }
        mapping
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn canonical_for(&self, raw: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(from, _)| from == raw)
            .map(|(_, to)| to.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameSummary {
    pub renamed: Vec<(String, String)>,
}

/// Renames every mapped label and checks the canonical fields downstream
/// stages depend on are present.
pub fn rename_columns(
    table: &mut CensusTable,
    mapping: &LabelMapping,
) -> Result<RenameSummary, SchemaError> {
    let mut summary = RenameSummary::default();
    for idx in 0..table.headers().len() {
        let raw = table.headers()[idx].clone();
        if let Some(canonical) = mapping.canonical_for(&raw)
            && canonical != raw
        {
            debug!("Renaming column '{raw}' -> '{canonical}'");
            table.rename_column(idx, canonical);
            summary.renamed.push((raw, canonical.to_string()));
        }
    }

    let mut seen = HashSet::new();
    for header in table.headers() {
        if !header.is_empty() && !seen.insert(header.as_str()) {
            return Err(SchemaError::DuplicateColumn {
                column: header.clone(),
            });
        }
    }
    for field in fields::REQUIRED_FIELDS {
        table.require_column(field)?;
    }
    info!("Renamed {} column(s) to canonical names", summary.renamed.len());
    Ok(summary)
}

fn word_pattern() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"\p{L}+").expect("word pattern compiles"))
}

/// Upper-cases the first letter of every run of letters and lower-cases the rest.
pub fn title_case(value: &str) -> Cow<'_, str> {
    word_pattern().replace_all(value, |caps: &Captures<'_>| {
        let word = &caps[0];
        let mut chars = word.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect::<String>(),
            None => String::new(),
        }
    })
}

/// Title-cases a region name and joins multi-word names with a lowercase " and ".
pub fn normalize_region_name(value: &str) -> String {
    title_case(value).replace(" And ", " and ")
}

/// Normalizes every region value in place and returns how many changed.
pub fn normalize_regions(table: &mut CensusTable) -> Result<usize, SchemaError> {
    let column = table.require_column(fields::REGION)?;
    let mut changed = 0usize;
    for row in 0..table.len() {
        let Some(current) = table.text(row, column).map(|t| t.into_owned()) else {
            continue;
        };
        let normalized = normalize_region_name(&current);
        if normalized != current {
            changed += 1;
        }
        table.set(row, column, Some(Value::Text(normalized)));
    }
    info!("Normalized {changed} region name(s)");
    Ok(changed)
}

/// Every district must carry a unique integer code.
pub fn validate_district_codes(table: &CensusTable) -> Result<(), SchemaError> {
    let column = table.require_column(fields::DISTRICT_CODE)?;
    let mut seen = HashSet::with_capacity(table.len());
    for row in 0..table.len() {
        let code = table.count(row, column)?.ok_or_else(|| SchemaError::NotNumeric {
            field: fields::DISTRICT_CODE.to_string(),
            row: row + 1,
            value: String::new(),
        })?;
        if !seen.insert(code) {
            return Err(SchemaError::DuplicateKey {
                field: fields::DISTRICT_CODE.to_string(),
                value: code.to_string(),
            });
        }
    }
    Ok(())
}

/// Full normalizer: labels, region names, district code keys.
pub fn normalize(
    table: &mut CensusTable,
    mapping: &LabelMapping,
) -> Result<RenameSummary, SchemaError> {
    let summary = rename_columns(table, mapping)?;
    normalize_regions(table)?;
    validate_district_codes(table)?;
    Ok(summary)
}
