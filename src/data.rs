use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_display(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s.as_str()),
            Value::Integer(i) => Cow::Owned(i.to_string()),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    Cow::Owned((*f as i64).to_string())
                } else {
                    Cow::Owned(f.to_string())
                }
            }
        }
    }

    /// Whole-number view used by the count arithmetic. Spreadsheets hand every
    /// number over as a float, so whole floats count as integers.
    pub fn as_count(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() && f.abs() < 9.0e15 => {
                Some(*f as i64)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

/// Types a raw text cell. Empty cells and the usual missing markers become `None`.
pub fn parse_cell(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_missing_marker(trimmed) {
        return None;
    }
    if let Ok(parsed) = trimmed.parse::<i64>() {
        return Some(Value::Integer(parsed));
    }
    if let Ok(parsed) = trimmed.parse::<f64>()
        && parsed.is_finite()
    {
        return Some(float_value(parsed));
    }
    Some(Value::Text(trimmed.to_string()))
}

pub fn float_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Value::Integer(value as i64)
    } else {
        Value::Float(value)
    }
}

fn is_missing_marker(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "nan" | "na" | "n/a" | "null" | "none"
    )
}

pub type Row = Vec<Option<Value>>;

/// One district per row, columns addressed by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CensusTable {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl CensusTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(headers: Vec<String>, rows: Vec<Row>) -> Self {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    /// Appends a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Row) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, SchemaError> {
        self.column_index(name)
            .ok_or_else(|| SchemaError::missing(name))
    }

    pub fn rename_column(&mut self, index: usize, name: impl Into<String>) {
        if let Some(header) = self.headers.get_mut(index) {
            *header = name.into();
        }
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row)?.get(column)?.as_ref()
    }

    pub fn set(&mut self, row: usize, column: usize, value: Option<Value>) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value;
        }
    }

    pub fn text(&self, row: usize, column: usize) -> Option<Cow<'_, str>> {
        self.get(row, column).map(Value::as_display)
    }

    pub fn missing_count(&self, column: usize) -> usize {
        self.rows
            .iter()
            .filter(|row| row.get(column).is_none_or(Option::is_none))
            .count()
    }

    /// Reads a cell as a count, rejecting text in a numeric field.
    pub fn count(&self, row: usize, column: usize) -> Result<Option<i64>, SchemaError> {
        match self.get(row, column) {
            None => Ok(None),
            Some(value) => value
                .as_count()
                .map(Some)
                .ok_or_else(|| SchemaError::NotNumeric {
                    field: self.headers[column].clone(),
                    row: row + 1,
                    value: value.to_string(),
                }),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = Record<'_>> {
        self.rows.iter().map(|cells| Record {
            headers: &self.headers,
            cells,
        })
    }
}

/// Borrowed view of one row with label lookup.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    headers: &'a [String],
    cells: &'a [Option<Value>],
}

impl<'a> Record<'a> {
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        let idx = self.headers.iter().position(|h| h == name)?;
        self.cells.get(idx)?.as_ref()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'a str, Option<&'a Value>)> + 'a {
        self.headers
            .iter()
            .zip(self.cells.iter())
            .map(|(h, c)| (h.as_str(), c.as_ref()))
    }
}
