//! Typed failures raised by the transformation stages and the store adapters.
//!
//! Transformation stages raise [`SchemaError`], which aborts a run.
//!
//! Store adapters raise [`StoreError`]. `Connectivity` abandons the stage that
//! needed the store. `Persistence` describes a single skipped row and is folded
//! into a batch report by the caller. A failed report query is a `Query`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("required field '{field}' is missing from the input columns")]
    MissingField { field: String },
    #[error("column '{column}' appears more than once after renaming")]
    DuplicateColumn { column: String },
    #[error("duplicate value '{value}' in key field '{field}'")]
    DuplicateKey { field: String, value: String },
    #[error("field '{field}' on data row {row} holds non-numeric value '{value}'")]
    NotNumeric {
        field: String,
        row: usize,
        value: String,
    },
}

impl SchemaError {
    pub fn missing(field: impl Into<String>) -> Self {
        SchemaError::MissingField {
            field: field.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot reach {store}: {source}")]
    Connectivity {
        store: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("{table} row '{key}' was not stored: {reason}")]
    Persistence {
        table: String,
        key: String,
        reason: String,
    },
    #[error("report '{name}' failed: {reason}")]
    Query { name: String, reason: String },
}

impl StoreError {
    pub fn connectivity(
        store: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        StoreError::Connectivity {
            store: store.into(),
            source: source.into(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connectivity { .. })
    }
}
