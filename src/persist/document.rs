//! Schema-less document store: one JSON document per district.

use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use log::{debug, info};
use serde_json::{Map, Value as JsonValue};
use uuid::Uuid;

use crate::{
    data::{CensusTable, Record, Value},
    error::StoreError,
    fields,
    persist::{BatchReport, RowOutcome},
};

pub type Document = Map<String, JsonValue>;

pub const ID_FIELD: &str = "_id";

pub trait DocumentStore {
    /// Replaces the collection with one document per record.
    fn replace_all(&mut self, table: &CensusTable) -> Result<BatchReport, StoreError>;

    fn fetch_all(&self) -> Result<Vec<Document>, StoreError>;
}

/// Stable document id derived from the district code, so reloading a
/// district replaces its previous document.
pub fn document_id(district_code: i64) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, district_code.to_string().as_bytes())
}

pub fn to_document(record: &Record<'_>) -> Result<Document, String> {
    let code = record
        .get(fields::DISTRICT_CODE)
        .and_then(Value::as_count)
        .ok_or_else(|| format!("missing {}", fields::DISTRICT_CODE))?;
    let mut doc = Map::new();
    doc.insert(
        ID_FIELD.to_string(),
        JsonValue::String(document_id(code).to_string()),
    );
    for (field, value) in record.fields() {
        if field.is_empty() {
            continue;
        }
        let json = match value {
            None => JsonValue::Null,
            Some(v) => serde_json::to_value(v).map_err(|e| e.to_string())?,
        };
        doc.insert(field.to_string(), json);
    }
    Ok(doc)
}

/// JSON Lines file acting as a single collection.
#[derive(Debug, Clone)]
pub struct JsonLinesStore {
    path: PathBuf,
}

impl JsonLinesStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                StoreError::connectivity(format!("document store {}", path.display()), e)
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_name(&self) -> String {
        format!("document store {}", self.path.display())
    }

    fn write_staged(&self, staging: &Path, table: &CensusTable) -> Result<BatchReport, StoreError> {
        let file =
            File::create(staging).map_err(|e| StoreError::connectivity(self.store_name(), e))?;
        let mut writer = BufWriter::new(file);
        let mut report = BatchReport::new("documents");

        for (idx, record) in table.records().enumerate() {
            let key = record
                .get(fields::DISTRICT_CODE)
                .map(|v| v.to_string())
                .unwrap_or_else(|| format!("row {}", idx + 1));
            let outcome = match to_document(&record) {
                Ok(doc) => {
                    serde_json::to_writer(&mut writer, &doc)
                        .map_err(|e| StoreError::connectivity(self.store_name(), e))?;
                    writer
                        .write_all(b"\n")
                        .map_err(|e| StoreError::connectivity(self.store_name(), e))?;
                    RowOutcome::Stored
                }
                Err(reason) => RowOutcome::Skipped { reason },
            };
            report.record(key, outcome);
        }
        writer
            .flush()
            .map_err(|e| StoreError::connectivity(self.store_name(), e))?;
        Ok(report)
    }
}

impl DocumentStore for JsonLinesStore {
    fn replace_all(&mut self, table: &CensusTable) -> Result<BatchReport, StoreError> {
        let staging = self.path.with_extension("jsonl.partial");
        let written = self.write_staged(&staging, table).and_then(|report| {
            fs::rename(&staging, &self.path)
                .map_err(|e| StoreError::connectivity(self.store_name(), e))?;
            Ok(report)
        });
        match written {
            Ok(report) => {
                info!(
                    "Wrote {} document(s) to {}",
                    report.stored,
                    self.path.display()
                );
                Ok(report)
            }
            Err(err) => {
                if let Err(e) = fs::remove_file(&staging) {
                    debug!("Could not remove {}: {}", staging.display(), e);
                }
                Err(err)
            }
        }
    }

    fn fetch_all(&self) -> Result<Vec<Document>, StoreError> {
        let file =
            File::open(&self.path).map_err(|e| StoreError::connectivity(self.store_name(), e))?;
        let mut documents = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| StoreError::connectivity(self.store_name(), e))?;
            if line.trim().is_empty() {
                continue;
            }
            let doc: Document =
                serde_json::from_str(&line).map_err(|e| StoreError::Persistence {
                    table: "documents".to_string(),
                    key: format!("line {}", idx + 1),
                    reason: e.to_string(),
                })?;
            documents.push(doc);
        }
        Ok(documents)
    }
}
