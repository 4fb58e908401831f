//! Normalized relational store on SQLite.
//!
//! Tables load in dependency order (regions, districts, then the two fact
//! tables), each inside one transaction. Every write is an upsert on the
//! natural key, so loading the same table twice leaves the store unchanged.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::{debug, info, warn};
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter, types};
use uuid::Uuid;

use crate::{
    config::Credentials,
    data::{CensusTable, Value},
    error::StoreError,
    fields,
    persist::{BatchReport, RowOutcome},
};

pub const REGIONS: &str = "regions";
pub const DISTRICTS: &str = "districts";
pub const CENSUS_DATA: &str = "census_data";
pub const HOUSEHOLD_DATA: &str = "household_data";
pub const LOAD_RUNS: &str = "load_runs";

pub const TABLES: [&str; 5] = [REGIONS, DISTRICTS, CENSUS_DATA, HOUSEHOLD_DATA, LOAD_RUNS];

/// A fact table and the canonical measures it carries.
#[derive(Debug, Clone, Copy)]
pub struct FactTable {
    pub name: &'static str,
    pub measures: &'static [&'static str],
}

pub const FACT_TABLES: [FactTable; 2] = [
    FactTable {
        name: CENSUS_DATA,
        measures: fields::CENSUS_MEASURES,
    },
    FactTable {
        name: HOUSEHOLD_DATA,
        measures: fields::HOUSEHOLD_MEASURES,
    },
];

pub fn schema_sql() -> String {
    let mut sql = String::from(
        "PRAGMA foreign_keys = ON;
CREATE TABLE IF NOT EXISTS regions (
    region_id INTEGER PRIMARY KEY AUTOINCREMENT,
    region_name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS districts (
    district_code INTEGER PRIMARY KEY,
    district_name TEXT NOT NULL UNIQUE,
    region_id INTEGER NOT NULL REFERENCES regions(region_id)
);
CREATE TABLE IF NOT EXISTS load_runs (
    run_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    source TEXT NOT NULL,
    rows INTEGER NOT NULL,
    stored INTEGER NOT NULL,
    skipped INTEGER NOT NULL
);
",
    );
    for fact in FACT_TABLES {
        let columns = fact
            .measures
            .iter()
            .map(|m| format!("    {} INTEGER", fields::sql_column(m)))
            .join(",\n");
        sql.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    district_code INTEGER PRIMARY KEY REFERENCES districts(district_code),\n{}\n);\n",
            fact.name, columns
        ));
    }
    sql
}

fn upsert_sql(fact: &FactTable) -> String {
    let columns = fact
        .measures
        .iter()
        .map(|m| fields::sql_column(m))
        .collect::<Vec<_>>();
    let placeholders = (1..=columns.len() + 1).map(|i| format!("?{i}")).join(", ");
    let updates = columns
        .iter()
        .map(|c| format!("{c} = excluded.{c}"))
        .join(", ");
    format!(
        "INSERT INTO {} (district_code, {}) VALUES ({}) ON CONFLICT(district_code) DO UPDATE SET {}",
        fact.name,
        columns.join(", "),
        placeholders,
        updates
    )
}

fn link_error(store: &str, err: rusqlite::Error) -> StoreError {
    StoreError::connectivity(store.to_string(), err)
}

fn row_error(table: &str, key: &str, err: rusqlite::Error) -> StoreError {
    StoreError::Persistence {
        table: table.to_string(),
        key: key.to_string(),
        reason: err.to_string(),
    }
}

fn require_column(table: &CensusTable, name: &str, target: &str) -> Result<usize, StoreError> {
    table
        .require_column(name)
        .map_err(|err| StoreError::Persistence {
            table: target.to_string(),
            key: name.to_string(),
            reason: err.to_string(),
        })
}

pub struct RelationalStore {
    conn: Connection,
    location: String,
}

impl RelationalStore {
    /// Opens (creating when absent) the database file and ensures the schema.
    /// The embedded engine has no accounts, so credentials only identify the
    /// loader in the log.
    pub fn open(path: &Path, credentials: Option<&Credentials>) -> Result<Self, StoreError> {
        let location = format!("relational store {}", path.display());
        if let Some(creds) = credentials {
            if creds.user.trim().is_empty() {
                return Err(StoreError::connectivity(
                    location,
                    "credentials carry an empty user",
                ));
            }
            info!("Opening {} as user '{}'", location, creds.user);
        } else {
            info!("Opening {}", location);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::connectivity(location.clone(), e))?;
        }
        let conn = Connection::open(path).map_err(|e| link_error(&location, e))?;
        Self::with_connection(conn, location)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let location = "relational store :memory:".to_string();
        let conn = Connection::open_in_memory().map_err(|e| link_error(&location, e))?;
        Self::with_connection(conn, location)
    }

    fn with_connection(conn: Connection, location: String) -> Result<Self, StoreError> {
        conn.execute_batch(&schema_sql())
            .map_err(|e| link_error(&location, e))?;
        Ok(Self { conn, location })
    }

    /// Opens an existing database for reading only.
    pub fn open_existing(path: &Path) -> Result<Self, StoreError> {
        let location = format!("relational store {}", path.display());
        if !path.exists() {
            return Err(StoreError::connectivity(location, "database file does not exist"));
        }
        let conn = Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| link_error(&location, e))?;
        Ok(Self { conn, location })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Loads the finalized table. Returns one report per target table.
    pub fn load(&mut self, table: &CensusTable) -> Result<Vec<BatchReport>, StoreError> {
        let (regions, region_ids) = self.upsert_regions(table)?;
        let (districts, stored_codes) = self.upsert_districts(table, &region_ids)?;
        let mut reports = vec![regions, districts];
        for fact in FACT_TABLES {
            reports.push(self.upsert_facts(table, &fact, &stored_codes)?);
        }
        Ok(reports)
    }

    fn upsert_regions(
        &mut self,
        table: &CensusTable,
    ) -> Result<(BatchReport, HashMap<String, i64>), StoreError> {
        let region_col = require_column(table, fields::REGION, REGIONS)?;
        let names = (0..table.len())
            .filter_map(|row| table.text(row, region_col).map(|r| r.into_owned()))
            .unique()
            .collect::<Vec<_>>();
        let store = self.location.clone();
        let mut report = BatchReport::new(REGIONS);

        let tx = self.conn.transaction().map_err(|e| link_error(&store, e))?;
        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO regions (region_name) VALUES (?1) ON CONFLICT(region_name) DO NOTHING",
                )
                .map_err(|e| link_error(&store, e))?;
            for name in &names {
                let result = insert
                    .execute(params![name])
                    .map(|_| ())
                    .map_err(|e| row_error(REGIONS, name, e));
                report.absorb(name.as_str(), result)?;
            }
        }
        let ids = region_ids(&tx).map_err(|e| link_error(&store, e))?;
        tx.commit().map_err(|e| link_error(&store, e))?;
        debug!("{} region(s) known after upsert", ids.len());
        Ok((report, ids))
    }

    fn upsert_districts(
        &mut self,
        table: &CensusTable,
        region_ids: &HashMap<String, i64>,
    ) -> Result<(BatchReport, HashSet<i64>), StoreError> {
        let code_col = require_column(table, fields::DISTRICT_CODE, DISTRICTS)?;
        let name_col = require_column(table, fields::DISTRICT, DISTRICTS)?;
        let region_col = require_column(table, fields::REGION, DISTRICTS)?;
        let store = self.location.clone();
        let mut report = BatchReport::new(DISTRICTS);
        let mut stored = HashSet::new();

        let tx = self.conn.transaction().map_err(|e| link_error(&store, e))?;
        {
            let mut insert = tx
                .prepare(
                    "INSERT INTO districts (district_code, district_name, region_id) VALUES (?1, ?2, ?3)
                     ON CONFLICT(district_code) DO UPDATE SET
                        district_name = excluded.district_name,
                        region_id = excluded.region_id",
                )
                .map_err(|e| link_error(&store, e))?;
            for row in 0..table.len() {
                let key = row_key(table, row, code_col);
                let Ok(Some(code)) = table.count(row, code_col) else {
                    report.record(key, skipped(format!("no usable {}", fields::DISTRICT_CODE)));
                    continue;
                };
                let Some(name) = table.text(row, name_col) else {
                    report.record(key, skipped(format!("missing {}", fields::DISTRICT)));
                    continue;
                };
                let Some(region_id) = table
                    .text(row, region_col)
                    .and_then(|region| region_ids.get(region.as_ref()).copied())
                else {
                    report.record(key, skipped("region was not stored".to_string()));
                    continue;
                };
                let result = insert
                    .execute(params![code, name.as_ref(), region_id])
                    .map(|_| ())
                    .map_err(|e| row_error(DISTRICTS, &key, e));
                let was_ok = result.is_ok();
                report.absorb(key, result)?;
                if was_ok {
                    stored.insert(code);
                }
            }
        }
        tx.commit().map_err(|e| link_error(&store, e))?;
        Ok((report, stored))
    }

    fn upsert_facts(
        &mut self,
        table: &CensusTable,
        fact: &FactTable,
        stored_codes: &HashSet<i64>,
    ) -> Result<BatchReport, StoreError> {
        let code_col = require_column(table, fields::DISTRICT_CODE, fact.name)?;
        let columns = fact
            .measures
            .iter()
            .map(|m| (*m, table.column_index(m)))
            .collect::<Vec<_>>();
        let absent = columns
            .iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(m, _)| *m)
            .collect::<Vec<_>>();
        if !absent.is_empty() {
            warn!(
                "{} column(s) of {} are absent from the input and will be stored as NULL: {}",
                absent.len(),
                fact.name,
                absent.join(", ")
            );
        }

        let store = self.location.clone();
        let mut report = BatchReport::new(fact.name);
        let tx = self.conn.transaction().map_err(|e| link_error(&store, e))?;
        {
            let mut insert = tx
                .prepare(&upsert_sql(fact))
                .map_err(|e| link_error(&store, e))?;
            for row in 0..table.len() {
                let key = row_key(table, row, code_col);
                let code = match table.count(row, code_col) {
                    Ok(Some(code)) if stored_codes.contains(&code) => code,
                    _ => {
                        report.record(key, skipped("district was not stored".to_string()));
                        continue;
                    }
                };
                let values = match measure_values(table, row, code, &columns) {
                    Ok(values) => values,
                    Err(reason) => {
                        report.record(key, skipped(reason));
                        continue;
                    }
                };
                let result = insert
                    .execute(params_from_iter(values.iter()))
                    .map(|_| ())
                    .map_err(|e| row_error(fact.name, &key, e));
                report.absorb(key, result)?;
            }
        }
        tx.commit().map_err(|e| link_error(&store, e))?;
        Ok(report)
    }

    /// Appends an audit row for one load and returns its id.
    pub fn record_run(
        &self,
        started_at: DateTime<Utc>,
        source: &str,
        rows: usize,
        reports: &[BatchReport],
    ) -> Result<Uuid, StoreError> {
        let run_id = Uuid::new_v4();
        let stored: usize = reports.iter().map(|r| r.stored).sum();
        let skipped: usize = reports.iter().map(BatchReport::skipped_count).sum();
        self.conn
            .execute(
                "INSERT INTO load_runs (run_id, started_at, source, rows, stored, skipped)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    run_id.to_string(),
                    started_at.to_rfc3339(),
                    source,
                    rows as i64,
                    stored as i64,
                    skipped as i64
                ],
            )
            .map_err(|e| row_error(LOAD_RUNS, &run_id.to_string(), e))?;
        info!("Recorded load run {run_id}");
        Ok(run_id)
    }

    pub fn row_count(&self, table: &str) -> Result<i64, StoreError> {
        if !TABLES.contains(&table) {
            return Err(StoreError::Persistence {
                table: table.to_string(),
                key: String::new(),
                reason: "unknown table".to_string(),
            });
        }
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .map_err(|e| link_error(&self.location, e))
    }

    pub fn region_of(&self, district_code: i64) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row(
                "SELECT r.region_name FROM districts d JOIN regions r ON r.region_id = d.region_id
                 WHERE d.district_code = ?1",
                params![district_code],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| link_error(&self.location, e))
    }
}

fn region_ids(tx: &Transaction<'_>) -> rusqlite::Result<HashMap<String, i64>> {
    let mut stmt = tx.prepare("SELECT region_name, region_id FROM regions")?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    rows.collect()
}

fn row_key(table: &CensusTable, row: usize, code_col: usize) -> String {
    table
        .text(row, code_col)
        .map(|c| c.into_owned())
        .unwrap_or_else(|| format!("row {}", row + 1))
}

fn skipped(reason: String) -> RowOutcome {
    RowOutcome::Skipped { reason }
}

fn measure_values(
    table: &CensusTable,
    row: usize,
    code: i64,
    columns: &[(&str, Option<usize>)],
) -> Result<Vec<types::Value>, String> {
    let mut values = Vec::with_capacity(columns.len() + 1);
    values.push(types::Value::Integer(code));
    for (measure, idx) in columns {
        let value = match idx.and_then(|i| table.get(row, i)) {
            None => types::Value::Null,
            Some(Value::Integer(i)) => types::Value::Integer(*i),
            Some(Value::Float(f)) => types::Value::Real(*f),
            Some(Value::Text(text)) => {
                return Err(format!("non-numeric {measure} value '{text}'"));
            }
        };
        values.push(value);
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[(i64, &str, &str, Option<i64>)]) -> CensusTable {
        CensusTable::with_rows(
            vec![
                fields::DISTRICT_CODE.to_string(),
                fields::DISTRICT.to_string(),
                fields::REGION.to_string(),
                fields::POPULATION.to_string(),
            ],
            rows.iter()
                .map(|(code, district, region, population)| {
                    vec![
                        Some(Value::Integer(*code)),
                        Some(Value::Text(district.to_string())),
                        Some(Value::Text(region.to_string())),
                        population.map(Value::Integer),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn schema_declares_every_measure_column() {
        let sql = schema_sql();
        assert!(sql.contains("married_couples_5_households INTEGER"));
        assert!(sql.contains("power_parity_above_rs_545000 INTEGER"));
        assert!(sql.contains("region_name TEXT NOT NULL UNIQUE"));
    }

    #[test]
    fn shared_region_is_stored_once() {
        let mut store = RelationalStore::open_in_memory().unwrap();
        let input = table(&[
            (588, "Thiruvananthapuram", "Kerala", Some(3301427)),
            (583, "Ernakulam", "Kerala", Some(3282388)),
        ]);
        let reports = store.load(&input).unwrap();
        assert_eq!(store.row_count(REGIONS).unwrap(), 1);
        assert_eq!(store.row_count(DISTRICTS).unwrap(), 2);
        assert_eq!(store.row_count(CENSUS_DATA).unwrap(), 2);
        assert!(reports.iter().all(BatchReport::is_clean));
    }

    #[test]
    fn missing_measures_are_stored_as_null() {
        let mut store = RelationalStore::open_in_memory().unwrap();
        store
            .load(&table(&[(1, "Kupwara", "Jammu and Kashmir", None)]))
            .unwrap();
        let population: Option<i64> = store
            .connection()
            .query_row(
                "SELECT population FROM census_data WHERE district_code = 1",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(population, None);
    }

    #[test]
    fn reload_moves_district_to_new_region() {
        let mut store = RelationalStore::open_in_memory().unwrap();
        store
            .load(&table(&[(536, "Hyderabad", "Andhra Pradesh", Some(10))]))
            .unwrap();
        store
            .load(&table(&[(536, "Hyderabad", "Telangana", Some(10))]))
            .unwrap();
        assert_eq!(store.row_count(DISTRICTS).unwrap(), 1);
        assert_eq!(store.region_of(536).unwrap().as_deref(), Some("Telangana"));
    }

    #[test]
    fn text_in_measure_skips_only_that_fact_row() {
        let mut store = RelationalStore::open_in_memory().unwrap();
        let mut input = table(&[
            (1, "Kupwara", "Jammu and Kashmir", Some(5)),
            (2, "Badgam", "Jammu and Kashmir", Some(6)),
        ]);
        input.set(1, 3, Some(Value::Text("unknown".into())));
        let reports = store.load(&input).unwrap();
        let census = reports.iter().find(|r| r.table == CENSUS_DATA).unwrap();
        assert_eq!(census.stored, 1);
        assert_eq!(census.skipped[0].key, "2");
        assert_eq!(store.row_count(DISTRICTS).unwrap(), 2);
    }

    #[test]
    fn load_run_is_recorded() {
        let store = RelationalStore::open_in_memory().unwrap();
        let mut report = BatchReport::new(REGIONS);
        report.record("Kerala", RowOutcome::Stored);
        store
            .record_run(Utc::now(), "census_2011.csv", 1, &[report])
            .unwrap();
        assert_eq!(store.row_count(LOAD_RUNS).unwrap(), 1);
    }

    #[test]
    fn unknown_table_is_rejected() {
        let store = RelationalStore::open_in_memory().unwrap();
        assert!(store.row_count("sqlite_master; DROP TABLE regions").is_err());
    }
}
