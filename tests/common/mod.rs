#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use census_etl::data::{CensusTable, Value};
use census_etl::fields;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

/// One district with the key fields and the population triple.
pub struct District<'a> {
    pub code: i64,
    pub name: &'a str,
    pub region: &'a str,
    pub population: Option<i64>,
    pub male: Option<i64>,
    pub female: Option<i64>,
}

impl<'a> District<'a> {
    pub fn new(code: i64, name: &'a str, region: &'a str) -> Self {
        Self {
            code,
            name,
            region,
            population: Some(100),
            male: Some(60),
            female: Some(40),
        }
    }

    pub fn population(mut self, total: Option<i64>, male: Option<i64>, female: Option<i64>) -> Self {
        self.population = total;
        self.male = male;
        self.female = female;
        self
    }
}

/// Canonical table carrying every required field. Fields other than the key
/// columns and the population triple are filled with consistent counts.
pub fn canonical_table(districts: &[District<'_>]) -> CensusTable {
    let headers = fields::REQUIRED_FIELDS
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>();
    let rows = districts
        .iter()
        .map(|d| {
            let count = |v: i64| Some(Value::Integer(v));
            vec![
                count(d.code),
                Some(Value::Text(d.region.to_string())),
                Some(Value::Text(d.name.to_string())),
                d.population.map(Value::Integer),
                d.male.map(Value::Integer),
                d.female.map(Value::Integer),
                count(50),
                count(30),
                count(20),
                count(10),
                count(6),
                count(4),
            ]
        })
        .collect();
    CensusTable::with_rows(headers, rows)
}

pub fn column(table: &CensusTable, name: &str) -> usize {
    table
        .column_index(name)
        .unwrap_or_else(|| panic!("column {name} present"))
}
