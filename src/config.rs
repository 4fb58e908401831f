//! Pipeline configuration: an optional YAML file layered under CLI flags.

use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::{
    io_utils,
    reconcile::{self, BoundaryChange},
};

pub const DEFAULT_NEW_REGION_LIST: &str = "Telangana.txt";
pub const DEFAULT_DOCUMENTS: &str = "census_db/census.jsonl";
pub const DEFAULT_DATABASE: &str = "census_db/census.sqlite";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub input: Option<PathBuf>,
    pub sheet: Option<String>,
    pub input_encoding: Option<String>,
    /// Extra raw label to canonical label entries merged over the built-in mapping.
    pub label_overrides: BTreeMap<String, String>,
    /// Replaces the default Telangana and Ladakh changes when present.
    pub boundary_changes: Option<Vec<BoundaryChangeConfig>>,
    pub stores: StoreConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoundaryChangeConfig {
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub districts_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub districts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub documents: PathBuf,
    pub database: PathBuf,
    pub credentials: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            documents: PathBuf::from(DEFAULT_DOCUMENTS),
            database: PathBuf::from(DEFAULT_DATABASE),
            credentials: None,
        }
    }
}

impl PipelineConfig {
    /// Loads a YAML config. Relative paths inside it resolve against the
    /// directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let mut config: PipelineConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() && !io_utils::is_dash(p) {
                *p = base.join(&*p);
            }
        };
        if let Some(input) = self.input.as_mut() {
            join(input);
        }
        join(&mut self.stores.documents);
        join(&mut self.stores.database);
        if let Some(credentials) = self.stores.credentials.as_mut() {
            join(credentials);
        }
        for change in self.boundary_changes.iter_mut().flatten() {
            if let Some(file) = change.districts_file.as_mut() {
                join(file);
            }
        }
    }

    pub fn boundary_change_configs(&self) -> Vec<BoundaryChangeConfig> {
        self.boundary_changes.clone().unwrap_or_else(|| {
            vec![
                BoundaryChangeConfig {
                    region: reconcile::TELANGANA.to_string(),
                    districts_file: Some(PathBuf::from(DEFAULT_NEW_REGION_LIST)),
                    districts: Vec::new(),
                },
                BoundaryChangeConfig {
                    region: reconcile::LADAKH.to_string(),
                    districts_file: None,
                    districts: reconcile::LADAKH_DISTRICTS
                        .iter()
                        .map(|d| d.to_string())
                        .collect(),
                },
            ]
        })
    }

    /// Resolves the configured boundary changes. `list_override` replaces the
    /// list file of the first file-backed change.
    pub fn boundary_changes(
        &self,
        list_override: Option<&Path>,
        encoding: &'static Encoding,
    ) -> Result<Vec<BoundaryChange>> {
        let mut configs = self.boundary_change_configs();
        if let Some(path) = list_override {
            match configs.iter_mut().find(|c| c.districts_file.is_some()) {
                Some(change) => change.districts_file = Some(path.to_path_buf()),
                None => bail!("No boundary change reads a district list file to override"),
            }
        }
        configs
            .iter()
            .map(|change| {
                let mut resolved = match &change.districts_file {
                    Some(path) => BoundaryChange::from_list_file(&change.region, path, encoding)?,
                    None => BoundaryChange::new(&change.region, Vec::<String>::new()),
                };
                resolved.districts.extend(change.districts.iter().cloned());
                Ok(resolved)
            })
            .collect()
    }
}

/// Relational store login, read from a `key: value` file.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading credentials file {path:?}"))?;
        Self::parse(&text).with_context(|| format!("Parsing credentials file {path:?}"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| anyhow!("Line {} is not a 'key: value' pair", idx + 1))?;
            entries.insert(key.trim().to_string(), value.trim().to_string());
        }
        let mut take = |key: &str| {
            entries
                .remove(key)
                .ok_or_else(|| anyhow!("Missing '{key}' entry"))
        };
        Ok(Self {
            user: take("user")?,
            password: take("password")?,
        })
    }
}
