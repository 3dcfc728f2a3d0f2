//! Execution environment handle.
//!
//! A [`TableEnvironment`] is what [`Stage::load`](crate::Stage::load)
//! receives. It carries the environment configuration, creates tables from
//! rows or CSV files, and owns the [`StageRegistry`] used to reload stages
//! whose concrete type is only known from saved metadata.
//!
//! # Example
//! ```
//! use ml_stages::env::{EnvironmentConfig, TableEnvironment};
//!
//! let env = TableEnvironment::builder()
//!     .config(EnvironmentConfig::default().with_name("training"))
//!     .build();
//! let table = env.table_from_rows(["x"], &[vec![1.0], vec![2.0]]).unwrap();
//! assert_eq!(env.config().name, "training");
//! assert_eq!(table.num_rows(), 2);
//! ```

use crate::error::{Result, StageError};
use crate::pipeline::StageRegistry;
use crate::table::Table;
use crate::traits::{AlgoOperator, Estimator};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// CSV options used by [`TableEnvironment::read_csv`] and
/// [`TableEnvironment::write_csv`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Whether the first record holds column names.
    pub has_headers: bool,
    /// Field delimiter. Must be a single ASCII character.
    pub delimiter: char,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_headers: true,
            delimiter: ',',
        }
    }
}

impl CsvOptions {
    fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(StageError::InvalidParameter(format!(
                "CSV delimiter must be ASCII, got '{}'",
                self.delimiter
            )))
        }
    }
}

/// Configuration for a [`TableEnvironment`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Name reported in logs.
    pub name: String,
    pub csv: CsvOptions,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            csv: CsvOptions::default(),
        }
    }
}

impl EnvironmentConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_csv_headers(mut self, has_headers: bool) -> Self {
        self.csv.has_headers = has_headers;
        self
    }

    pub fn with_csv_delimiter(mut self, delimiter: char) -> Self {
        self.csv.delimiter = delimiter;
        self
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Handle passed to stages when they are loaded.
///
/// Cloning is cheap; clones share the configuration and registry.
#[derive(Clone, Debug)]
pub struct TableEnvironment {
    config: Arc<EnvironmentConfig>,
    registry: Arc<StageRegistry>,
}

impl Default for TableEnvironment {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TableEnvironment {
    pub fn builder() -> TableEnvironmentBuilder {
        TableEnvironmentBuilder::default()
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Create a table from row vectors.
    pub fn table_from_rows<I, S>(&self, names: I, rows: &[Vec<f64>]) -> Result<Table>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Table::from_rows(names, rows)
    }

    /// Read a CSV file of numeric values into a table.
    ///
    /// Without headers, columns are named `c0`, `c1`, ...
    ///
    /// # Errors
    /// Returns [`StageError::Schema`] for fields that are not numbers and
    /// [`StageError::Csv`] for malformed files (including ragged records).
    pub fn read_csv<P: AsRef<Path>>(&self, path: P) -> Result<Table> {
        let path = path.as_ref();
        let options = &self.config.csv;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(options.has_headers)
            .delimiter(options.delimiter_byte()?)
            .from_path(path)?;

        let mut names: Vec<String> = if options.has_headers {
            reader.headers()?.iter().map(|h| h.trim().to_string()).collect()
        } else {
            Vec::new()
        };

        let mut rows = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = record
                .iter()
                .enumerate()
                .map(|(j, field)| {
                    field.trim().parse::<f64>().map_err(|_| {
                        StageError::Schema(format!(
                            "row {} column {}: '{}' is not a number",
                            i, j, field
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            rows.push(row);
        }

        if !options.has_headers {
            let width = rows.first().map_or(0, Vec::len);
            names = (0..width).map(|j| format!("c{}", j)).collect();
        }

        let table = Table::from_rows(names, &rows)?;
        info!(
            env = %self.config.name,
            path = %path.display(),
            rows = table.num_rows(),
            columns = table.num_columns(),
            "read csv"
        );
        Ok(table)
    }

    /// Write a table to a CSV file, with a header row if configured.
    pub fn write_csv<P: AsRef<Path>>(&self, table: &Table, path: P) -> Result<()> {
        let path = path.as_ref();
        let options = &self.config.csv;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter_byte()?)
            .from_path(path)?;

        if options.has_headers {
            writer.write_record(table.schema().names())?;
        }
        for row in table.rows() {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }
        writer.flush()?;
        debug!(env = %self.config.name, path = %path.display(), "wrote csv");
        Ok(())
    }
}

/// Builder for [`TableEnvironment`].
///
/// Starts from the default configuration and a registry holding the
/// built-in pipeline stages.
#[derive(Debug)]
pub struct TableEnvironmentBuilder {
    config: EnvironmentConfig,
    registry: StageRegistry,
}

impl Default for TableEnvironmentBuilder {
    fn default() -> Self {
        Self {
            config: EnvironmentConfig::default(),
            registry: StageRegistry::with_builtin(),
        }
    }
}

impl TableEnvironmentBuilder {
    pub fn config(mut self, config: EnvironmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Make an operator type loadable from pipelines.
    pub fn register_operator<T>(mut self) -> Self
    where
        T: AlgoOperator + Default + 'static,
    {
        self.registry.register_operator::<T>();
        self
    }

    /// Make an estimator type loadable from pipelines.
    pub fn register_estimator<E>(mut self) -> Self
    where
        E: Estimator + Default + 'static,
        E::Model: 'static,
    {
        self.registry.register_estimator::<E>();
        self
    }

    pub fn build(self) -> TableEnvironment {
        info!(
            env = %self.config.name,
            stages = self.registry.len(),
            "created table environment"
        );
        TableEnvironment {
            config: Arc::new(self.config),
            registry: Arc::new(self.registry),
        }
    }
}
