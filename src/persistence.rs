//! On-disk layout of saved stages.
//!
//! A saved stage is a directory:
//!
//! ```text
//! <path>/metadata          JSON: stage name, save time, parameters, extras
//! <path>/data/tables.bin   bincode-encoded model data tables (optional)
//! <path>/stages/<i>        nested stages, e.g. the members of a pipeline
//! ```
//!
//! The metadata file is the marker of a saved stage: saving refuses to
//! overwrite an existing one, and loading fails with
//! [`StageError::NotFound`] when it is missing.

use crate::error::{Result, StageError};
use crate::param::ParamMap;
use crate::table::Table;
use crate::traits::Stage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

pub const METADATA_FILE: &str = "metadata";
pub const DATA_DIR: &str = "data";
pub const STAGES_DIR: &str = "stages";
const MODEL_DATA_FILE: &str = "tables.bin";

/// Contents of a stage's metadata file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageMetadata {
    /// [`Stage::stage_name`] of the saved stage.
    pub stage_name: String,
    /// Milliseconds since the Unix epoch at save time.
    pub timestamp_ms: u64,
    pub params: ParamMap,
    /// Stage-specific fields, e.g. the number of nested stages.
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// Write the metadata of `stage` to `path`, creating the directory.
///
/// # Errors
/// Returns [`StageError::AlreadyExists`] if a stage was already saved at
/// `path`.
pub fn save_metadata<S>(stage: &S, path: &Path, extra: Option<Map<String, Value>>) -> Result<()>
where
    S: Stage + ?Sized,
{
    let file = path.join(METADATA_FILE);
    if file.exists() {
        return Err(StageError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    fs::create_dir_all(path)?;

    let metadata = StageMetadata {
        stage_name: stage.stage_name().to_string(),
        timestamp_ms: now_ms(),
        params: stage.param_map().clone(),
        extra: extra.unwrap_or_default(),
    };
    fs::write(&file, serde_json::to_vec_pretty(&metadata)?)?;

    info!(
        stage = %metadata.stage_name,
        path = %path.display(),
        "saved stage metadata"
    );
    Ok(())
}

/// Read the metadata saved at `path`.
///
/// When `expected_name` is given, the saved stage must have that name.
pub fn load_metadata(path: &Path, expected_name: Option<&str>) -> Result<StageMetadata> {
    let bytes = read_or_not_found(&path.join(METADATA_FILE), path)?;
    let metadata: StageMetadata = serde_json::from_slice(&bytes)?;

    if let Some(expected) = expected_name {
        if metadata.stage_name != expected {
            return Err(StageError::StageMismatch {
                expected: expected.to_string(),
                found: metadata.stage_name,
            });
        }
    }
    debug!(stage = %metadata.stage_name, path = %path.display(), "read stage metadata");
    Ok(metadata)
}

/// Default-construct `S` and restore its parameters from `path`.
///
/// This is the usual body of [`Stage::load`] for stages without model data.
pub fn load_stage_params<S>(path: &Path) -> Result<S>
where
    S: Stage + Default,
{
    let mut stage = S::default();
    let metadata = load_metadata(path, Some(stage.stage_name()))?;
    *stage.param_map_mut() = metadata.params;
    info!(stage = stage.stage_name(), path = %path.display(), "loaded stage");
    Ok(stage)
}

/// Write model data tables under `<path>/data`.
pub fn save_model_data(path: &Path, tables: &[Table]) -> Result<()> {
    let dir = path.join(DATA_DIR);
    fs::create_dir_all(&dir)?;
    fs::write(dir.join(MODEL_DATA_FILE), bincode::serialize(tables)?)?;
    debug!(tables = tables.len(), path = %path.display(), "saved model data");
    Ok(())
}

/// Read the model data tables written by [`save_model_data`].
pub fn load_model_data(path: &Path) -> Result<Vec<Table>> {
    let bytes = read_or_not_found(&path.join(DATA_DIR).join(MODEL_DATA_FILE), path)?;
    Ok(bincode::deserialize(&bytes)?)
}

/// Directory of the `index`-th of `count` nested stages under `root`.
///
/// Indices are zero-padded to the width of `count` so that directory
/// listings sort in stage order.
pub fn stage_path(root: &Path, index: usize, count: usize) -> PathBuf {
    let width = count.to_string().len();
    root.join(STAGES_DIR)
        .join(format!("{:0width$}", index, width = width))
}

fn read_or_not_found(file: &Path, stage_dir: &Path) -> Result<Vec<u8>> {
    fs::read(file).map_err(|e| match e.kind() {
        ErrorKind::NotFound => StageError::NotFound {
            path: stage_dir.to_path_buf(),
        },
        _ => StageError::Io(e),
    })
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
