//! Stage lookup by persisted name.

use super::pipeline::{Pipeline, PipelineModel};
use super::stage::PipelineStage;
use crate::env::TableEnvironment;
use crate::error::{Result, StageError};
use crate::persistence;
use crate::traits::{AlgoOperator, Estimator, Stage};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Reconstructs one concrete stage type from a saved directory.
pub type StageLoader = fn(&TableEnvironment, &Path) -> Result<PipelineStage>;

/// Maps [`Stage::stage_name`] to the loader of that stage type.
///
/// Registration requires `Default`: every stage must be constructible without
/// arguments so it can be restored from disk.
#[derive(Clone, Default)]
pub struct StageRegistry {
    loaders: HashMap<String, StageLoader>,
}

impl StageRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that knows the pipeline stages of this crate.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register_estimator::<Pipeline>()
            .register_operator::<PipelineModel>();
        registry
    }

    /// Register an operator (transformer, model, ...) type.
    pub fn register_operator<T>(&mut self) -> &mut Self
    where
        T: AlgoOperator + Default + 'static,
    {
        self.insert(T::default().stage_name(), load_operator::<T>)
    }

    /// Register an estimator type.
    pub fn register_estimator<E>(&mut self) -> &mut Self
    where
        E: Estimator + Default + 'static,
        E::Model: 'static,
    {
        self.insert(E::default().stage_name(), load_estimator::<E>)
    }

    pub fn contains(&self, stage_name: &str) -> bool {
        self.loaders.contains_key(stage_name)
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Load the stage saved at `path`, dispatching on its recorded name.
    ///
    /// # Errors
    /// Returns [`StageError::UnregisteredStage`] when the saved stage type was
    /// never registered.
    pub fn load(&self, env: &TableEnvironment, path: &Path) -> Result<PipelineStage> {
        let metadata = persistence::load_metadata(path, None)?;
        let loader = self
            .loaders
            .get(&metadata.stage_name)
            .ok_or(StageError::UnregisteredStage(metadata.stage_name))?;
        loader(env, path)
    }

    fn insert(&mut self, name: &str, loader: StageLoader) -> &mut Self {
        debug!(stage = name, "registered stage");
        self.loaders.insert(name.to_string(), loader);
        self
    }
}

impl fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("StageRegistry").field("stages", &names).finish()
    }
}

fn load_operator<T>(env: &TableEnvironment, path: &Path) -> Result<PipelineStage>
where
    T: AlgoOperator + 'static,
{
    Ok(PipelineStage::Operator(Arc::new(T::load(env, path)?)))
}

fn load_estimator<E>(env: &TableEnvironment, path: &Path) -> Result<PipelineStage>
where
    E: Estimator + 'static,
    E::Model: 'static,
{
    Ok(PipelineStage::Estimator(Arc::new(E::load(env, path)?)))
}
