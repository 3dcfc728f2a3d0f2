//! Pipeline estimator and the model it produces.

use super::stage::PipelineStage;
use crate::env::TableEnvironment;
use crate::error::{Result, StageError};
use crate::param::{ParamMap, WithParams};
use crate::persistence::{self, StageMetadata};
use crate::table::Table;
use crate::traits::{AlgoOperator, Estimator, Model, Stage, Transformer};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const NUM_STAGES_KEY: &str = "num_stages";

/// An estimator made of a sequence of operators and estimators.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
    params: ParamMap,
}

impl Pipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline from already-erased stages.
    pub fn from_stages(stages: Vec<PipelineStage>) -> Self {
        Self {
            stages,
            params: ParamMap::new(),
        }
    }

    /// Append an operator (transformer, model, ...).
    pub fn add_operator<T: AlgoOperator + 'static>(mut self, operator: T) -> Self {
        self.stages.push(PipelineStage::Operator(Arc::new(operator)));
        self
    }

    /// Append an estimator.
    pub fn add_estimator<E>(mut self, estimator: E) -> Self
    where
        E: Estimator + 'static,
        E::Model: 'static,
    {
        self.stages.push(PipelineStage::Estimator(Arc::new(estimator)));
        self
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl WithParams for Pipeline {
    fn param_map(&self) -> &ParamMap {
        &self.params
    }

    fn param_map_mut(&mut self) -> &mut ParamMap {
        &mut self.params
    }
}

impl Stage for Pipeline {
    fn stage_name(&self) -> &'static str {
        "Pipeline"
    }

    fn save(&self, path: &Path) -> Result<()> {
        save_with_stages(self, self.len(), path, |i, dir| self.stages[i].save(dir))
    }

    fn load(env: &TableEnvironment, path: &Path) -> Result<Self> {
        let mut pipeline = Self::new();
        let metadata = persistence::load_metadata(path, Some(pipeline.stage_name()))?;
        pipeline.stages = load_stages(env, path, &metadata)?;
        pipeline.params = metadata.params;
        Ok(pipeline)
    }
}

impl Estimator for Pipeline {
    type Model = PipelineModel;

    /// Fit every estimator on the output of the stages that precede it.
    ///
    /// Inputs are only pushed through the stages before the last estimator;
    /// stages after it are carried into the model untouched.
    fn fit(&self, inputs: &[Table]) -> Result<PipelineModel> {
        let last_estimator = self.stages.iter().rposition(PipelineStage::is_estimator);
        let mut current = inputs.to_vec();
        let mut fitted: Vec<Arc<dyn AlgoOperator>> = Vec::with_capacity(self.stages.len());

        for (i, stage) in self.stages.iter().enumerate() {
            let operator = match stage {
                PipelineStage::Operator(op) => Arc::clone(op),
                PipelineStage::Estimator(est) => {
                    debug!(stage = est.stage_name(), index = i, "fitting pipeline stage");
                    est.fit_dyn(&current)?
                }
            };
            if last_estimator.is_some_and(|last| i < last) {
                current = operator.transform(&current)?;
            }
            fitted.push(operator);
        }

        Ok(PipelineModel::new(fitted))
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages)
            .field("params", &self.params)
            .finish()
    }
}

/// A model applying a sequence of fitted operators in order.
///
/// Produced by [`Pipeline::fit`]. Its model data is not accessible; query the
/// member stages instead.
#[derive(Clone, Default)]
pub struct PipelineModel {
    stages: Vec<Arc<dyn AlgoOperator>>,
    params: ParamMap,
}

impl PipelineModel {
    pub fn new(stages: Vec<Arc<dyn AlgoOperator>>) -> Self {
        Self {
            stages,
            params: ParamMap::new(),
        }
    }

    pub fn stages(&self) -> &[Arc<dyn AlgoOperator>] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl WithParams for PipelineModel {
    fn param_map(&self) -> &ParamMap {
        &self.params
    }

    fn param_map_mut(&mut self) -> &mut ParamMap {
        &mut self.params
    }
}

impl Stage for PipelineModel {
    fn stage_name(&self) -> &'static str {
        "PipelineModel"
    }

    fn save(&self, path: &Path) -> Result<()> {
        save_with_stages(self, self.len(), path, |i, dir| self.stages[i].save(dir))
    }

    fn load(env: &TableEnvironment, path: &Path) -> Result<Self> {
        let mut model = Self::default();
        let metadata = persistence::load_metadata(path, Some(model.stage_name()))?;
        for stage in load_stages(env, path, &metadata)? {
            match stage {
                PipelineStage::Operator(op) => model.stages.push(op),
                PipelineStage::Estimator(est) => {
                    return Err(StageError::StageMismatch {
                        expected: "a fitted operator".to_string(),
                        found: est.stage_name().to_string(),
                    })
                }
            }
        }
        model.params = metadata.params;
        Ok(model)
    }
}

impl AlgoOperator for PipelineModel {
    fn transform(&self, inputs: &[Table]) -> Result<Vec<Table>> {
        let mut current = inputs.to_vec();
        for stage in &self.stages {
            current = stage.transform(&current)?;
        }
        Ok(current)
    }
}

impl Transformer for PipelineModel {}

impl Model for PipelineModel {}

impl fmt::Debug for PipelineModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.stage_name()).collect();
        f.debug_struct("PipelineModel")
            .field("stages", &names)
            .field("params", &self.params)
            .finish()
    }
}

/// Write each nested stage under `stages/<i>`, then the owner's metadata.
///
/// The metadata file marks a complete save, so it is written last. Nested
/// stages written by a failed save are removed again.
fn save_with_stages<S, F>(owner: &S, count: usize, path: &Path, mut save_stage: F) -> Result<()>
where
    S: Stage + ?Sized,
    F: FnMut(usize, &Path) -> Result<()>,
{
    if path.join(persistence::METADATA_FILE).exists() {
        return Err(StageError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }

    let stages_dir = path.join(persistence::STAGES_DIR);
    let fresh = !stages_dir.exists();
    let saved =
        (0..count).try_for_each(|i| save_stage(i, &persistence::stage_path(path, i, count)));
    if let Err(e) = saved {
        if fresh {
            // The member error is reported, not a cleanup failure.
            let _ = fs::remove_dir_all(&stages_dir);
        }
        debug!(path = %path.display(), error = %e, "discarded partially saved stages");
        return Err(e);
    }

    let mut extra = Map::new();
    extra.insert(NUM_STAGES_KEY.to_string(), Value::from(count));
    persistence::save_metadata(owner, path, Some(extra))
}

fn load_stages(
    env: &TableEnvironment,
    path: &Path,
    metadata: &StageMetadata,
) -> Result<Vec<PipelineStage>> {
    let count = metadata
        .extra
        .get(NUM_STAGES_KEY)
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            StageError::Serialization(format!(
                "metadata at {} has no '{}'",
                path.display(),
                NUM_STAGES_KEY
            ))
        })? as usize;

    (0..count)
        .map(|i| {
            env.registry()
                .load(env, &persistence::stage_path(path, i, count))
        })
        .collect()
}
