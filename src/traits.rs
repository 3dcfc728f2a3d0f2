//! Core stage traits.
//!
//! Every node of a pipeline is a [`Stage`]. Stages specialise along two
//! branches:
//! - [`AlgoOperator`] -> [`Transformer`] -> [`Model`]: stages that compute
//!   output tables from input tables.
//! - [`Estimator`]: stages that train on input tables and produce a [`Model`].
//!
//! Stages are expected to be constructed with `Default` (no arguments) and
//! then configured through [`WithParams`], which is also how generic code
//! restores a stage from disk: default-construct, then load.
//!
//! # Example
//! ```ignore
//! use ml_stages::{AlgoOperator, Estimator, Stage};
//!
//! let model = estimator.fit(&[train])?;
//! let predictions = model.transform(&[test])?;
//! model.save("model".as_ref())?;
//! let restored = MyModel::load(&env, "model".as_ref())?;
//! ```

use crate::env::TableEnvironment;
use crate::error::{Result, StageError};
use crate::param::WithParams;
use crate::persistence;
use crate::table::Table;
use std::path::Path;

/// A node in a pipeline: parameterized and persistable.
///
/// Implement [`AlgoOperator`] (and optionally [`Transformer`] / [`Model`]) or
/// [`Estimator`] rather than stopping at `Stage`.
pub trait Stage: WithParams {
    /// Name recorded in persisted metadata and used to look the stage up in a
    /// [`StageRegistry`](crate::pipeline::StageRegistry).
    ///
    /// Must be a fixed string that is unique per stage type and stays the
    /// same across releases, otherwise saved stages can no longer be loaded.
    fn stage_name(&self) -> &'static str;

    /// Save this stage to the given directory.
    ///
    /// The provided implementation writes the stage metadata (name and
    /// parameters). Stages with learned state must also persist it, e.g. via
    /// [`persistence::save_model_data`].
    ///
    /// # Errors
    /// Fails if `path` already holds a stage, or on I/O and encoding errors.
    fn save(&self, path: &Path) -> Result<()> {
        persistence::save_metadata(self, path, None)
    }

    /// Instantiate a new stage from the data saved at `path`.
    ///
    /// # Errors
    /// Returns [`StageError::NotFound`] if `path` holds no stage, and
    /// [`StageError::StageMismatch`] if it holds a different kind of stage.
    fn load(env: &TableEnvironment, path: &Path) -> Result<Self>
    where
        Self: Sized;
}

/// A stage that maps a list of input tables to a list of output tables.
///
/// There is no constraint between the number of inputs and outputs, which
/// makes this the right fit for aggregation-style logic.
pub trait AlgoOperator: Stage {
    /// Apply the operator to `inputs`.
    fn transform(&self, inputs: &[Table]) -> Result<Vec<Table>>;
}

/// An [`AlgoOperator`] whose output records typically correspond one-to-one
/// with its input records.
///
/// The correspondence is a convention for implementers and is not checked.
pub trait Transformer: AlgoOperator {}

/// Optional capability of a [`Model`]: read and replace its model data.
///
/// Model data may be an unbounded stream of updates in an online setting,
/// which is why it is exchanged as tables rather than as typed fields.
pub trait ModelData {
    /// Replace the model's data with the given tables.
    fn install_model_data(&mut self, inputs: &[Table]) -> Result<()>;

    /// Tables representing the current model data.
    fn export_model_data(&self) -> Result<Vec<Table>>;
}

/// A [`Transformer`] produced by [`Estimator::fit`].
///
/// Models that expose their data implement [`ModelData`] and return
/// `Some(self)` from [`Model::as_model_data`] and
/// [`Model::as_model_data_mut`]. All other models fail both accessors with
/// [`StageError::Unsupported`].
pub trait Model: Transformer {
    /// The model-data capability, if this model has one.
    fn as_model_data(&self) -> Option<&dyn ModelData> {
        None
    }

    /// Mutable access to the model-data capability, if this model has one.
    fn as_model_data_mut(&mut self) -> Option<&mut dyn ModelData> {
        None
    }

    /// Set the model data from `inputs`. Returns `self` for chaining.
    fn set_model_data(&mut self, inputs: &[Table]) -> Result<&mut Self>
    where
        Self: Sized,
    {
        let data = self
            .as_model_data_mut()
            .ok_or_else(|| StageError::unsupported("set_model_data"))?;
        data.install_model_data(inputs)?;
        Ok(self)
    }

    /// Get the tables representing the model data.
    fn get_model_data(&self) -> Result<Vec<Table>> {
        self.as_model_data()
            .ok_or_else(|| StageError::unsupported("get_model_data"))?
            .export_model_data()
    }
}

/// A stage that trains on input tables and produces a [`Model`].
pub trait Estimator: Stage {
    /// The model produced by [`Estimator::fit`].
    type Model: Model;

    /// Train on `inputs` and return the fitted model.
    fn fit(&self, inputs: &[Table]) -> Result<Self::Model>;
}
