//! # ml-stages
//!
//! Persistable, composable stage contracts for machine learning pipelines.
//!
//! ## Core Design Principles
//!
//! - **Capabilities as traits**: every pipeline node is a [`Stage`]; operators
//!   ([`AlgoOperator`] -> [`Transformer`] -> [`Model`]) compute tables from
//!   tables, while an [`Estimator`] trains on tables and produces a `Model`.
//! - **Opt-in model data**: reading or replacing a model's data is the
//!   separate [`ModelData`] capability. Models without it fail the accessors
//!   with [`StageError::Unsupported`].
//! - **Restorable by construction**: stages are `Default`-constructible and
//!   restored by loading parameters (and model data) from a saved directory.
//! - **Cheap data handles**: [`Table`] is an immutable, reference-counted
//!   batch of columns, so stages pass tables by value.
//!
//! ## Quick Start
//!
//! ```ignore
//! use ml_stages::{AlgoOperator, Estimator, Pipeline, Stage, TableEnvironment};
//!
//! let pipeline = Pipeline::new()
//!     .add_operator(Imputer::default())
//!     .add_estimator(MeanCenterer::default());
//!
//! let model = pipeline.fit(&[train])?;
//! let output = model.transform(&[test])?;
//!
//! model.save("model".as_ref())?;
//! ```
//!
//! ## Module Structure
//!
//! - `traits` — The stage hierarchy (`Stage`, `AlgoOperator`, `Transformer`, `Model`, `Estimator`)
//! - `table` — The table handle exchanged between stages
//! - `env` — Execution environment handle, configuration and CSV I/O
//! - `param` — Stage parameters (`WithParams`)
//! - `persistence` — On-disk layout of saved stages
//! - `pipeline` — Pipelines of stages and the registry used to reload them

/// Error type shared by all stage operations.
pub mod error;

/// Execution environment handle passed to `Stage::load`.
pub mod env;

/// Stage parameters.
pub mod param;

/// Saving and loading stage metadata and model data.
pub mod persistence;

/// Linear pipelines of stages.
pub mod pipeline;

/// The table handle exchanged between stages.
pub mod table;

/// The stage capability traits.
pub mod traits;

#[cfg(test)]
mod testing;

pub use env::{EnvironmentConfig, TableEnvironment};
pub use error::{Result, StageError};
pub use param::{Param, ParamMap, WithParams};
pub use pipeline::{Pipeline, PipelineModel, PipelineStage, StageRegistry};
pub use table::{Schema, Table};
pub use traits::{AlgoOperator, Estimator, Model, ModelData, Stage, Transformer};
