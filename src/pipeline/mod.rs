//! Linear pipelines of stages.
//!
//! A [`Pipeline`] is an [`Estimator`](crate::Estimator) built from a list of
//! operators and estimators. Fitting it fits each estimator on the output of
//! the stages before it and yields a [`PipelineModel`], which applies every
//! fitted stage in order.
//!
//! Pipelines hold heterogeneous stages behind trait objects. Reloading them
//! therefore goes through a [`StageRegistry`], which maps the stage name found
//! in saved metadata back to a concrete type.
//!
//! # Example
//! ```ignore
//! let pipeline = Pipeline::new()
//!     .add_operator(Imputer::default())
//!     .add_estimator(MeanCenterer::default());
//!
//! let model = pipeline.fit(&[train])?;
//! let centered = model.transform(&[test])?;
//!
//! model.save(path)?;
//! let env = TableEnvironment::builder()
//!     .register_operator::<Imputer>()
//!     .register_operator::<CenteringModel>()
//!     .build();
//! let restored = PipelineModel::load(&env, path)?;
//! ```

mod pipeline;
mod registry;
mod stage;

pub use pipeline::{Pipeline, PipelineModel};
pub use registry::{StageLoader, StageRegistry};
pub use stage::{DynEstimator, PipelineStage};
