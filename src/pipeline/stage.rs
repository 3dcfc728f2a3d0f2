//! Type-erased pipeline members.

use crate::error::Result;
use crate::table::Table;
use crate::traits::{AlgoOperator, Estimator, Stage};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Object-safe view of an [`Estimator`].
///
/// `Estimator::fit` returns an associated type, so it cannot be called
/// through `dyn Estimator`. This trait is implemented for every estimator
/// and returns the fitted model as a shared [`AlgoOperator`] instead.
pub trait DynEstimator: Stage {
    fn fit_dyn(&self, inputs: &[Table]) -> Result<Arc<dyn AlgoOperator>>;
}

impl<E> DynEstimator for E
where
    E: Estimator,
    E::Model: 'static,
{
    fn fit_dyn(&self, inputs: &[Table]) -> Result<Arc<dyn AlgoOperator>> {
        Ok(Arc::new(self.fit(inputs)?))
    }
}

/// A member of a [`Pipeline`](super::Pipeline).
///
/// Operators are shared (`Arc`) because fitting a pipeline reuses them, as-is,
/// in the resulting model.
#[derive(Clone)]
pub enum PipelineStage {
    Operator(Arc<dyn AlgoOperator>),
    Estimator(Arc<dyn DynEstimator>),
}

impl PipelineStage {
    pub fn stage_name(&self) -> &'static str {
        match self {
            PipelineStage::Operator(op) => op.stage_name(),
            PipelineStage::Estimator(est) => est.stage_name(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        match self {
            PipelineStage::Operator(op) => op.save(path),
            PipelineStage::Estimator(est) => est.save(path),
        }
    }

    pub fn is_estimator(&self) -> bool {
        matches!(self, PipelineStage::Estimator(_))
    }
}

impl fmt::Debug for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Operator(_) => write!(f, "Operator({})", self.stage_name()),
            PipelineStage::Estimator(_) => write!(f, "Estimator({})", self.stage_name()),
        }
    }
}
