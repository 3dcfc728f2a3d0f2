//! Small concrete stages shared by the unit tests.

use crate::env::TableEnvironment;
use crate::error::{Result, StageError};
use crate::param::{Param, ParamMap, WithParams};
use crate::persistence;
use crate::table::Table;
use crate::traits::{AlgoOperator, Estimator, Model, ModelData, Stage, Transformer};
use ndarray::Axis;
use std::path::Path;

macro_rules! impl_with_params {
    ($ty:ty) => {
        impl WithParams for $ty {
            fn param_map(&self) -> &ParamMap {
                &self.params
            }

            fn param_map_mut(&mut self) -> &mut ParamMap {
                &mut self.params
            }
        }
    };
}

/// Model that returns its inputs unchanged and keeps the default
/// (unsupported) model-data accessors.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EchoModel {
    params: ParamMap,
}

impl EchoModel {
    pub const TAG: Param<u32> = Param::new("tag", "Identifies the instance.", 0);

    pub fn tagged(tag: u32) -> Self {
        let mut model = Self::default();
        model.set(&Self::TAG, tag).unwrap();
        model
    }
}

impl_with_params!(EchoModel);

impl Stage for EchoModel {
    fn stage_name(&self) -> &'static str {
        "EchoModel"
    }

    fn load(_env: &TableEnvironment, path: &Path) -> Result<Self> {
        persistence::load_stage_params(path)
    }
}

impl AlgoOperator for EchoModel {
    fn transform(&self, inputs: &[Table]) -> Result<Vec<Table>> {
        Ok(inputs.to_vec())
    }
}

impl Transformer for EchoModel {}

impl Model for EchoModel {}

/// Estimator that ignores its inputs and hands back a clone of one model.
#[derive(Clone, Debug, Default)]
pub struct ConstantEstimator {
    params: ParamMap,
    model: EchoModel,
}

impl ConstantEstimator {
    pub fn new(model: EchoModel) -> Self {
        Self {
            params: ParamMap::new(),
            model,
        }
    }
}

impl_with_params!(ConstantEstimator);

impl Stage for ConstantEstimator {
    fn stage_name(&self) -> &'static str {
        "ConstantEstimator"
    }

    fn load(_env: &TableEnvironment, path: &Path) -> Result<Self> {
        persistence::load_stage_params(path)
    }
}

impl Estimator for ConstantEstimator {
    type Model = EchoModel;

    fn fit(&self, _inputs: &[Table]) -> Result<EchoModel> {
        Ok(self.model.clone())
    }
}

/// Aggregating operator: one output table holding the total row count, or
/// no output at all when given no inputs.
#[derive(Clone, Debug, Default)]
pub struct RowCounter {
    params: ParamMap,
}

impl_with_params!(RowCounter);

impl Stage for RowCounter {
    fn stage_name(&self) -> &'static str {
        "RowCounter"
    }

    fn load(_env: &TableEnvironment, path: &Path) -> Result<Self> {
        persistence::load_stage_params(path)
    }
}

impl AlgoOperator for RowCounter {
    fn transform(&self, inputs: &[Table]) -> Result<Vec<Table>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let total: usize = inputs.iter().map(Table::num_rows).sum();
        Ok(vec![Table::from_rows(["rows"], &[vec![total as f64]])?])
    }
}

/// Adds a constant to every value of every input table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AddConstant {
    params: ParamMap,
}

impl AddConstant {
    pub const VALUE: Param<f64> = Param::new("value", "Constant added to each value.", 1.0);

    pub fn new(value: f64) -> Self {
        let mut stage = Self::default();
        stage.set(&Self::VALUE, value).unwrap();
        stage
    }
}

impl_with_params!(AddConstant);

impl Stage for AddConstant {
    fn stage_name(&self) -> &'static str {
        "AddConstant"
    }

    fn load(_env: &TableEnvironment, path: &Path) -> Result<Self> {
        persistence::load_stage_params(path)
    }
}

impl AlgoOperator for AddConstant {
    fn transform(&self, inputs: &[Table]) -> Result<Vec<Table>> {
        let value = self.get(&Self::VALUE)?;
        inputs
            .iter()
            .map(|t| Table::new(t.schema().clone(), t.data() + value))
            .collect()
    }
}

impl Transformer for AddConstant {}

/// Learns per-column means of the first input table.
#[derive(Clone, Debug, Default)]
pub struct MeanCenterer {
    params: ParamMap,
}

impl_with_params!(MeanCenterer);

impl Stage for MeanCenterer {
    fn stage_name(&self) -> &'static str {
        "MeanCenterer"
    }

    fn load(_env: &TableEnvironment, path: &Path) -> Result<Self> {
        persistence::load_stage_params(path)
    }
}

impl Estimator for MeanCenterer {
    type Model = CenteringModel;

    fn fit(&self, inputs: &[Table]) -> Result<CenteringModel> {
        let table = inputs
            .first()
            .ok_or_else(|| StageError::Computation("MeanCenterer needs one input".to_string()))?;
        let means = table
            .data()
            .mean_axis(Axis(0))
            .ok_or_else(|| StageError::Computation("cannot fit on an empty table".to_string()))?;
        Ok(CenteringModel {
            params: ParamMap::new(),
            columns: table.schema().names().to_vec(),
            means: means.to_vec(),
        })
    }
}

/// Subtracts learned column means. Exposes the means as model data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CenteringModel {
    params: ParamMap,
    columns: Vec<String>,
    means: Vec<f64>,
}

impl CenteringModel {
    pub fn means(&self) -> &[f64] {
        &self.means
    }
}

impl_with_params!(CenteringModel);

impl Stage for CenteringModel {
    fn stage_name(&self) -> &'static str {
        "CenteringModel"
    }

    fn save(&self, path: &Path) -> Result<()> {
        persistence::save_metadata(self, path, None)?;
        persistence::save_model_data(path, &self.export_model_data()?)
    }

    fn load(_env: &TableEnvironment, path: &Path) -> Result<Self> {
        let mut model: Self = persistence::load_stage_params(path)?;
        let tables = persistence::load_model_data(path)?;
        model.install_model_data(&tables)?;
        Ok(model)
    }
}

impl AlgoOperator for CenteringModel {
    fn transform(&self, inputs: &[Table]) -> Result<Vec<Table>> {
        inputs
            .iter()
            .map(|table| {
                self.columns
                    .iter()
                    .zip(&self.means)
                    .try_fold(table.clone(), |t, (name, &mean)| {
                        t.map_column(name, |x| x - mean)
                    })
            })
            .collect()
    }
}

impl Transformer for CenteringModel {}

impl ModelData for CenteringModel {
    fn install_model_data(&mut self, inputs: &[Table]) -> Result<()> {
        let [table] = inputs else {
            return Err(StageError::Schema(format!(
                "expected one model data table, got {}",
                inputs.len()
            )));
        };
        let row = table
            .row(0)
            .filter(|_| table.num_rows() == 1)
            .ok_or_else(|| StageError::Schema("model data must have one row".to_string()))?;
        self.columns = table.schema().names().to_vec();
        self.means = row.to_vec();
        Ok(())
    }

    fn export_model_data(&self) -> Result<Vec<Table>> {
        Ok(vec![Table::from_rows(
            self.columns.iter().cloned(),
            &[self.means.clone()],
        )?])
    }
}

impl Model for CenteringModel {
    fn as_model_data(&self) -> Option<&dyn ModelData> {
        Some(self)
    }

    fn as_model_data_mut(&mut self) -> Option<&mut dyn ModelData> {
        Some(self)
    }
}
