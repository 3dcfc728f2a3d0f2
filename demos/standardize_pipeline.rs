//! Standardize-and-clip pipeline
//!
//! This example walks through the full stage lifecycle:
//! - Defining a transformer, an estimator and the model it produces
//! - Fitting a pipeline and transforming new data
//! - Reading a model's data through the optional `ModelData` capability
//! - Saving the fitted pipeline and loading it back through the registry
//!
//! Run with: RUST_LOG=debug cargo run --example standardize_pipeline

use ml_stages::{
    persistence, AlgoOperator, Estimator, Model, ModelData, Param, ParamMap, Pipeline,
    PipelineModel, Stage, StageError, Table, TableEnvironment, Transformer, WithParams,
};
use std::error::Error;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Clamps every value into `[min, max]`.
#[derive(Clone, Debug, Default)]
struct Clip {
    params: ParamMap,
}

impl Clip {
    const MIN: Param<f64> = Param::new("min", "Lower bound.", f64::MIN);
    const MAX: Param<f64> = Param::new("max", "Upper bound.", f64::MAX);

    fn new(min: f64, max: f64) -> ml_stages::Result<Self> {
        let mut clip = Self::default();
        clip.set(&Self::MIN, min)?.set(&Self::MAX, max)?;
        Ok(clip)
    }
}

impl WithParams for Clip {
    fn param_map(&self) -> &ParamMap {
        &self.params
    }

    fn param_map_mut(&mut self) -> &mut ParamMap {
        &mut self.params
    }
}

impl Stage for Clip {
    fn stage_name(&self) -> &'static str {
        "Clip"
    }

    fn load(_env: &TableEnvironment, path: &Path) -> ml_stages::Result<Self> {
        persistence::load_stage_params(path)
    }
}

impl AlgoOperator for Clip {
    fn transform(&self, inputs: &[Table]) -> ml_stages::Result<Vec<Table>> {
        let (min, max) = (self.get(&Self::MIN)?, self.get(&Self::MAX)?);
        inputs
            .iter()
            .map(|t| Table::new(t.schema().clone(), t.data().mapv(|x| x.clamp(min, max))))
            .collect()
    }
}

impl Transformer for Clip {}

/// Learns per-column mean and standard deviation.
#[derive(Clone, Debug, Default)]
struct StandardScaler {
    params: ParamMap,
}

impl WithParams for StandardScaler {
    fn param_map(&self) -> &ParamMap {
        &self.params
    }

    fn param_map_mut(&mut self) -> &mut ParamMap {
        &mut self.params
    }
}

impl Stage for StandardScaler {
    fn stage_name(&self) -> &'static str {
        "StandardScaler"
    }

    fn load(_env: &TableEnvironment, path: &Path) -> ml_stages::Result<Self> {
        persistence::load_stage_params(path)
    }
}

impl Estimator for StandardScaler {
    type Model = StandardScalerModel;

    fn fit(&self, inputs: &[Table]) -> ml_stages::Result<StandardScalerModel> {
        let table = inputs
            .first()
            .ok_or_else(|| StageError::Computation("expected a training table".to_string()))?;
        let mean = table
            .data()
            .mean_axis(ndarray::Axis(0))
            .ok_or_else(|| StageError::Computation("empty training table".to_string()))?;
        let std = table.data().std_axis(ndarray::Axis(0), 0.0);

        let stats = ndarray::stack(ndarray::Axis(0), &[mean.view(), std.view()])
            .map_err(|e| StageError::Computation(e.to_string()))?;

        let mut model = StandardScalerModel::default();
        model.install_model_data(&[Table::new(table.schema().clone(), stats)?])?;
        Ok(model)
    }
}

/// Applies `(x - mean) / std`. Model data: one table, row 0 = mean, row 1 = std.
#[derive(Clone, Debug, Default)]
struct StandardScalerModel {
    params: ParamMap,
    stats: Option<Table>,
}

impl WithParams for StandardScalerModel {
    fn param_map(&self) -> &ParamMap {
        &self.params
    }

    fn param_map_mut(&mut self) -> &mut ParamMap {
        &mut self.params
    }
}

impl Stage for StandardScalerModel {
    fn stage_name(&self) -> &'static str {
        "StandardScalerModel"
    }

    fn save(&self, path: &Path) -> ml_stages::Result<()> {
        persistence::save_metadata(self, path, None)?;
        persistence::save_model_data(path, &self.export_model_data()?)
    }

    fn load(_env: &TableEnvironment, path: &Path) -> ml_stages::Result<Self> {
        let mut model: Self = persistence::load_stage_params(path)?;
        model.install_model_data(&persistence::load_model_data(path)?)?;
        Ok(model)
    }
}

impl AlgoOperator for StandardScalerModel {
    fn transform(&self, inputs: &[Table]) -> ml_stages::Result<Vec<Table>> {
        let stats = self
            .stats
            .as_ref()
            .ok_or_else(|| StageError::Computation("model has no data".to_string()))?;
        inputs
            .iter()
            .map(|t| {
                if t.schema() != stats.schema() {
                    return Err(StageError::Schema("columns differ from training".into()));
                }
                let std = stats.data().row(1).mapv(|s| if s == 0.0 { 1.0 } else { s });
                let centered = t.data() - &stats.data().row(0);
                Table::new(t.schema().clone(), &centered / &std)
            })
            .collect()
    }
}

impl Transformer for StandardScalerModel {}

impl ModelData for StandardScalerModel {
    fn install_model_data(&mut self, inputs: &[Table]) -> ml_stages::Result<()> {
        match inputs {
            [stats] if stats.num_rows() == 2 => {
                self.stats = Some(stats.clone());
                Ok(())
            }
            _ => Err(StageError::Schema(
                "expected one table with mean and std rows".to_string(),
            )),
        }
    }

    fn export_model_data(&self) -> ml_stages::Result<Vec<Table>> {
        Ok(self.stats.iter().cloned().collect())
    }
}

impl Model for StandardScalerModel {
    fn as_model_data(&self) -> Option<&dyn ModelData> {
        Some(self)
    }

    fn as_model_data_mut(&mut self) -> Option<&mut dyn ModelData> {
        Some(self)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Standardize-and-Clip Pipeline ===\n");

    let env = TableEnvironment::builder()
        .register_operator::<Clip>()
        .register_operator::<StandardScalerModel>()
        .register_estimator::<StandardScaler>()
        .build();

    // Features: [sqft, bedrooms]
    let train = env.table_from_rows(
        ["sqft", "bedrooms"],
        &[
            vec![1500.0, 3.0],
            vec![2000.0, 4.0],
            vec![1200.0, 2.0],
            vec![1800.0, 3.0],
            vec![2200.0, 4.0],
            vec![1100.0, 2.0],
            vec![2500.0, 5.0],
            vec![1400.0, 3.0],
        ],
    )?;
    println!(
        "Training data: {} samples with {} features each",
        train.num_rows(),
        train.num_columns()
    );

    let pipeline = Pipeline::new()
        .add_estimator(StandardScaler::default())
        .add_operator(Clip::new(-1.5, 1.5)?);
    let model = pipeline.fit(std::slice::from_ref(&train))?;
    println!("Fitted pipeline with {} stages", model.len());

    let test = env.table_from_rows(["sqft", "bedrooms"], &[vec![1000.0, 1.0], vec![4000.0, 6.0]])?;
    let output = model.transform(std::slice::from_ref(&test))?;
    for row in output[0].rows() {
        println!("  scaled row: {:?}", row.to_vec());
    }

    // The whole pipeline model keeps the default (unsupported) accessors...
    match model.get_model_data() {
        Err(e) if e.is_unsupported() => println!("\nPipelineModel model data: {}", e),
        other => println!("\nPipelineModel model data: {:?}", other.map(|t| t.len())),
    }
    // ...while the scaler it wraps exposes its statistics.
    let scaler = StandardScaler::default().fit(std::slice::from_ref(&train))?;
    let stats = scaler.get_model_data()?;
    println!("Scaler mean: {:?}", stats[0].row(0).map(|r| r.to_vec()));
    println!("Scaler std:  {:?}", stats[0].row(1).map(|r| r.to_vec()));

    let dir = std::env::temp_dir().join(format!("ml-stages-demo-{}", std::process::id()));
    model.save(&dir)?;
    println!("\nSaved fitted pipeline to {}", dir.display());

    let restored = PipelineModel::load(&env, &dir)?;
    let restored_output = restored.transform(std::slice::from_ref(&test))?;
    assert_eq!(restored_output, output);
    println!("Reloaded pipeline reproduces the same output");

    env.write_csv(&restored_output[0], dir.join("scaled.csv"))?;
    println!("Wrote {}", dir.join("scaled.csv").display());

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}
