use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ml_stages::{
    persistence, AlgoOperator, Estimator, Param, ParamMap, Pipeline, Stage, Table,
    TableEnvironment, Transformer, WithParams,
};
use std::path::Path;

#[derive(Clone, Default)]
struct Scale {
    params: ParamMap,
}

impl Scale {
    const FACTOR: Param<f64> = Param::new("factor", "Multiplier.", 1.0);

    fn new(factor: f64) -> Self {
        let mut scale = Self::default();
        scale.set(&Self::FACTOR, factor).unwrap();
        scale
    }
}

impl WithParams for Scale {
    fn param_map(&self) -> &ParamMap {
        &self.params
    }

    fn param_map_mut(&mut self) -> &mut ParamMap {
        &mut self.params
    }
}

impl Stage for Scale {
    fn stage_name(&self) -> &'static str {
        "Scale"
    }

    fn load(_env: &TableEnvironment, path: &Path) -> ml_stages::Result<Self> {
        persistence::load_stage_params(path)
    }
}

impl AlgoOperator for Scale {
    fn transform(&self, inputs: &[Table]) -> ml_stages::Result<Vec<Table>> {
        let factor = self.get(&Self::FACTOR)?;
        inputs
            .iter()
            .map(|t| Table::new(t.schema().clone(), t.data() * factor))
            .collect()
    }
}

impl Transformer for Scale {}

fn make_table(rows: usize) -> Table {
    let data: Vec<Vec<f64>> = (0..rows)
        .map(|i| vec![i as f64, i as f64 * 0.5, 1.0])
        .collect();
    Table::from_rows(["a", "b", "c"], &data).unwrap()
}

fn bench_pipeline_transform(c: &mut Criterion) {
    // Test different stage counts and table sizes
    for &stages in [1usize, 4, 16].iter() {
        let pipeline = (0..stages).fold(Pipeline::new(), |p, i| {
            p.add_operator(Scale::new(1.0 + i as f64 * 0.01))
        });
        let model = pipeline.fit(&[]).unwrap();

        for &rows in [100usize, 10_000].iter() {
            let input = [make_table(rows)];
            c.bench_with_input(
                BenchmarkId::new(format!("transform_{}_stages", stages), rows),
                &rows,
                |b, _| {
                    b.iter(|| {
                        let out = model.transform(black_box(&input)).unwrap();
                        black_box(out);
                    });
                },
            );
        }
    }
}

fn bench_table_clone(c: &mut Criterion) {
    let table = make_table(100_000);
    c.bench_function("table_clone_100k", |b| {
        b.iter(|| black_box(table.clone()));
    });
}

criterion_group!(benches, bench_pipeline_transform, bench_table_clone);
criterion_main!(benches);
