use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_search::automl::{
    AlgorithmConfig, AutoMLAlgorithm, IterativeAlgorithm, TrainedPipelineResults,
};
use kolosal_search::ensemble::stacked_ensemble_architecture;
use kolosal_search::optimizer::{ParameterRange, TunerType};
use kolosal_search::pipeline::{ComponentSpec, ModelFamily, PipelineArchitecture, ProblemType};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

fn create_architectures(n_pipelines: usize) -> Vec<PipelineArchitecture> {
    let mut architectures: Vec<PipelineArchitecture> = (0..n_pipelines)
        .map(|i| {
            PipelineArchitecture::new(
                format!("Pipeline {}", i),
                ProblemType::Binary,
                vec![
                    ComponentSpec::transformer("Imputer")
                        .with_range("strategy", ParameterRange::categorical(["mean", "median"]))
                        .with_default("strategy", "mean"),
                    ComponentSpec::estimator(format!("Estimator {}", i), ModelFamily::RandomForest)
                        .with_range("max_depth", ParameterRange::integer(1, 20))
                        .with_range("min_samples", ParameterRange::real(0.0, 0.5))
                        .with_range("learning_rate", ParameterRange::log_real(1e-3, 1.0))
                        .with_default("max_depth", 6i64)
                        .with_default("min_samples", 0.1)
                        .with_default("learning_rate", 0.1)
                        .accepts("n_jobs"),
                ],
            )
            .unwrap()
        })
        .collect();

    let final_estimator = ComponentSpec::estimator("Logistic Regression", ModelFamily::LinearModel)
        .with_range("C", ParameterRange::log_real(0.01, 10.0));
    architectures.push(stacked_ensemble_architecture(ProblemType::Binary, &[final_estimator]).unwrap());
    architectures
}

fn run_search(tuner: TunerType, n_pipelines: usize, n_batches: usize) -> usize {
    let config = AlgorithmConfig::default()
        .with_tuner(tuner)
        .with_ensembling(true);
    let mut algo = IterativeAlgorithm::new(create_architectures(n_pipelines), config).unwrap();
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let mut result_id = 0;

    for _ in 0..n_batches {
        let batch = algo.next_batch().unwrap();
        for pipeline in &batch {
            let score: f64 = rng.gen();
            let results = TrainedPipelineResults::new(result_id, score)
                .with_cv_scores(vec![score; 3])
                .with_training_time(0.0);
            algo.add_result(score, pipeline, &results).unwrap();
            result_id += 1;
        }
    }
    algo.pipeline_number()
}

fn bench_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    group.sample_size(10);

    for tuner in [TunerType::Random, TunerType::Bayesian] {
        for n_pipelines in [2, 8].iter() {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", tuner), n_pipelines),
                n_pipelines,
                |b, &n| b.iter(|| run_search(black_box(tuner.clone()), n, 12)),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_batches);
criterion_main!(benches);
