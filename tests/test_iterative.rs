//! Integration test: iterative batching, ensembling and iteration budget

use kolosal_search::automl::{
    AlgorithmConfig, AutoMLAlgorithm, IterativeAlgorithm, TrainedPipelineResults,
};
use kolosal_search::ensemble::stacked_ensemble_architecture;
use kolosal_search::optimizer::{ComponentRanges, HyperparameterRanges, ParameterRange, TunerType};
use kolosal_search::pipeline::{
    ComponentSpec, ModelFamily, PipelineArchitecture, PipelineInstance, ProblemType,
};
use kolosal_search::KolosalError;

fn estimator_pipeline(name: &str, family: ModelFamily) -> PipelineArchitecture {
    PipelineArchitecture::new(
        format!("{} Pipeline", name),
        ProblemType::Regression,
        vec![
            ComponentSpec::transformer("Imputer"),
            ComponentSpec::estimator(format!("{} Regressor", name), family)
                .with_range("alpha", ParameterRange::real(0.0, 1.0))
                .with_default("alpha", 0.5)
                .accepts("n_jobs"),
        ],
    )
    .unwrap()
}

fn ensemble_pipeline() -> PipelineArchitecture {
    stacked_ensemble_architecture(
        ProblemType::Regression,
        &[ComponentSpec::estimator("Linear Regressor", ModelFamily::LinearModel)
            .with_range("fit_intercept", ParameterRange::categorical([true, false]))
            .with_range("alpha", ParameterRange::log_real(1e-4, 1.0))],
    )
    .unwrap()
}

fn allowed() -> Vec<PipelineArchitecture> {
    vec![
        estimator_pipeline("Elastic Net", ModelFamily::LinearModel),
        estimator_pipeline("Extra Trees", ModelFamily::ExtraTrees),
        ensemble_pipeline(),
    ]
}

/// Scores of the first batch, by pipeline name
fn first_batch_score(name: &str) -> f64 {
    match name {
        "Elastic Net Pipeline" => 0.8,
        "Extra Trees Pipeline" => 0.3,
        _ => 0.5,
    }
}

fn report_all(algo: &mut IterativeAlgorithm, batch: &[PipelineInstance]) {
    for (i, pipeline) in batch.iter().enumerate() {
        let score = first_batch_score(pipeline.name());
        let result = algo.add_result(score, pipeline, &TrainedPipelineResults::new(i, score));
        assert!(result.is_ok(), "add_result should succeed: {:?}", result.err());
    }
}

#[test]
fn test_first_batch_uses_defaults_and_skips_ensemble() {
    let mut algo = IterativeAlgorithm::new(allowed(), AlgorithmConfig::default()).unwrap();
    let batch = algo.next_batch().unwrap();
    let names: Vec<&str> = batch.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["Elastic Net Pipeline", "Extra Trees Pipeline"]);
    assert!(batch.iter().all(|p| p.parameters().values().any(|c| c.contains_key("alpha"))));
}

#[test]
fn test_round_robin_follows_first_batch_ranking() {
    let config = AlgorithmConfig::default()
        .with_tuner(TunerType::Random)
        .with_pipelines_per_batch(2);
    let mut algo = IterativeAlgorithm::new(allowed(), config).unwrap();
    let first = algo.next_batch().unwrap();
    report_all(&mut algo, &first);

    let mut order = Vec::new();
    for _ in 0..4 {
        let batch = algo.next_batch().unwrap();
        assert_eq!(batch.len(), 2);
        order.push(batch[0].name().to_string());
        report_all(&mut algo, &batch);
    }
    assert_eq!(
        order,
        vec![
            "Extra Trees Pipeline",
            "Elastic Net Pipeline",
            "Extra Trees Pipeline",
            "Elastic Net Pipeline",
        ]
    );
}

#[test]
fn test_ensemble_batches_are_interleaved() {
    let config = AlgorithmConfig::default()
        .with_tuner(TunerType::Random)
        .with_pipelines_per_batch(2)
        .with_ensembling(true);
    let mut algo = IterativeAlgorithm::new(allowed(), config).unwrap();
    let first = algo.next_batch().unwrap();
    report_all(&mut algo, &first);

    // two first-batch results: every third batch is an ensemble
    let mut kinds = Vec::new();
    for _ in 0..6 {
        let batch = algo.next_batch().unwrap();
        kinds.push((batch.len(), batch[0].is_ensemble()));
        report_all(&mut algo, &batch);
    }
    assert_eq!(
        kinds,
        vec![
            (2, false),
            (2, false),
            (1, true),
            (2, false),
            (2, false),
            (1, true),
        ]
    );

    let ensemble_id = algo.core().ensemble_architecture().unwrap();
    assert_eq!(algo.core().tuner(ensemble_id).unwrap().n_observations(), 2);
    assert!(algo.core().best_pipeline(ensemble_id).is_none());
}

#[test]
fn test_max_iterations_truncates_batches() {
    let config = AlgorithmConfig::default()
        .with_tuner(TunerType::Random)
        .with_pipelines_per_batch(5)
        .with_max_iterations(4);
    let mut algo = IterativeAlgorithm::new(allowed(), config).unwrap();

    let first = algo.next_batch().unwrap();
    assert_eq!(first.len(), 2);
    report_all(&mut algo, &first);

    let second = algo.next_batch().unwrap();
    assert_eq!(second.len(), 2);
    assert_eq!(algo.pipeline_number(), 4);

    for _ in 0..3 {
        assert!(algo.next_batch().unwrap().is_empty());
    }
    assert_eq!(algo.pipeline_number(), 4);
    assert_eq!(algo.batch_number(), 5);
}

#[test]
fn test_defaults_outside_ranges_are_config_errors() {
    let misdeclared = PipelineArchitecture::new(
        "Lasso Pipeline",
        ProblemType::Regression,
        vec![ComponentSpec::estimator("Lasso Regressor", ModelFamily::LinearModel)
            .with_range("alpha", ParameterRange::real(0.0, 1.0))
            .with_default("alpha", 1.5)],
    )
    .unwrap();
    let mut algo = IterativeAlgorithm::new(vec![misdeclared], AlgorithmConfig::default()).unwrap();
    let first = algo.next_batch().unwrap();

    match algo.add_result(0.2, &first[0], &TrainedPipelineResults::new(0, 0.2)) {
        Err(KolosalError::ConfigError(message)) => {
            assert!(message.starts_with(
                "Default parameters for components in pipeline Lasso Pipeline not in the hyperparameter ranges"
            ));
        }
        other => panic!("expected ConfigError, got {:?}", other),
    }
}

#[test]
fn test_custom_ranges_pin_first_batch_values() {
    let mut alpha = ComponentRanges::new();
    alpha.insert("alpha".to_string(), ParameterRange::real(0.6, 0.9));
    let mut custom = HyperparameterRanges::new();
    custom.insert("Elastic Net Regressor".to_string(), alpha);

    let mut algo = IterativeAlgorithm::new(
        vec![estimator_pipeline("Elastic Net", ModelFamily::LinearModel)],
        AlgorithmConfig::default().with_custom_hyperparameters(custom),
    )
    .unwrap();
    let first = algo.next_batch().unwrap();
    let sampled = first[0].parameters()["Elastic Net Regressor"]["alpha"]
        .as_float()
        .unwrap();
    assert!((0.6..=0.9).contains(&sampled));

    let result = algo.add_result(0.2, &first[0], &TrainedPipelineResults::new(0, 0.2));
    assert!(result.is_ok(), "sampled custom value should be in range: {:?}", result.err());
}

#[test]
fn test_ensemble_slot_skipped_without_stackable_pipelines() {
    let baseline = PipelineArchitecture::new(
        "Mean Baseline Regression Pipeline",
        ProblemType::Regression,
        vec![ComponentSpec::estimator("Baseline Regressor", ModelFamily::Baseline)
            .with_range("quantile", ParameterRange::real(0.0, 1.0))
            .with_default("quantile", 0.5)],
    )
    .unwrap();
    let config = AlgorithmConfig::default()
        .with_tuner(TunerType::Random)
        .with_pipelines_per_batch(1)
        .with_ensembling(true);
    let mut algo = IterativeAlgorithm::new(vec![baseline, ensemble_pipeline()], config).unwrap();
    let first = algo.next_batch().unwrap();
    report_all(&mut algo, &first);
    assert!(algo.core().best_pipelines().is_empty());

    let mut sizes = Vec::new();
    for _ in 0..4 {
        let batch = algo.next_batch().unwrap();
        sizes.push(batch.len());
        assert!(batch.iter().all(|p| !p.is_ensemble()));
        report_all(&mut algo, &batch);
    }
    assert_eq!(sizes, vec![1, 0, 1, 0]);
    assert_eq!(algo.batch_number(), 5);

    let ensemble_id = algo.core().ensemble_architecture().unwrap();
    assert_eq!(algo.core().tuner(ensemble_id).unwrap().n_observations(), 0);
}
