//! Stacked ensemble pipelines built from the best pipelines of a search

use crate::error::{KolosalError, Result};
use crate::optimizer::{ComponentParameters, ParameterRange, ParameterValue, PipelineParameters};
use crate::pipeline::{
    ComponentSpec, ModelFamily, PipelineArchitecture, PipelineInstance, ProblemType,
    StackedEnsembleInputs,
};
use std::sync::Arc;
use tracing::info;

/// Ensembler component used for classification problems
pub const STACKED_ENSEMBLE_CLASSIFIER: &str = "Stacked Ensemble Classifier";

/// Ensembler component used for regression problems
pub const STACKED_ENSEMBLE_REGRESSOR: &str = "Stacked Ensemble Regressor";

/// Ensembler parameter choosing the meta estimator
pub const FINAL_ESTIMATOR_KEY: &str = "final_estimator";

/// Name of the ensembler component for a problem type
pub fn ensembler_name(problem_type: ProblemType) -> &'static str {
    if problem_type.is_classification() {
        STACKED_ENSEMBLE_CLASSIFIER
    } else {
        STACKED_ENSEMBLE_REGRESSOR
    }
}

/// Build the ensemble architecture registered alongside the base pipelines.
///
/// The ensembler tunes `final_estimator` over the candidate names plus one
/// nested range mapping per candidate, keyed by the candidate's name. The
/// search flattens those into `"<estimator>_<parameter>"` keys.
pub fn stacked_ensemble_architecture(
    problem_type: ProblemType,
    final_estimators: &[ComponentSpec],
) -> Result<PipelineArchitecture> {
    let first = final_estimators.first().ok_or_else(|| {
        KolosalError::ConfigError(
            "Stacked ensemble requires at least one final estimator candidate".to_string(),
        )
    })?;

    if let Some(transformer) = final_estimators.iter().find(|c| !c.is_estimator()) {
        return Err(KolosalError::ValidationError(format!(
            "Final estimator candidate '{}' is not an estimator",
            transformer.name
        )));
    }

    let names: Vec<&str> = final_estimators.iter().map(|c| c.name.as_str()).collect();
    let mut ensembler = ComponentSpec::estimator(ensembler_name(problem_type), ModelFamily::Ensemble)
        .with_range(FINAL_ESTIMATOR_KEY, ParameterRange::categorical(names))
        .with_default(FINAL_ESTIMATOR_KEY, first.name.as_str())
        .accepts("n_jobs");

    for estimator in final_estimators {
        if !estimator.hyperparameter_ranges.is_empty() {
            ensembler.hyperparameter_ranges.insert(
                estimator.name.clone(),
                ParameterRange::Nested(estimator.hyperparameter_ranges.clone()),
            );
        }
    }

    let pipeline_name = if problem_type.is_classification() {
        "Stacked Ensemble Classification Pipeline"
    } else {
        "Stacked Ensemble Regression Pipeline"
    };
    PipelineArchitecture::new(pipeline_name, problem_type, vec![ensembler])
}

/// Split an ensembler proposal into the chosen final estimator and its own parameters.
///
/// Keys prefixed with `"<final_estimator>_"` are kept with the prefix
/// stripped; everything else is discarded.
pub fn split_final_estimator_parameters(
    ensembler_parameters: &ComponentParameters,
) -> Result<(String, ComponentParameters)> {
    let final_estimator = match ensembler_parameters.get(FINAL_ESTIMATOR_KEY) {
        Some(value) => match value.as_string() {
            Some(name) => name.to_string(),
            None => {
                return Err(KolosalError::InvalidParameter {
                    name: FINAL_ESTIMATOR_KEY.to_string(),
                    value: value.to_string(),
                    reason: "final estimator must be chosen by name".to_string(),
                })
            }
        },
        None => {
            return Err(KolosalError::InvalidParameter {
                name: FINAL_ESTIMATOR_KEY.to_string(),
                value: "None".to_string(),
                reason: "missing from ensembler parameters".to_string(),
            })
        }
    };

    let prefix = format!("{}_", final_estimator);
    let parameters = ensembler_parameters
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(&prefix)
                .map(|stripped| (stripped.to_string(), value.clone()))
        })
        .collect();

    Ok((final_estimator, parameters))
}

/// Create a stacked ensemble instance of `architecture`.
///
/// The instance's ensembler parameters are the raw proposal plus `n_jobs`,
/// so the result can be fed back to the ensemble's tuner.
pub fn build_stacked_ensemble(
    architecture: &Arc<PipelineArchitecture>,
    inputs: StackedEnsembleInputs,
    problem_type: ProblemType,
    ensembler_parameters: ComponentParameters,
    random_seed: u64,
) -> Result<PipelineInstance> {
    if architecture.problem_type() != problem_type {
        return Err(KolosalError::ValidationError(format!(
            "Ensemble pipeline '{}' solves {} problems, input pipelines solve {}",
            architecture.name(),
            architecture.problem_type(),
            problem_type
        )));
    }

    let ensembler = architecture.estimator().ok_or_else(|| {
        KolosalError::ConfigError(format!(
            "Ensemble pipeline '{}' has no ensembler component",
            architecture.name()
        ))
    })?;

    if let Some(range) = ensembler.hyperparameter_ranges.get(FINAL_ESTIMATOR_KEY) {
        let choice = ParameterValue::String(inputs.final_estimator.clone());
        if !range.contains(&choice) {
            return Err(KolosalError::InvalidParameter {
                name: FINAL_ESTIMATOR_KEY.to_string(),
                value: inputs.final_estimator,
                reason: "not a candidate of this ensemble".to_string(),
            });
        }
    }

    info!(
        pipeline = %architecture.name(),
        n_inputs = inputs.input_pipelines.len(),
        final_estimator = %inputs.final_estimator,
        n_jobs = i64::from(inputs.n_jobs),
        "Building stacked ensemble"
    );

    let mut component_parameters = ensembler_parameters;
    component_parameters.insert("n_jobs".to_string(), inputs.n_jobs.as_parameter());

    let mut parameters = PipelineParameters::new();
    parameters.insert(ensembler.name.clone(), component_parameters);

    Ok(architecture
        .instantiate(parameters, random_seed)
        .with_stack(inputs))
}
