//! Tuner contract and construction strategies

use crate::error::Result;
use super::{
    gaussian_process::{BayesianTuner, BayesianTunerConfig},
    grid_search::GridSearchTuner,
    random_search::RandomSearchTuner,
    search_space::{HyperparameterRanges, PipelineParameters},
};
use serde::{Deserialize, Serialize};

/// Stateful hyperparameter optimizer for a single pipeline architecture
pub trait Tuner: Send {
    /// Propose the next set of pipeline parameters to evaluate
    fn propose(&mut self) -> Result<PipelineParameters>;

    /// Record the score (lower is better) obtained with `parameters`
    fn add(&mut self, parameters: &PipelineParameters, score: f64) -> Result<()>;

    /// Number of observations that were accepted so far
    fn n_observations(&self) -> usize;
}

/// Builds one tuner per architecture
pub trait TunerFactory {
    fn create(&self, ranges: &HyperparameterRanges, random_seed: u64) -> Result<Box<dyn Tuner>>;
}

impl<F> TunerFactory for F
where
    F: Fn(&HyperparameterRanges, u64) -> Result<Box<dyn Tuner>>,
{
    fn create(&self, ranges: &HyperparameterRanges, random_seed: u64) -> Result<Box<dyn Tuner>> {
        self(ranges, random_seed)
    }
}

/// Built-in tuner implementations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunerType {
    /// Sequential model-based optimization with a Gaussian process
    #[default]
    Bayesian,
    /// Random search without replacement
    Random,
    /// Exhaustive grid search
    Grid,
}

impl TunerFactory for TunerType {
    fn create(&self, ranges: &HyperparameterRanges, random_seed: u64) -> Result<Box<dyn Tuner>> {
        create_tuner(self, ranges, random_seed)
    }
}

/// Create a tuner of the given type over `ranges`
pub fn create_tuner(
    tuner_type: &TunerType,
    ranges: &HyperparameterRanges,
    random_seed: u64,
) -> Result<Box<dyn Tuner>> {
    Ok(match tuner_type {
        TunerType::Bayesian => Box::new(BayesianTuner::new(
            ranges,
            random_seed,
            BayesianTunerConfig::default(),
        )?),
        TunerType::Random => Box::new(RandomSearchTuner::new(ranges, random_seed)?),
        TunerType::Grid => Box::new(GridSearchTuner::new(ranges)?),
    })
}
