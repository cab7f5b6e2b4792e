//! Search algorithm configuration

use crate::error::{KolosalError, Result};
use crate::optimizer::{HyperparameterRanges, PipelineParameters, TunerType};
use crate::utils::NJobs;
use serde::{Deserialize, Serialize};

/// Configuration shared by every search algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlgorithmConfig {
    /// Maximum number of pipelines to propose, unbounded if `None`
    pub max_iterations: Option<usize>,

    /// Seed for tuners and every pipeline created by the search
    pub random_seed: u64,

    /// Parallelism handed to pipelines that accept `n_jobs`
    pub n_jobs: NJobs,

    /// Tuner built for each architecture
    pub tuner: TunerType,

    /// Component name -> parameter -> range overriding the declared one.
    /// Single-choice categoricals pin a parameter to one value.
    pub custom_hyperparameters: HyperparameterRanges,

    /// Component name -> fixed parameters for the first batch. The
    /// `"pipeline"` entry applies to every component accepting the parameter.
    pub pipeline_params: PipelineParameters,

    /// Tuner proposals per batch once the first batch is done
    pub pipelines_per_batch: usize,

    /// Interleave stacked ensemble batches
    pub ensembling: bool,

    /// Input pipelines featurize text, so ensembles must run serially
    pub text_in_ensembling: bool,

    /// Injected into components accepting `number_features`
    pub number_features: Option<usize>,
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            random_seed: 0,
            n_jobs: NJobs::All,
            tuner: TunerType::Bayesian,
            custom_hyperparameters: HyperparameterRanges::new(),
            pipeline_params: PipelineParameters::new(),
            pipelines_per_batch: 5,
            ensembling: false,
            text_in_ensembling: false,
            number_features: None,
        }
    }
}

impl AlgorithmConfig {
    /// Create a new configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipelines_per_batch == 0 {
            return Err(KolosalError::ConfigError(
                "pipelines_per_batch must be at least 1".to_string(),
            ));
        }
        if self.number_features == Some(0) {
            return Err(KolosalError::ConfigError(
                "number_features must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Builder method to cap the number of proposed pipelines
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Builder method to set pipeline parallelism
    pub fn with_n_jobs(mut self, n_jobs: NJobs) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Builder method to set the tuner
    pub fn with_tuner(mut self, tuner: TunerType) -> Self {
        self.tuner = tuner;
        self
    }

    pub fn with_custom_hyperparameters(mut self, ranges: HyperparameterRanges) -> Self {
        self.custom_hyperparameters = ranges;
        self
    }

    pub fn with_pipeline_params(mut self, params: PipelineParameters) -> Self {
        self.pipeline_params = params;
        self
    }

    /// Builder method to set the number of tuned pipelines per batch
    pub fn with_pipelines_per_batch(mut self, n: usize) -> Self {
        self.pipelines_per_batch = n;
        self
    }

    /// Builder method to enable ensemble batches
    pub fn with_ensembling(mut self, ensembling: bool) -> Self {
        self.ensembling = ensembling;
        self
    }

    pub fn with_text_in_ensembling(mut self, text_in_ensembling: bool) -> Self {
        self.text_in_ensembling = text_in_ensembling;
        self
    }

    pub fn with_number_features(mut self, n: usize) -> Self {
        self.number_features = Some(n);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AlgorithmConfig::default();
        assert_eq!(config.random_seed, 0);
        assert_eq!(config.n_jobs, NJobs::All);
        assert_eq!(config.tuner, TunerType::Bayesian);
        assert_eq!(config.pipelines_per_batch, 5);
        assert!(config.max_iterations.is_none());
        assert!(!config.ensembling);
    }

    #[test]
    fn test_builder() {
        let config = AlgorithmConfig::new()
            .with_max_iterations(20)
            .with_random_seed(42)
            .with_n_jobs(NJobs::Threads(2))
            .with_tuner(TunerType::Random)
            .with_ensembling(true);

        assert_eq!(config.max_iterations, Some(20));
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.n_jobs, NJobs::Threads(2));
        assert_eq!(config.tuner, TunerType::Random);
        assert!(config.ensembling);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = AlgorithmConfig::from_json(r#"{"n_jobs": 4, "tuner": "grid"}"#).unwrap();
        assert_eq!(config.n_jobs, NJobs::Threads(4));
        assert_eq!(config.tuner, TunerType::Grid);
        assert_eq!(config.pipelines_per_batch, 5);
    }

    #[test]
    fn test_invalid_json_values() {
        assert!(matches!(
            AlgorithmConfig::from_json(r#"{"pipelines_per_batch": 0}"#),
            Err(KolosalError::ConfigError(_))
        ));
        assert!(matches!(
            AlgorithmConfig::from_json(r#"{"n_jobs": 0}"#),
            Err(KolosalError::SerializationError(_))
        ));
    }
}
