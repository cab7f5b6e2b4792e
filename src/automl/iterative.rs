//! Iterative search: defaults first, then round-robin tuned batches

use super::algorithm::{
    AlgorithmCore, ArchitectureId, AutoMLAlgorithm, BestPipelineInfo, TrainedPipelineResults,
};
use super::config::AlgorithmConfig;
use crate::error::{KolosalError, Result};
use crate::optimizer::{ParameterValue, PipelineParameters, TunerFactory};
use crate::pipeline::{
    ModelFamily, PipelineArchitecture, PipelineInstance, DROP_COLUMNS_TRANSFORMER,
    PIPELINE_PARAMETERS_KEY,
};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Batching strategy that evaluates every architecture with its defaults, then
/// cycles through them from best to worst first-batch score, asking each
/// architecture's tuner for `pipelines_per_batch` proposals per turn.
///
/// With ensembling enabled every `n + 1`-th batch (`n` being the number of
/// first-batch results) is a single stacked ensemble of the best pipelines.
#[derive(Debug)]
pub struct IterativeAlgorithm {
    core: AlgorithmCore,
    first_batch_results: Vec<(f64, ArchitectureId)>,
}

impl IterativeAlgorithm {
    pub fn new(allowed_pipelines: Vec<PipelineArchitecture>, config: AlgorithmConfig) -> Result<Self> {
        Self::from_core(AlgorithmCore::new(allowed_pipelines, config)?)
    }

    pub fn with_tuner_factory(
        allowed_pipelines: Vec<PipelineArchitecture>,
        config: AlgorithmConfig,
        factory: &dyn TunerFactory,
    ) -> Result<Self> {
        Self::from_core(AlgorithmCore::with_tuner_factory(
            allowed_pipelines,
            config,
            factory,
        )?)
    }

    fn from_core(core: AlgorithmCore) -> Result<Self> {
        if core.config().ensembling && core.ensemble_architecture().is_none() {
            return Err(KolosalError::ConfigError(
                "Ensembling requires an ensemble pipeline among the allowed pipelines".to_string(),
            ));
        }
        Ok(Self {
            core,
            first_batch_results: Vec::new(),
        })
    }

    /// Scores reported for the first batch, in reporting order
    pub fn first_batch_results(&self) -> &[(f64, ArchitectureId)] {
        &self.first_batch_results
    }

    fn first_batch(&self, limit: usize) -> Result<Vec<PipelineInstance>> {
        let ensemble = self.core.ensemble_architecture();
        let mut batch = Vec::new();
        for id in self.core.architecture_ids() {
            if batch.len() == limit {
                break;
            }
            if Some(id) == ensemble {
                continue;
            }
            let architecture = self.core.architecture(id)?;
            let parameters = self.transform_parameters(architecture, &PipelineParameters::new())?;
            batch.push(architecture.instantiate(parameters, self.core.random_seed()));
        }
        Ok(batch)
    }

    fn tuned_batch(&mut self, limit: usize) -> Result<Vec<PipelineInstance>> {
        let mut ranked = self.first_batch_results.clone();
        if ranked.is_empty() {
            return Err(KolosalError::AlgorithmError(
                "No results were reported from the first batch".to_string(),
            ));
        }
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n_first = ranked.len();
        let batch_number = self.core.batch_number();
        let ensembling = self.core.config().ensembling;

        if ensembling && batch_number != 1 && batch_number % (n_first + 1) == 0 {
            return self.ensemble_batch(limit);
        }

        let cycle = if ensembling { n_first + 1 } else { n_first };
        let (_, id) = *ranked.get((batch_number - 1) % cycle).ok_or_else(|| {
            KolosalError::AlgorithmError(format!("No pipeline scheduled for batch {}", batch_number))
        })?;
        let architecture = Arc::clone(self.core.architecture(id)?);
        let n = self.core.config().pipelines_per_batch.min(limit);

        debug!(pipeline = %architecture.name(), n, batch_number, "Tuning batch");
        let mut batch = Vec::with_capacity(n);
        for _ in 0..n {
            let proposal = self.core.propose(id)?;
            let parameters = self.transform_parameters(&architecture, &proposal)?;
            batch.push(architecture.instantiate(parameters, self.core.random_seed()));
        }
        Ok(batch)
    }

    fn ensemble_batch(&mut self, limit: usize) -> Result<Vec<PipelineInstance>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let id = self.core.ensemble_architecture().ok_or_else(|| {
            KolosalError::ConfigError("No ensemble pipeline is allowed in this search".to_string())
        })?;
        if self.core.best_pipelines().is_empty() {
            warn!(
                batch_number = self.core.batch_number(),
                "No stackable pipelines to ensemble, skipping ensemble batch"
            );
            return Ok(Vec::new());
        }
        let proposal = self.core.propose(id)?;
        let ensemble = self.create_ensemble(&proposal)?;
        info!(
            batch_number = self.core.batch_number(),
            n_inputs = self.core.best_pipelines().len(),
            "Ensemble batch"
        );
        Ok(vec![ensemble])
    }
}

impl AutoMLAlgorithm for IterativeAlgorithm {
    fn core(&self) -> &AlgorithmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AlgorithmCore {
        &mut self.core
    }

    fn next_batch(&mut self) -> Result<Vec<PipelineInstance>> {
        let limit = self.core.remaining_budget().unwrap_or(usize::MAX);
        let batch = if limit == 0 {
            Vec::new()
        } else if self.core.batch_number() == 0 {
            self.first_batch(limit)?
        } else {
            self.tuned_batch(limit)?
        };
        Ok(self.core.finish_batch(batch))
    }

    fn transform_parameters(
        &self,
        architecture: &PipelineArchitecture,
        proposed_parameters: &PipelineParameters,
    ) -> Result<PipelineParameters> {
        let config = self.core.config();
        let first_batch = self.core.batch_number() == 0;
        let shared = config.pipeline_params.get(PIPELINE_PARAMETERS_KEY);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(config.random_seed);

        let mut parameters = PipelineParameters::new();
        for component in architecture.component_graph() {
            let mut component_parameters = proposed_parameters
                .get(&component.name)
                .cloned()
                .unwrap_or_default();

            if first_batch {
                if let Some(custom) = config.custom_hyperparameters.get(&component.name) {
                    for (name, range) in custom {
                        if !range.is_nested() {
                            component_parameters.insert(name.clone(), range.sample(&mut rng)?);
                        }
                    }
                }
                if let Some(fixed) = config.pipeline_params.get(&component.name) {
                    for (name, value) in fixed {
                        if !config
                            .custom_hyperparameters
                            .get(&component.name)
                            .map_or(false, |custom| custom.contains_key(name))
                        {
                            component_parameters.insert(name.clone(), value.clone());
                        }
                    }
                }
            } else if component.name == DROP_COLUMNS_TRANSFORMER {
                if let Some(columns) = config
                    .pipeline_params
                    .get(DROP_COLUMNS_TRANSFORMER)
                    .and_then(|p| p.get("columns"))
                {
                    component_parameters.insert("columns".to_string(), columns.clone());
                }
            }

            if component.accepts_param("n_jobs") {
                component_parameters.insert("n_jobs".to_string(), config.n_jobs.as_parameter());
            }
            if let Some(n) = config.number_features {
                if component.accepts_param("number_features") {
                    component_parameters
                        .insert("number_features".to_string(), ParameterValue::Int(n as i64));
                }
            }
            if let Some(shared) = shared {
                for (name, value) in shared {
                    if component.accepts_param(name) {
                        component_parameters.insert(name.clone(), value.clone());
                    }
                }
            }

            parameters.insert(component.name.clone(), component_parameters);
        }
        Ok(parameters)
    }

    fn add_result(
        &mut self,
        score_to_minimize: f64,
        pipeline: &PipelineInstance,
        trained_pipeline_results: &TrainedPipelineResults,
    ) -> Result<()> {
        let batch_number = self.core.batch_number();
        let id = match self.core.record_observation(pipeline, score_to_minimize) {
            Ok(id) => id,
            Err(err @ KolosalError::InvalidParameter { .. }) if batch_number == 1 => {
                return Err(KolosalError::ConfigError(format!(
                    "Default parameters for components in pipeline {} not in the hyperparameter ranges: {}",
                    pipeline.name(),
                    err
                )));
            }
            Err(err) => return Err(err),
        };

        let family = pipeline.model_family();
        if family == ModelFamily::Ensemble {
            return Ok(());
        }

        if batch_number == 1 {
            self.first_batch_results.push((score_to_minimize, id));
        }
        if family.is_stackable() {
            self.core.update_best_pipeline(
                id,
                BestPipelineInfo {
                    pipeline: pipeline.clone(),
                    parameters: pipeline.parameters().clone(),
                    score: score_to_minimize,
                    result_id: trained_pipeline_results.id,
                },
            );
        }
        Ok(())
    }
}
