//! Shared state and contract of AutoML search algorithms

use super::config::AlgorithmConfig;
use crate::ensemble::{build_stacked_ensemble, split_final_estimator_parameters};
use crate::error::{KolosalError, Result};
use crate::optimizer::{
    flatten_nested_ranges, ComponentParameters, ParameterValue, PipelineParameters, Tuner,
    TunerFactory,
};
use crate::pipeline::{
    ModelFamily, PipelineArchitecture, PipelineInstance, StackedEnsembleInputs,
    SELECT_COLUMNS_TRANSFORMER,
};
use crate::utils::NJobs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Handle of an architecture registered with an [`AlgorithmCore`].
///
/// Ordered by registration, so maps keyed by it iterate in that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchitectureId(usize);

impl ArchitectureId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Evaluation summary reported along with a score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainedPipelineResults {
    /// Caller-side identifier of the evaluation
    pub id: usize,
    pub mean_cv_score: f64,
    pub cv_scores: Vec<f64>,
    pub training_time_secs: f64,
}

impl TrainedPipelineResults {
    pub fn new(id: usize, mean_cv_score: f64) -> Self {
        Self {
            id,
            mean_cv_score,
            ..Default::default()
        }
    }

    pub fn with_cv_scores(mut self, cv_scores: Vec<f64>) -> Self {
        self.cv_scores = cv_scores;
        self
    }

    pub fn with_training_time(mut self, secs: f64) -> Self {
        self.training_time_secs = secs;
        self
    }
}

/// Best pipeline seen so far for one architecture
#[derive(Debug, Clone, PartialEq)]
pub struct BestPipelineInfo {
    pub pipeline: PipelineInstance,
    pub parameters: PipelineParameters,
    pub score: f64,
    /// Id of the evaluation that produced `score`
    pub result_id: usize,
}

/// Keep whichever record has the lower score.
///
/// Ties and NaN candidates keep `current`; a NaN `current` loses to any
/// real score.
pub fn update_best(
    current: Option<BestPipelineInfo>,
    candidate: BestPipelineInfo,
) -> BestPipelineInfo {
    match current {
        Some(current) if !improves_on(&candidate, &current) => current,
        _ => candidate,
    }
}

fn improves_on(candidate: &BestPipelineInfo, current: &BestPipelineInfo) -> bool {
    candidate.score < current.score || (current.score.is_nan() && !candidate.score.is_nan())
}

/// State every search algorithm shares: registered architectures, one tuner
/// per architecture, counters and best-pipeline bookkeeping.
pub struct AlgorithmCore {
    architectures: Vec<Arc<PipelineArchitecture>>,
    ids: HashMap<String, ArchitectureId>,
    tuners: Vec<Box<dyn Tuner>>,
    best_pipeline_info: BTreeMap<ArchitectureId, BestPipelineInfo>,
    ensemble: Option<ArchitectureId>,
    config: AlgorithmConfig,
    pipeline_number: usize,
    batch_number: usize,
    selected_cols: Option<Vec<String>>,
    text_in_ensembling: bool,
}

impl AlgorithmCore {
    /// Register `allowed_pipelines` with tuners of the configured type
    pub fn new(allowed_pipelines: Vec<PipelineArchitecture>, config: AlgorithmConfig) -> Result<Self> {
        let factory = config.tuner.clone();
        Self::with_tuner_factory(allowed_pipelines, config, &factory)
    }

    /// Register `allowed_pipelines` with tuners built by `factory`.
    ///
    /// Ensemble architectures have their nested ranges flattened before the
    /// tuner sees them. Text processing in any base architecture turns on
    /// `text_in_ensembling`. Architecture names must be unique and at most one
    /// ensemble architecture may be registered.
    pub fn with_tuner_factory(
        allowed_pipelines: Vec<PipelineArchitecture>,
        config: AlgorithmConfig,
        factory: &dyn TunerFactory,
    ) -> Result<Self> {
        config.validate()?;

        let mut architectures = Vec::with_capacity(allowed_pipelines.len());
        let mut ids = HashMap::with_capacity(allowed_pipelines.len());
        let mut tuners = Vec::with_capacity(allowed_pipelines.len());
        let mut ensemble = None;

        for (index, architecture) in allowed_pipelines.into_iter().enumerate() {
            let id = ArchitectureId(index);
            if ids.insert(architecture.name().to_string(), id).is_some() {
                return Err(KolosalError::ConfigError(format!(
                    "Pipeline '{}' was allowed more than once",
                    architecture.name()
                )));
            }

            let mut ranges = architecture.get_hyperparameter_ranges(Some(&config.custom_hyperparameters));
            if architecture.model_family() == ModelFamily::Ensemble {
                if ensemble.is_some() {
                    return Err(KolosalError::ConfigError(
                        "At most one ensemble pipeline may be allowed per search".to_string(),
                    ));
                }
                ensemble = Some(id);
                ranges = flatten_nested_ranges(&ranges);
            }

            debug!(pipeline = %architecture.name(), n_components = ranges.len(), "Creating tuner");
            tuners.push(factory.create(&ranges, config.random_seed)?);
            architectures.push(Arc::new(architecture));
        }

        let text_in_ensembling = config.text_in_ensembling
            || architectures
                .iter()
                .any(|a| a.model_family() != ModelFamily::Ensemble && a.involves_text());

        info!(
            n_pipelines = architectures.len(),
            has_ensemble = ensemble.is_some(),
            text_in_ensembling,
            random_seed = config.random_seed,
            "AutoML algorithm initialized"
        );

        Ok(Self {
            architectures,
            ids,
            tuners,
            best_pipeline_info: BTreeMap::new(),
            ensemble,
            text_in_ensembling,
            config,
            pipeline_number: 0,
            batch_number: 0,
            selected_cols: None,
        })
    }

    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    pub fn random_seed(&self) -> u64 {
        self.config.random_seed
    }

    pub fn n_jobs(&self) -> NJobs {
        self.config.n_jobs
    }

    /// Registered architectures, in registration order
    pub fn architectures(&self) -> &[Arc<PipelineArchitecture>] {
        &self.architectures
    }

    pub fn architecture_ids(&self) -> impl Iterator<Item = ArchitectureId> {
        (0..self.architectures.len()).map(ArchitectureId)
    }

    pub fn architecture_id(&self, name: &str) -> Option<ArchitectureId> {
        self.ids.get(name).copied()
    }

    pub fn architecture(&self, id: ArchitectureId) -> Result<&Arc<PipelineArchitecture>> {
        self.architectures
            .get(id.0)
            .ok_or_else(|| KolosalError::PipelineNotFound(format!("#{}", id.0)))
    }

    /// The registered ensemble architecture, if any
    pub fn ensemble_architecture(&self) -> Option<ArchitectureId> {
        self.ensemble
    }

    pub fn tuner(&self, id: ArchitectureId) -> Option<&dyn Tuner> {
        self.tuners.get(id.0).map(|t| t.as_ref())
    }

    /// Ask the architecture's tuner for its next proposal
    pub fn propose(&mut self, id: ArchitectureId) -> Result<PipelineParameters> {
        self.tuners
            .get_mut(id.0)
            .ok_or_else(|| KolosalError::PipelineNotFound(format!("#{}", id.0)))?
            .propose()
    }

    /// Forward a result to the tuner of the pipeline's architecture.
    ///
    /// Fails with `PipelineNotFound` before touching any tuner when the
    /// architecture was not allowed. Tuner errors are returned unchanged.
    pub fn record_observation(
        &mut self,
        pipeline: &PipelineInstance,
        score_to_minimize: f64,
    ) -> Result<ArchitectureId> {
        let id = self
            .architecture_id(pipeline.name())
            .ok_or_else(|| KolosalError::PipelineNotFound(pipeline.name().to_string()))?;

        debug!(pipeline = %pipeline.name(), score = score_to_minimize, "Recording result");
        self.tuners[id.0].add(pipeline.parameters(), score_to_minimize)?;
        Ok(id)
    }

    /// Best pipeline per architecture, in registration order
    pub fn best_pipelines(&self) -> &BTreeMap<ArchitectureId, BestPipelineInfo> {
        &self.best_pipeline_info
    }

    pub fn best_pipeline(&self, id: ArchitectureId) -> Option<&BestPipelineInfo> {
        self.best_pipeline_info.get(&id)
    }

    /// Apply [`update_best`] to the architecture's record. Returns whether the
    /// candidate became the new best.
    pub fn update_best_pipeline(&mut self, id: ArchitectureId, candidate: BestPipelineInfo) -> bool {
        let current = self.best_pipeline_info.remove(&id);
        let replaced = current
            .as_ref()
            .map_or(true, |current| improves_on(&candidate, current));
        let best = update_best(current, candidate);
        if replaced {
            debug!(pipeline = %best.pipeline.name(), score = best.score, "New best pipeline");
        }
        self.best_pipeline_info.insert(id, best);
        replaced
    }

    /// Columns kept by Select Columns Transformers in ensemble inputs
    pub fn selected_columns(&self) -> Option<&[String]> {
        self.selected_cols.as_deref()
    }

    pub fn set_selected_columns(&mut self, columns: Option<Vec<String>>) {
        self.selected_cols = columns;
    }

    pub fn text_in_ensembling(&self) -> bool {
        self.text_in_ensembling
    }

    pub fn set_text_in_ensembling(&mut self, text_in_ensembling: bool) {
        self.text_in_ensembling = text_in_ensembling;
    }

    pub fn pipeline_number(&self) -> usize {
        self.pipeline_number
    }

    pub fn batch_number(&self) -> usize {
        self.batch_number
    }

    /// Pipelines that may still be proposed, `None` when unbounded
    pub fn remaining_budget(&self) -> Option<usize> {
        self.config
            .max_iterations
            .map(|max| max.saturating_sub(self.pipeline_number))
    }

    /// Close a batch: truncate it to the remaining budget and advance the counters.
    pub fn finish_batch(&mut self, mut batch: Vec<PipelineInstance>) -> Vec<PipelineInstance> {
        if let Some(remaining) = self.remaining_budget() {
            batch.truncate(remaining);
        }
        self.pipeline_number += batch.len();
        self.batch_number += 1;
        info!(
            batch_number = self.batch_number,
            batch_size = batch.len(),
            pipeline_number = self.pipeline_number,
            "Batch ready"
        );
        batch
    }
}

impl fmt::Debug for AlgorithmCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlgorithmCore")
            .field("architectures", &self.architectures.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("ensemble", &self.ensemble)
            .field("pipeline_number", &self.pipeline_number)
            .field("batch_number", &self.batch_number)
            .field("n_best", &self.best_pipeline_info.len())
            .finish_non_exhaustive()
    }
}

/// A batch-proposing AutoML search strategy.
///
/// Implementors decide how batches are formed and how tuner proposals become
/// pipeline parameters; result bookkeeping and ensemble construction are
/// shared.
pub trait AutoMLAlgorithm {
    fn core(&self) -> &AlgorithmCore;

    fn core_mut(&mut self) -> &mut AlgorithmCore;

    /// Produce the next batch of unfitted pipelines to evaluate
    fn next_batch(&mut self) -> Result<Vec<PipelineInstance>>;

    /// Turn a raw tuner proposal into parameters ready for `architecture`
    fn transform_parameters(
        &self,
        architecture: &PipelineArchitecture,
        proposed_parameters: &PipelineParameters,
    ) -> Result<PipelineParameters>;

    /// Report the score of an evaluated pipeline
    fn add_result(
        &mut self,
        score_to_minimize: f64,
        pipeline: &PipelineInstance,
        _trained_pipeline_results: &TrainedPipelineResults,
    ) -> Result<()> {
        self.core_mut()
            .record_observation(pipeline, score_to_minimize)
            .map(|_| ())
    }

    /// Pipelines proposed so far
    fn pipeline_number(&self) -> usize {
        self.core().pipeline_number()
    }

    /// Batches produced so far
    fn batch_number(&self) -> usize {
        self.core().batch_number()
    }

    /// Stack the current best pipelines under a final estimator.
    ///
    /// `proposed_parameters` is a proposal from the ensemble architecture's
    /// tuner; its ensembler entry picks the final estimator and its
    /// parameters. Base pipelines are re-instantiated, never reused.
    fn create_ensemble(&self, proposed_parameters: &PipelineParameters) -> Result<PipelineInstance> {
        let core = self.core();
        let best = core.best_pipelines();

        let problem_type = best
            .values()
            .next()
            .map(|info| info.pipeline.problem_type())
            .ok_or_else(|| {
                KolosalError::AlgorithmError(
                    "Cannot build an ensemble before any best pipelines were recorded".to_string(),
                )
            })?;

        if let Some(mismatch) = best.values().find(|i| i.pipeline.problem_type() != problem_type) {
            return Err(KolosalError::ValidationError(format!(
                "Pipeline '{}' solves {} problems, expected {}",
                mismatch.pipeline.name(),
                mismatch.pipeline.problem_type(),
                problem_type
            )));
        }

        let n_jobs = if core.text_in_ensembling() {
            NJobs::serial()
        } else {
            core.n_jobs()
        };

        let mut input_pipelines = Vec::with_capacity(best.len());
        for (id, info) in best {
            let architecture = core.architecture(*id)?;
            let mut parameters = self.transform_parameters(architecture, &info.parameters)?;
            if architecture.has_component(SELECT_COLUMNS_TRANSFORMER) {
                let columns = core
                    .selected_columns()
                    .map(|c| ParameterValue::from(c.to_vec()))
                    .unwrap_or(ParameterValue::None);
                let mut select = ComponentParameters::new();
                select.insert("columns".to_string(), columns);
                parameters.insert(SELECT_COLUMNS_TRANSFORMER.to_string(), select);
            }
            input_pipelines.push(architecture.instantiate(parameters, core.random_seed()));
        }

        let ensemble_id = core.ensemble_architecture().ok_or_else(|| {
            KolosalError::ConfigError("No ensemble pipeline is allowed in this search".to_string())
        })?;
        let ensemble_architecture = core.architecture(ensemble_id)?;
        let ensembler = ensemble_architecture.estimator().ok_or_else(|| {
            KolosalError::ConfigError(format!(
                "Ensemble pipeline '{}' has no ensembler component",
                ensemble_architecture.name()
            ))
        })?;
        let ensembler_parameters = proposed_parameters
            .get(&ensembler.name)
            .cloned()
            .ok_or_else(|| {
                KolosalError::ConfigError(format!(
                    "Proposed parameters have no entry for ensembler '{}'",
                    ensembler.name
                ))
            })?;

        let (final_estimator, final_estimator_parameters) =
            split_final_estimator_parameters(&ensembler_parameters)?;

        build_stacked_ensemble(
            ensemble_architecture,
            StackedEnsembleInputs {
                input_pipelines,
                final_estimator,
                final_estimator_parameters,
                n_jobs,
            },
            problem_type,
            ensembler_parameters,
            core.random_seed(),
        )
    }
}
