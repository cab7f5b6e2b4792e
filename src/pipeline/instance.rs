//! Unfitted pipeline instances produced by the search

use super::architecture::PipelineArchitecture;
use super::problem_type::{ModelFamily, ProblemType};
use crate::optimizer::{ComponentParameters, PipelineParameters};
use crate::utils::NJobs;
use std::sync::Arc;

/// What a stacked ensemble combines and how
#[derive(Debug, Clone, PartialEq)]
pub struct StackedEnsembleInputs {
    /// Freshly instantiated base pipelines, in best-pipeline order
    pub input_pipelines: Vec<PipelineInstance>,
    /// Name of the meta estimator
    pub final_estimator: String,
    /// Constructor parameters of the meta estimator
    pub final_estimator_parameters: ComponentParameters,
    /// Parallelism used while fitting the ensemble
    pub n_jobs: NJobs,
}

/// An architecture bound to concrete parameters and a random seed.
///
/// Instances are what the caller trains and evaluates. They are never fitted
/// in place by the search; fresh copies are created whenever one is reused.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInstance {
    architecture: Arc<PipelineArchitecture>,
    parameters: PipelineParameters,
    random_seed: u64,
    stack: Option<StackedEnsembleInputs>,
}

impl PipelineInstance {
    pub(crate) fn new(
        architecture: Arc<PipelineArchitecture>,
        parameters: PipelineParameters,
        random_seed: u64,
    ) -> Self {
        Self {
            architecture,
            parameters,
            random_seed,
            stack: None,
        }
    }

    pub(crate) fn with_stack(mut self, stack: StackedEnsembleInputs) -> Self {
        self.stack = Some(stack);
        self
    }

    /// Name of the architecture this instance was created from
    pub fn name(&self) -> &str {
        self.architecture.name()
    }

    pub fn problem_type(&self) -> ProblemType {
        self.architecture.problem_type()
    }

    pub fn model_family(&self) -> ModelFamily {
        self.architecture.model_family()
    }

    pub fn architecture(&self) -> &Arc<PipelineArchitecture> {
        &self.architecture
    }

    pub fn parameters(&self) -> &PipelineParameters {
        &self.parameters
    }

    pub fn component_parameters(&self, component: &str) -> Option<&ComponentParameters> {
        self.parameters.get(component)
    }

    pub fn random_seed(&self) -> u64 {
        self.random_seed
    }

    /// Ensemble inputs, `None` for ordinary pipelines
    pub fn stacked(&self) -> Option<&StackedEnsembleInputs> {
        self.stack.as_ref()
    }

    pub fn is_ensemble(&self) -> bool {
        self.stack.is_some()
    }
}
