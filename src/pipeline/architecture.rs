//! Pipeline architectures: named templates that can be instantiated with parameters

use super::component::ComponentSpec;
use super::instance::PipelineInstance;
use super::problem_type::{ModelFamily, ProblemType};
use crate::error::{KolosalError, Result};
use crate::optimizer::{HyperparameterRanges, PipelineParameters};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

/// Key under which parameters shared by every component of a pipeline are passed
pub const PIPELINE_PARAMETERS_KEY: &str = "pipeline";

/// A named pipeline template: an ordered component graph solving one problem type.
///
/// Architectures are immutable once built and are shared through `Arc` by the
/// search core and every instance created from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineArchitecture {
    name: String,
    problem_type: ProblemType,
    component_graph: Vec<ComponentSpec>,
}

impl PipelineArchitecture {
    /// Create an architecture, validating its name and component graph
    pub fn new(
        name: impl Into<String>,
        problem_type: ProblemType,
        component_graph: Vec<ComponentSpec>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(KolosalError::ConfigError(
                "Pipeline architecture name must not be empty".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for component in &component_graph {
            if component.name == PIPELINE_PARAMETERS_KEY {
                return Err(KolosalError::ConfigError(format!(
                    "Component name '{}' is reserved (pipeline '{}')",
                    PIPELINE_PARAMETERS_KEY, name
                )));
            }
            if !seen.insert(component.name.as_str()) {
                return Err(KolosalError::ConfigError(format!(
                    "Duplicate component '{}' in pipeline '{}'",
                    component.name, name
                )));
            }
        }

        Ok(Self {
            name,
            problem_type,
            component_graph,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    pub fn component_graph(&self) -> &[ComponentSpec] {
        &self.component_graph
    }

    pub fn component(&self, name: &str) -> Option<&ComponentSpec> {
        self.component_graph.iter().find(|c| c.name == name)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.component(name).is_some()
    }

    /// Final estimator of the graph, if any
    pub fn estimator(&self) -> Option<&ComponentSpec> {
        self.component_graph.iter().rev().find(|c| c.is_estimator())
    }

    /// Model family of the estimator, `ModelFamily::None` without one
    pub fn model_family(&self) -> ModelFamily {
        self.estimator()
            .and_then(|c| c.model_family)
            .unwrap_or(ModelFamily::None)
    }

    /// Whether any component featurizes natural language text
    pub fn involves_text(&self) -> bool {
        self.component_graph.iter().any(|c| c.processes_text)
    }

    /// Declared ranges of every component, overlaid with custom ranges.
    ///
    /// Every component gets an entry, even when it has nothing to tune.
    /// Custom ranges for components outside the graph are ignored.
    pub fn get_hyperparameter_ranges(
        &self,
        custom: Option<&HyperparameterRanges>,
    ) -> HyperparameterRanges {
        self.component_graph
            .iter()
            .map(|component| {
                let mut ranges = component.hyperparameter_ranges.clone();
                if let Some(overrides) = custom.and_then(|c| c.get(&component.name)) {
                    for (parameter, range) in overrides {
                        ranges.insert(parameter.clone(), range.clone());
                    }
                }
                (component.name.clone(), ranges)
            })
            .collect()
    }

    /// Default parameters of every component
    pub fn default_parameters(&self) -> PipelineParameters {
        self.component_graph
            .iter()
            .map(|c| (c.name.clone(), c.default_parameters.clone()))
            .collect()
    }

    /// Create a fresh, unfitted instance.
    ///
    /// Component defaults are overlaid by `parameters`. Parameters addressed to
    /// components outside the graph are dropped with a warning.
    pub fn instantiate(
        self: &Arc<Self>,
        parameters: PipelineParameters,
        random_seed: u64,
    ) -> PipelineInstance {
        let mut resolved = self.default_parameters();
        for (component, component_parameters) in parameters {
            match resolved.get_mut(&component) {
                Some(target) => target.extend(component_parameters),
                None if component == PIPELINE_PARAMETERS_KEY => {}
                None => {
                    warn!(
                        pipeline = %self.name,
                        component = %component,
                        "Ignoring parameters for component not in pipeline"
                    );
                }
            }
        }
        PipelineInstance::new(Arc::clone(self), resolved, random_seed)
    }
}
