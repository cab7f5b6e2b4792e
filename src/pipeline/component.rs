//! Declarative pipeline components

use crate::optimizer::{ComponentParameters, ComponentRanges, ParameterRange, ParameterValue};
use super::problem_type::ModelFamily;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Transformer that keeps only a chosen set of feature columns
pub const SELECT_COLUMNS_TRANSFORMER: &str = "Select Columns Transformer";

/// Transformer that removes a chosen set of feature columns
pub const DROP_COLUMNS_TRANSFORMER: &str = "Drop Columns Transformer";

/// A component of a pipeline's component graph.
///
/// Only the metadata the search needs is described here: what can be tuned,
/// what the defaults are and which constructor parameters are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    /// Set for estimators, `None` for transformers
    pub model_family: Option<ModelFamily>,
    pub hyperparameter_ranges: ComponentRanges,
    pub default_parameters: ComponentParameters,
    /// Constructor parameter names
    pub init_params: BTreeSet<String>,
    /// Component featurizes natural language text
    pub processes_text: bool,
}

impl ComponentSpec {
    pub fn transformer(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_family: None,
            hyperparameter_ranges: ComponentRanges::new(),
            default_parameters: ComponentParameters::new(),
            init_params: BTreeSet::new(),
            processes_text: false,
        }
    }

    pub fn estimator(name: impl Into<String>, model_family: ModelFamily) -> Self {
        Self {
            model_family: Some(model_family),
            ..Self::transformer(name)
        }
    }

    /// Declare a tunable parameter
    pub fn with_range(mut self, parameter: impl Into<String>, range: ParameterRange) -> Self {
        let parameter = parameter.into();
        self.init_params.insert(parameter.clone());
        self.hyperparameter_ranges.insert(parameter, range);
        self
    }

    /// Declare a parameter's default value
    pub fn with_default(
        mut self,
        parameter: impl Into<String>,
        value: impl Into<ParameterValue>,
    ) -> Self {
        let parameter = parameter.into();
        self.init_params.insert(parameter.clone());
        self.default_parameters.insert(parameter, value.into());
        self
    }

    /// Declare a constructor parameter without range or default
    pub fn accepts(mut self, parameter: impl Into<String>) -> Self {
        self.init_params.insert(parameter.into());
        self
    }

    pub fn with_text_processing(mut self) -> Self {
        self.processes_text = true;
        self
    }

    pub fn is_estimator(&self) -> bool {
        self.model_family.is_some()
    }

    pub fn accepts_param(&self, parameter: &str) -> bool {
        self.init_params.contains(parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_tracks_init_params() {
        let component = ComponentSpec::estimator("Random Forest Classifier", ModelFamily::RandomForest)
            .with_range("n_estimators", ParameterRange::integer(10, 1000))
            .with_default("n_estimators", 100i64)
            .accepts("n_jobs");

        assert!(component.is_estimator());
        assert!(component.accepts_param("n_estimators"));
        assert!(component.accepts_param("n_jobs"));
        assert!(!component.accepts_param("max_depth"));
        assert_eq!(component.default_parameters["n_estimators"], ParameterValue::Int(100));
    }

    #[test]
    fn test_transformer_has_no_family() {
        let component = ComponentSpec::transformer(SELECT_COLUMNS_TRANSFORMER).accepts("columns");
        assert!(!component.is_estimator());
        assert!(!component.processes_text);
    }
}
