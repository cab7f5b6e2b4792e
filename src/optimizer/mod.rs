//! Hyperparameter tuning module
//!
//! Provides the pieces the search engine consumes as its tuning collaborator:
//! - Parameter values, ranges and the flat search space
//! - The `Tuner` contract and tuner factories
//! - Bayesian optimization with Gaussian Processes (default)
//! - Random search
//! - Grid search

mod search_space;
mod tuner;
pub mod gaussian_process;
pub mod grid_search;
pub mod random_search;

pub use search_space::{
    flatten_nested_ranges, ComponentParameters, ComponentRanges, Dimension,
    HyperparameterRanges, ParameterRange, ParameterValue, PipelineParameters, SearchSpace,
};
pub use tuner::{create_tuner, Tuner, TunerFactory, TunerType};
pub use gaussian_process::{
    AcquisitionFunction, BayesianTuner, BayesianTunerConfig, GaussianProcess, KernelType,
};
pub use grid_search::GridSearchTuner;
pub use random_search::RandomSearchTuner;
