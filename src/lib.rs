//! Kolosal Search - AutoML batch search engine
//!
//! This crate decides, round by round, which pipelines an AutoML search
//! should evaluate next:
//! - Batch proposal over a set of allowed pipeline architectures
//! - Per-architecture hyperparameter tuning from reported scores
//! - Stacked ensembles built from the best pipeline of each architecture
//!
//! Pipelines are described, never fitted: the caller trains each proposed
//! [`pipeline::PipelineInstance`], normalizes its score so lower is better
//! and reports it back.
//!
//! # Modules
//!
//! - [`automl`] - Search algorithms (`AlgorithmCore`, `IterativeAlgorithm`)
//! - [`pipeline`] - Architectures, components and instances
//! - [`optimizer`] - Search spaces and tuners (Bayesian, random, grid)
//! - [`ensemble`] - Stacked ensemble construction
//! - [`utils`] - Parallelism hints

// Core error handling
pub mod error;

// Search
pub mod automl;
pub mod ensemble;
pub mod optimizer;
pub mod pipeline;

// Utilities
pub mod utils;

pub use error::{KolosalError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{KolosalError, Result};

    // Search algorithms
    pub use crate::automl::{
        AlgorithmConfig, AlgorithmCore, AutoMLAlgorithm, BestPipelineInfo, IterativeAlgorithm,
        TrainedPipelineResults,
    };

    // Pipelines
    pub use crate::pipeline::{
        ComponentSpec, ModelFamily, PipelineArchitecture, PipelineInstance, ProblemType,
    };

    // Tuning
    pub use crate::optimizer::{
        ParameterRange, ParameterValue, PipelineParameters, Tuner, TunerFactory, TunerType,
    };

    // Ensembles
    pub use crate::ensemble::stacked_ensemble_architecture;

    // Parallelism
    pub use crate::utils::NJobs;
}
