//! AutoML search algorithms
//!
//! An algorithm owns one tuner per allowed pipeline architecture and, batch
//! by batch, decides which pipelines to evaluate next:
//! - `AlgorithmCore`: registration, tuners, counters and best-pipeline bookkeeping
//! - `AutoMLAlgorithm`: the batching contract plus shared result handling and
//!   stacked ensemble construction
//! - `IterativeAlgorithm`: defaults first, then round-robin tuned batches

mod algorithm;
mod config;
mod iterative;

pub use algorithm::{
    update_best, AlgorithmCore, ArchitectureId, AutoMLAlgorithm, BestPipelineInfo,
    TrainedPipelineResults,
};
pub use config::AlgorithmConfig;
pub use iterative::IterativeAlgorithm;
