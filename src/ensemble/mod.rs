//! Ensemble module
//!
//! Builds stacked ensembles out of the best pipeline found for each
//! architecture, feeding their predictions into a tuned final estimator.

mod stacking;

pub use stacking::{
    build_stacked_ensemble, ensembler_name, split_final_estimator_parameters,
    stacked_ensemble_architecture, FINAL_ESTIMATOR_KEY, STACKED_ENSEMBLE_CLASSIFIER,
    STACKED_ENSEMBLE_REGRESSOR,
};
