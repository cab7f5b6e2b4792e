//! Pipeline descriptions consumed by the search
//!
//! The search never fits anything itself. It only needs to know:
//! - Which problem type a pipeline solves and its model family
//! - Which components it is made of and what they can be tuned over
//! - How to create a fresh, unfitted instance from parameters

mod architecture;
mod component;
mod instance;
mod problem_type;

pub use architecture::{PipelineArchitecture, PIPELINE_PARAMETERS_KEY};
pub use component::{ComponentSpec, DROP_COLUMNS_TRANSFORMER, SELECT_COLUMNS_TRANSFORMER};
pub use instance::{PipelineInstance, StackedEnsembleInputs};
pub use problem_type::{ModelFamily, ProblemType};
