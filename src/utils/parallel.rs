//! Parallelism hints handed down to pipelines

use crate::error::KolosalError;
use crate::optimizer::ParameterValue;
use serde::{Deserialize, Serialize};

/// Level of parallelism a pipeline may use while training.
///
/// Serialized with the usual integer convention: `-1` for all cores, `n >= 1`
/// for a fixed number of workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum NJobs {
    /// Use all available cores
    #[default]
    All,
    /// Use exactly this many workers
    Threads(usize),
}

impl NJobs {
    /// Single worker
    pub fn serial() -> Self {
        NJobs::Threads(1)
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        match self {
            NJobs::All => rayon::current_num_threads(),
            NJobs::Threads(n) => *n,
        }
    }

    /// Value injected into components accepting an `n_jobs` parameter
    pub fn as_parameter(&self) -> ParameterValue {
        ParameterValue::Int(i64::from(*self))
    }
}

impl TryFrom<i64> for NJobs {
    type Error = KolosalError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(NJobs::All),
            n if n >= 1 => Ok(NJobs::Threads(n as usize)),
            n => Err(KolosalError::InvalidParameter {
                name: "n_jobs".to_string(),
                value: n.to_string(),
                reason: "expected -1 or a positive number of workers".to_string(),
            }),
        }
    }
}

impl From<NJobs> for i64 {
    fn from(n_jobs: NJobs) -> Self {
        match n_jobs {
            NJobs::All => -1,
            NJobs::Threads(n) => n as i64,
        }
    }
}
