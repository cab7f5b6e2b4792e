//! Random search tuner

use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::{KolosalError, Result};
use super::search_space::{HyperparameterRanges, ParameterValue, PipelineParameters, SearchSpace};
use super::tuner::Tuner;

/// Proposes uniformly random parameters, by default never repeating a proposal
#[derive(Debug)]
pub struct RandomSearchTuner {
    space: SearchSpace,
    rng: Xoshiro256PlusPlus,
    with_replacement: bool,
    replacement_max_attempts: usize,
    proposed: Vec<Vec<ParameterValue>>,
    n_observations: usize,
}

impl RandomSearchTuner {
    pub fn new(ranges: &HyperparameterRanges, random_seed: u64) -> Result<Self> {
        Ok(Self {
            space: SearchSpace::from_ranges(ranges)?,
            rng: Xoshiro256PlusPlus::seed_from_u64(random_seed),
            with_replacement: false,
            replacement_max_attempts: 10,
            proposed: Vec::new(),
            n_observations: 0,
        })
    }

    /// Allow the same parameters to be proposed more than once
    pub fn with_replacement(mut self, with_replacement: bool) -> Self {
        self.with_replacement = with_replacement;
        self
    }

    /// Attempts at finding an unexplored point before giving up
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.replacement_max_attempts = attempts.max(1);
        self
    }
}

impl Tuner for RandomSearchTuner {
    fn propose(&mut self) -> Result<PipelineParameters> {
        if self.space.is_empty() {
            return Ok(self.space.to_parameters(&[]));
        }

        if self.with_replacement {
            let values = self.space.sample(&mut self.rng)?;
            return Ok(self.space.to_parameters(&values));
        }

        for _ in 0..self.replacement_max_attempts {
            let values = self.space.sample(&mut self.rng)?;
            if !self.proposed.contains(&values) {
                let parameters = self.space.to_parameters(&values);
                self.proposed.push(values);
                return Ok(parameters);
            }
        }

        Err(KolosalError::NoParams(
            "Cannot create a unique set of unexplored parameters. Try expanding the search space."
                .to_string(),
        ))
    }

    fn add(&mut self, parameters: &PipelineParameters, _score: f64) -> Result<()> {
        self.space.extract(parameters)?;
        self.n_observations += 1;
        Ok(())
    }

    fn n_observations(&self) -> usize {
        self.n_observations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::search_space::{ComponentRanges, ParameterRange};

    fn ranges(range: ParameterRange) -> HyperparameterRanges {
        HyperparameterRanges::from([(
            "Mock Classifier".to_string(),
            ComponentRanges::from([("param_a".to_string(), range)]),
        )])
    }

    #[test]
    fn test_proposals_are_unique_until_exhausted() {
        let mut tuner = RandomSearchTuner::new(&ranges(ParameterRange::categorical(["a", "b"])), 0)
            .unwrap()
            .with_max_attempts(50);

        let first = tuner.propose().unwrap();
        let second = tuner.propose().unwrap();
        assert_ne!(first, second);

        assert!(matches!(tuner.propose(), Err(KolosalError::NoParams(_))));
    }

    #[test]
    fn test_with_replacement_never_exhausts() {
        let mut tuner = RandomSearchTuner::new(&ranges(ParameterRange::categorical(["a"])), 0)
            .unwrap()
            .with_replacement(true);
        for _ in 0..5 {
            tuner.propose().unwrap();
        }
    }

    #[test]
    fn test_add_counts_valid_observations() {
        let mut tuner = RandomSearchTuner::new(&ranges(ParameterRange::integer(0, 100)), 1).unwrap();
        let params = tuner.propose().unwrap();
        tuner.add(&params, 0.3).unwrap();
        assert_eq!(tuner.n_observations(), 1);

        let bad = PipelineParameters::new();
        assert!(tuner.add(&bad, 0.3).is_err());
        assert_eq!(tuner.n_observations(), 1);
    }
}
