//! Grid search tuner

use crate::error::{KolosalError, Result};
use super::search_space::{HyperparameterRanges, ParameterValue, PipelineParameters, SearchSpace};
use super::tuner::Tuner;

/// Walks the cartesian product of every dimension's grid, last dimension fastest
#[derive(Debug)]
pub struct GridSearchTuner {
    space: SearchSpace,
    grid: Vec<Vec<ParameterValue>>,
    n_combinations: usize,
    cursor: usize,
    n_observations: usize,
}

impl GridSearchTuner {
    /// Grid with 10 points per numeric dimension
    pub fn new(ranges: &HyperparameterRanges) -> Result<Self> {
        Self::with_n_points(ranges, 10)
    }

    pub fn with_n_points(ranges: &HyperparameterRanges, n_points: usize) -> Result<Self> {
        let space = SearchSpace::from_ranges(ranges)?;
        let grid: Vec<Vec<ParameterValue>> = space
            .dimensions()
            .iter()
            .map(|d| d.range.grid_points(n_points))
            .collect();
        let n_combinations = grid.iter().map(Vec::len).product();

        Ok(Self {
            space,
            grid,
            n_combinations,
            cursor: 0,
            n_observations: 0,
        })
    }

    /// Total number of grid points
    pub fn n_combinations(&self) -> usize {
        self.n_combinations
    }

    fn point(&self, mut index: usize) -> Vec<ParameterValue> {
        let mut values = vec![ParameterValue::None; self.grid.len()];
        for (dim, points) in self.grid.iter().enumerate().rev() {
            values[dim] = points[index % points.len()].clone();
            index /= points.len();
        }
        values
    }
}

impl Tuner for GridSearchTuner {
    fn propose(&mut self) -> Result<PipelineParameters> {
        if self.cursor >= self.n_combinations {
            return Err(KolosalError::NoParams(
                "Grid search has exhausted all possible parameters.".to_string(),
            ));
        }
        let values = self.point(self.cursor);
        self.cursor += 1;
        Ok(self.space.to_parameters(&values))
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
