//! Gaussian Process surrogate and the sequential model-based tuner built on it
//!
//! The tuner proposes uniformly random configurations until it has seen
//! `n_initial_points` observations, then fits a GP on the unit-encoded
//! history and picks the random candidate with the best acquisition value.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{KolosalError, Result};
use super::search_space::{HyperparameterRanges, PipelineParameters, SearchSpace};
use super::tuner::Tuner;

/// Kernel function types for Gaussian Process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Radial Basis Function (Squared Exponential)
    RBF { length_scale: f64 },
    /// Matern kernel with nu in {0.5, 1.5, 2.5}
    Matern { nu: f64, length_scale: f64 },
    /// Rational Quadratic kernel
    RationalQuadratic { length_scale: f64, alpha: f64 },
}

impl Default for KernelType {
    fn default() -> Self {
        KernelType::Matern { nu: 2.5, length_scale: 1.0 }
    }
}

fn compute_kernel(x1: &Array2<f64>, x2: &Array2<f64>, kernel: &KernelType) -> Array2<f64> {
    let mut k = Array2::zeros((x1.nrows(), x2.nrows()));
    for (i, xi) in x1.outer_iter().enumerate() {
        for (j, xj) in x2.outer_iter().enumerate() {
            k[[i, j]] = kernel_value(&xi.to_owned(), &xj.to_owned(), kernel);
        }
    }
    k
}

fn kernel_value(x1: &Array1<f64>, x2: &Array1<f64>, kernel: &KernelType) -> f64 {
    let diff = x1 - x2;
    let dist_sq = diff.dot(&diff);

    match kernel {
        KernelType::RBF { length_scale } => {
            (-0.5 * dist_sq / (length_scale * length_scale)).exp()
        }
        KernelType::Matern { nu, length_scale } => {
            let r = dist_sq.sqrt() / length_scale;
            if r < 1e-10 {
                return 1.0;
            }

            if (*nu - 0.5).abs() < 1e-6 {
                (-r).exp()
            } else if (*nu - 1.5).abs() < 1e-6 {
                let sqrt3 = 3.0_f64.sqrt();
                (1.0 + sqrt3 * r) * (-sqrt3 * r).exp()
            } else {
                let sqrt5 = 5.0_f64.sqrt();
                (1.0 + sqrt5 * r + 5.0 / 3.0 * r * r) * (-sqrt5 * r).exp()
            }
        }
        KernelType::RationalQuadratic { length_scale, alpha } => {
            (1.0 + dist_sq / (2.0 * alpha * length_scale * length_scale)).powf(-*alpha)
        }
    }
}

/// Acquisition function types (all expressed for minimization)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum AcquisitionFunction {
    /// Expected Improvement
    #[default]
    EI,
    /// Probability of Improvement
    PI,
    /// Lower Confidence Bound
    LCB { kappa: f64 },
}

impl AcquisitionFunction {
    /// Higher is better
    fn value(&self, mean: f64, var: f64, best_y: f64) -> f64 {
        let std = var.sqrt().max(1e-10);
        match self {
            AcquisitionFunction::EI => {
                let improvement = best_y - mean;
                let z = improvement / std;
                improvement * normal_cdf(z) + std * normal_pdf(z)
            }
            AcquisitionFunction::PI => normal_cdf((best_y - mean) / std),
            AcquisitionFunction::LCB { kappa } => -(mean - kappa * std),
        }
    }
}

/// Gaussian Process model for regression
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: KernelType,
    noise: f64,
    x_train: Option<Array2<f64>>,
    /// Cholesky factor of K + noise*I
    l_chol: Option<Array2<f64>>,
    /// Alpha = L^-T L^-1 y
    alpha: Option<Array1<f64>>,
    y_mean: f64,
    y_std: f64,
}

impl GaussianProcess {
    pub fn new(kernel: KernelType) -> Self {
        Self {
            kernel,
            noise: 1e-6,
            x_train: None,
            l_chol: None,
            alpha: None,
            y_mean: 0.0,
            y_std: 1.0,
        }
    }

    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.max(1e-10);
        self
    }

    /// Fit the GP to training data
    pub fn fit(&mut self, x: Array2<f64>, y: Array1<f64>) -> Result<()> {
        let n = y.len();
        if n == 0 || x.nrows() != n {
            return Err(KolosalError::ComputationError(format!(
                "cannot fit a gaussian process on {} inputs and {} targets",
                x.nrows(),
                n
            )));
        }

        self.y_mean = y.mean().unwrap_or(0.0);
        self.y_std = y.std(0.0);
        if self.y_std < 1e-10 {
            self.y_std = 1.0;
        }
        let y_normalized = y.mapv(|yi| (yi - self.y_mean) / self.y_std);

        let mut k = compute_kernel(&x, &x, &self.kernel);
        for i in 0..n {
            k[[i, i]] += self.noise;
        }

        let l = cholesky(&k);
        let alpha = solve_cholesky(&l, &y_normalized);

        self.x_train = Some(x);
        self.l_chol = Some(l);
        self.alpha = Some(alpha);
        Ok(())
    }

    /// Predict mean and variance at test points
    pub fn predict(&self, x_test: &Array2<f64>) -> Result<(Array1<f64>, Array1<f64>)> {
        let (x_train, l, alpha) = match (&self.x_train, &self.l_chol, &self.alpha) {
            (Some(x), Some(l), Some(a)) => (x, l, a),
            _ => {
                return Err(KolosalError::ComputationError(
                    "gaussian process is not fitted".to_string(),
                ))
            }
        };

        let k_star = compute_kernel(x_test, x_train, &self.kernel);
        let mean = k_star.dot(alpha).mapv(|m| m * self.y_std + self.y_mean);

        let mut var = Array1::zeros(x_test.nrows());
        for (i, row) in x_test.outer_iter().enumerate() {
            let row = row.to_owned();
            let k_self = kernel_value(&row, &row, &self.kernel);
            let v = solve_lower_triangular(l, &k_star.row(i).to_owned());
            var[i] = (k_self - v.dot(&v)).max(1e-10) * self.y_std * self.y_std;
        }

        Ok((mean, var))
    }
}

fn cholesky(a: &Array2<f64>) -> Array2<f64> {
    let n = a.nrows();
    let mut l = Array2::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            if i == j {
                for k in 0..j {
                    sum += l[[j, k]] * l[[j, k]];
                }
                l[[j, j]] = (a[[j, j]] - sum).max(1e-10).sqrt();
            } else {
                for k in 0..j {
                    sum += l[[i, k]] * l[[j, k]];
                }
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]].max(1e-10);
            }
        }
    }
    l
}

fn solve_lower_triangular(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let mut x = Array1::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[[i, j]] * x[j];
        }
        x[i] = sum / l[[i, i]].max(1e-10);
    }
    x
}

/// Solve L @ L^T @ x = b
fn solve_cholesky(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = b.len();
    let y = solve_lower_triangular(l, b);

    let mut x = Array1::zeros(n);
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[[j, i]] * x[j];
        }
        x[i] = sum / l[[i, i]].max(1e-10);
    }
    x
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

/// Error function approximation (Abramowitz and Stegun)
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Configuration for the Bayesian tuner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesianTunerConfig {
    pub kernel: KernelType,
    pub acquisition: AcquisitionFunction,
    /// Random proposals before the surrogate is used
    pub n_initial_points: usize,
    /// Random candidates scored per proposal
    pub n_candidates: usize,
    /// Noise level for GP
    pub noise: f64,
}

impl Default for BayesianTunerConfig {
    fn default() -> Self {
        Self {
            kernel: KernelType::default(),
            acquisition: AcquisitionFunction::EI,
            n_initial_points: 10,
            n_candidates: 256,
            noise: 1e-6,
        }
    }
}

/// Sequential model-based tuner, the default for every architecture
#[derive(Debug)]
pub struct BayesianTuner {
    space: SearchSpace,
    rng: Xoshiro256PlusPlus,
    config: BayesianTunerConfig,
    /// Unit-encoded points and their scores
    history: Vec<(Vec<f64>, f64)>,
}

impl BayesianTuner {
    pub fn new(
        ranges: &HyperparameterRanges,
        random_seed: u64,
        config: BayesianTunerConfig,
    ) -> Result<Self> {
        Ok(Self {
            space: SearchSpace::from_ranges(ranges)?,
            rng: Xoshiro256PlusPlus::seed_from_u64(random_seed),
            config,
            history: Vec::new(),
        })
    }

    pub fn search_space(&self) -> &SearchSpace {
        &self.space
    }

    fn best_candidate(&mut self) -> Result<PipelineParameters> {
        let n_dims = self.space.len();
        let n_obs = self.history.len();

        let x_train = Array2::from_shape_vec(
            (n_obs, n_dims),
            self.history.iter().flat_map(|(x, _)| x.iter().copied()).collect(),
        )?;
        let y_train: Array1<f64> = self.history.iter().map(|(_, y)| *y).collect();
        let best_y = y_train.iter().copied().fold(f64::INFINITY, f64::min);

        let mut gp = GaussianProcess::new(self.config.kernel.clone()).with_noise(self.config.noise);
        gp.fit(x_train, y_train)?;

        let candidates = (0..self.config.n_candidates.max(1))
            .map(|_| self.space.sample(&mut self.rng))
            .collect::<Result<Vec<_>>>()?;

        let acquisition = self.config.acquisition;
        let space = &self.space;
        let scores = candidates
            .par_iter()
            .map(|candidate| {
                let x = Array1::from_vec(space.encode(candidate)).insert_axis(Axis(0));
                let (mean, var) = gp.predict(&x)?;
                Ok(acquisition.value(mean[0], var[0], best_y))
            })
            .collect::<Result<Vec<f64>>>()?;

        let mut best_idx = 0;
        for (i, score) in scores.iter().enumerate() {
            if *score > scores[best_idx] {
                best_idx = i;
            }
        }

        Ok(self.space.to_parameters(&candidates[best_idx]))
    }
}

impl Tuner for BayesianTuner {
    fn propose(&mut self) -> Result<PipelineParameters> {
        if self.space.is_empty() {
            return Ok(self.space.to_parameters(&[]));
        }

        if self.history.len() < self.config.n_initial_points {
            let values = self.space.sample(&mut self.rng)?;
            return Ok(self.space.to_parameters(&values));
        }

        self.best_candidate()
    }

    fn add(&mut self, parameters: &PipelineParameters, score: f64) -> Result<()> {
        let values = self.space.extract(parameters)?;
        if !score.is_finite() {
            debug!(score, "Skipping non-finite score");
            return Ok(());
        }
        self.history.push((self.space.encode(&values), score));
        Ok(())
    }

    fn n_observations(&self) -> usize {
        self.history.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::search_space::{ComponentRanges, ParameterRange, ParameterValue};

    fn ranges() -> HyperparameterRanges {
        HyperparameterRanges::from([(
            "Mock Regressor".to_string(),
            ComponentRanges::from([("x".to_string(), ParameterRange::real(-5.0, 5.0))]),
        )])
    }

    fn x_of(params: &PipelineParameters) -> f64 {
        params["Mock Regressor"]["x"].as_float().unwrap()
    }

    #[test]
    fn test_matern_kernel() {
        let x1 = Array1::from_vec(vec![0.0]);
        let x2 = Array1::from_vec(vec![0.0]);
        let k = kernel_value(&x1, &x2, &KernelType::default());
        assert!((k - 1.0).abs() < 1e-6, "Same point should have kernel 1.0");
    }

    #[test]
    fn test_gp_fit_predict() {
        let mut gp = GaussianProcess::new(KernelType::RBF { length_scale: 1.0 });
        let x_train = Array2::from_shape_vec((5, 1), vec![-2.0, -1.0, 0.0, 1.0, 2.0]).unwrap();
        let y_train = Array1::from_vec(vec![4.0, 1.0, 0.0, 1.0, 4.0]);
        gp.fit(x_train, y_train).unwrap();

        let x_test = Array2::from_shape_vec((3, 1), vec![-1.5, 0.5, 1.5]).unwrap();
        let (mean, var) = gp.predict(&x_test).unwrap();
        assert_eq!(mean.len(), 3);
        assert!(var.iter().all(|&v| v > 0.0), "Variance should be positive");
    }

    #[test]
    fn test_unfitted_gp_errors() {
        let gp = GaussianProcess::new(KernelType::default());
        let x = Array2::zeros((1, 1));
        assert!(matches!(gp.predict(&x), Err(KolosalError::ComputationError(_))));
    }

    #[test]
    fn test_acquisition_ei() {
        let ei = AcquisitionFunction::EI.value(0.5, 0.1, 1.0);
        assert!(ei > 0.0, "EI should be positive when improvement is possible");
    }

    #[test]
    fn test_normal_cdf() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 0.01);
        assert!(normal_cdf(-3.0) < 0.01);
        assert!(normal_cdf(3.0) > 0.99);
    }

    #[test]
    fn test_tuner_is_deterministic() {
        let mut a = BayesianTuner::new(&ranges(), 7, BayesianTunerConfig::default()).unwrap();
        let mut b = BayesianTuner::new(&ranges(), 7, BayesianTunerConfig::default()).unwrap();
        for _ in 0..15 {
            let pa = a.propose().unwrap();
            let pb = b.propose().unwrap();
            assert_eq!(pa, pb);
            let x = x_of(&pa);
            a.add(&pa, x * x).unwrap();
            b.add(&pb, x * x).unwrap();
        }
    }

    #[test]
    fn test_tuner_uses_surrogate_after_startup() {
        let config = BayesianTunerConfig {
            n_initial_points: 5,
            n_candidates: 64,
            ..Default::default()
        };
        let mut tuner = BayesianTuner::new(&ranges(), 0, config).unwrap();

        let mut best = f64::INFINITY;
        for _ in 0..20 {
            let params = tuner.propose().unwrap();
            let x = x_of(&params);
            assert!((-5.0..=5.0).contains(&x));
            best = best.min(x * x);
            tuner.add(&params, x * x).unwrap();
        }
        assert_eq!(tuner.n_observations(), 20);
        assert!(best < 4.0, "should find a value < 4.0 for x^2, got {}", best);
    }

    #[test]
    fn test_tuner_handles_extreme_integer_width() {
        let ranges = HyperparameterRanges::from([(
            "Mock Regressor".to_string(),
            ComponentRanges::from([("seed".to_string(), ParameterRange::integer(i64::MIN, i64::MAX))]),
        )]);
        let config = BayesianTunerConfig {
            n_initial_points: 3,
            n_candidates: 16,
            ..Default::default()
        };
        let mut tuner = BayesianTuner::new(&ranges, 0, config).unwrap();
        for i in 0..6 {
            let params = tuner.propose().unwrap();
            assert!(params["Mock Regressor"]["seed"].as_int().is_some());
            tuner.add(&params, i as f64).unwrap();
        }
        assert_eq!(tuner.n_observations(), 6);
    }

    #[test]
    fn test_add_rejects_out_of_bounds() {
        let mut tuner = BayesianTuner::new(&ranges(), 0, BayesianTunerConfig::default()).unwrap();
        let mut params = tuner.propose().unwrap();
        params
            .get_mut("Mock Regressor")
            .unwrap()
            .insert("x".to_string(), ParameterValue::Float(50.0));

        assert!(matches!(
            tuner.add(&params, 1.0),
            Err(KolosalError::InvalidParameter { .. })
        ));
        assert_eq!(tuner.n_observations(), 0);
    }

    #[test]
    fn test_add_skips_nan_scores() {
        let mut tuner = BayesianTuner::new(&ranges(), 0, BayesianTunerConfig::default()).unwrap();
        let params = tuner.propose().unwrap();
        tuner.add(&params, f64::NAN).unwrap();
        assert_eq!(tuner.n_observations(), 0);
    }

    #[test]
    fn test_empty_space_proposes_empty_components() {
        let ranges = HyperparameterRanges::from([("Imputer".to_string(), ComponentRanges::new())]);
        let mut tuner = BayesianTuner::new(&ranges, 0, BayesianTunerConfig::default()).unwrap();
        let params = tuner.propose().unwrap();
        assert!(params["Imputer"].is_empty());
    }
}
