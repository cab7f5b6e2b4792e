//! Problem types and model families

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supervised learning problem a pipeline solves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemType {
    /// Binary classification
    Binary,
    /// Multi-class classification
    Multiclass,
    /// Regression
    Regression,
    /// Time series binary classification
    TimeSeriesBinary,
    /// Time series multi-class classification
    TimeSeriesMulticlass,
    /// Time series regression
    TimeSeriesRegression,
}

impl ProblemType {
    pub fn is_classification(&self) -> bool {
        matches!(
            self,
            ProblemType::Binary
                | ProblemType::Multiclass
                | ProblemType::TimeSeriesBinary
                | ProblemType::TimeSeriesMulticlass
        )
    }

    pub fn is_regression(&self) -> bool {
        !self.is_classification()
    }

    pub fn is_time_series(&self) -> bool {
        matches!(
            self,
            ProblemType::TimeSeriesBinary
                | ProblemType::TimeSeriesMulticlass
                | ProblemType::TimeSeriesRegression
        )
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProblemType::Binary => "binary",
            ProblemType::Multiclass => "multiclass",
            ProblemType::Regression => "regression",
            ProblemType::TimeSeriesBinary => "time series binary",
            ProblemType::TimeSeriesMulticlass => "time series multiclass",
            ProblemType::TimeSeriesRegression => "time series regression",
        };
        write!(f, "{}", name)
    }
}

/// Coarse estimator category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    RandomForest,
    ExtraTrees,
    DecisionTree,
    XGBoost,
    LightGBM,
    CatBoost,
    LinearModel,
    SVM,
    KNN,
    NaiveBayes,
    ARIMA,
    Prophet,
    /// Stacked ensembles built by the search itself
    Ensemble,
    /// Naive reference pipelines
    Baseline,
    /// No estimator
    None,
}

impl ModelFamily {
    /// Baseline and estimator-less pipelines are never stacked
    pub fn is_stackable(&self) -> bool {
        !matches!(self, ModelFamily::Baseline | ModelFamily::None)
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelFamily::RandomForest => "Random Forest",
            ModelFamily::ExtraTrees => "Extra Trees",
            ModelFamily::DecisionTree => "Decision Tree",
            ModelFamily::XGBoost => "XGBoost",
            ModelFamily::LightGBM => "LightGBM",
            ModelFamily::CatBoost => "CatBoost",
            ModelFamily::LinearModel => "Linear",
            ModelFamily::SVM => "SVM",
            ModelFamily::KNN => "K Nearest Neighbors",
            ModelFamily::NaiveBayes => "Naive Bayes",
            ModelFamily::ARIMA => "ARIMA",
            ModelFamily::Prophet => "Prophet",
            ModelFamily::Ensemble => "Ensemble",
            ModelFamily::Baseline => "Baseline",
            ModelFamily::None => "None",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_type_kind() {
        assert!(ProblemType::Binary.is_classification());
        assert!(ProblemType::TimeSeriesMulticlass.is_classification());
        assert!(ProblemType::Regression.is_regression());
        assert!(ProblemType::TimeSeriesRegression.is_time_series());
        assert!(!ProblemType::Binary.is_time_series());
    }

    #[test]
    fn test_stackable_families() {
        assert!(ModelFamily::RandomForest.is_stackable());
        assert!(!ModelFamily::Baseline.is_stackable());
        assert!(!ModelFamily::None.is_stackable());
    }
}
