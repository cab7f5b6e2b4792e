//! Hyperparameter ranges, parameter values and the flat search space tuners work on

use crate::error::{KolosalError, Result};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A concrete parameter value handed to a pipeline component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ParameterValue>),
}

impl ParameterValue {
    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Get as int
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParameterValue::Int(v) => Some(*v),
            ParameterValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Get as string
    pub fn as_string(&self) -> Option<&str> {
        match self {
            ParameterValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ParameterValue::None)
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::None => write!(f, "None"),
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::String(v) => write!(f, "{}", v),
            ParameterValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Float(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::String(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::String(v)
    }
}

impl From<Vec<String>> for ParameterValue {
    fn from(v: Vec<String>) -> Self {
        ParameterValue::List(v.into_iter().map(ParameterValue::String).collect())
    }
}

/// Range (or categorical domain) a single hyperparameter may take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParameterRange {
    /// Inclusive integer range
    Integer { low: i64, high: i64 },
    /// Continuous range, optionally sampled on a log scale
    Real {
        low: f64,
        high: f64,
        #[serde(default)]
        log_scale: bool,
    },
    /// Discrete set of choices
    Categorical { choices: Vec<ParameterValue> },
    /// Sub-mapping of ranges, only meaningful for ensemble ensemblers
    Nested(BTreeMap<String, ParameterRange>),
}

impl ParameterRange {
    pub fn integer(low: i64, high: i64) -> Self {
        ParameterRange::Integer { low, high }
    }

    pub fn real(low: f64, high: f64) -> Self {
        ParameterRange::Real {
            low,
            high,
            log_scale: false,
        }
    }

    pub fn log_real(low: f64, high: f64) -> Self {
        ParameterRange::Real {
            low,
            high,
            log_scale: true,
        }
    }

    pub fn categorical<I, V>(choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParameterValue>,
    {
        ParameterRange::Categorical {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    pub fn nested<I, K>(ranges: I) -> Self
    where
        I: IntoIterator<Item = (K, ParameterRange)>,
        K: Into<String>,
    {
        ParameterRange::Nested(ranges.into_iter().map(|(k, r)| (k.into(), r)).collect())
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, ParameterRange::Nested(_))
    }

    /// Sample a random value
    pub fn sample(&self, rng: &mut impl Rng) -> Result<ParameterValue> {
        match self {
            ParameterRange::Integer { low, high } => {
                if low > high {
                    return Err(empty_range_error(self));
                }
                Ok(ParameterValue::Int(rng.gen_range(*low..=*high)))
            }
            ParameterRange::Real { low, high, log_scale } => {
                if low > high || (*log_scale && *low <= 0.0) {
                    return Err(empty_range_error(self));
                }
                let val = if *log_scale {
                    let log_low = low.ln();
                    let log_high = high.ln();
                    (rng.gen::<f64>() * (log_high - log_low) + log_low).exp()
                } else {
                    rng.gen::<f64>() * (high - low) + low
                };
                Ok(ParameterValue::Float(val))
            }
            ParameterRange::Categorical { choices } => {
                if choices.is_empty() {
                    return Err(empty_range_error(self));
                }
                let idx = rng.gen_range(0..choices.len());
                Ok(choices[idx].clone())
            }
            ParameterRange::Nested(_) => Err(KolosalError::ConfigError(
                "cannot sample a nested range; flatten it first".to_string(),
            )),
        }
    }

    /// Whether `value` lies inside this range
    pub fn contains(&self, value: &ParameterValue) -> bool {
        match self {
            ParameterRange::Integer { low, high } => value
                .as_int()
                .map(|v| v >= *low && v <= *high)
                .unwrap_or(false),
            ParameterRange::Real { low, high, .. } => value
                .as_float()
                .map(|v| v >= *low && v <= *high)
                .unwrap_or(false),
            ParameterRange::Categorical { choices } => choices.contains(value),
            ParameterRange::Nested(_) => false,
        }
    }

    /// Map a value inside the range onto [0, 1]
    pub fn to_unit(&self, value: &ParameterValue) -> Option<f64> {
        match self {
            ParameterRange::Integer { low, high } => {
                let v = value.as_int()?;
                if high == low {
                    Some(0.5)
                } else {
                    let offset = v as i128 - *low as i128;
                    let width = *high as i128 - *low as i128;
                    Some(offset as f64 / width as f64)
                }
            }
            ParameterRange::Real { low, high, log_scale } => {
                let v = value.as_float()?;
                if (high - low).abs() < f64::EPSILON {
                    return Some(0.5);
                }
                if *log_scale {
                    Some((v.ln() - low.ln()) / (high.ln() - low.ln()))
                } else {
                    Some((v - low) / (high - low))
                }
            }
            ParameterRange::Categorical { choices } => {
                let idx = choices.iter().position(|c| c == value)?;
                if choices.len() == 1 {
                    Some(0.5)
                } else {
                    Some(idx as f64 / (choices.len() - 1) as f64)
                }
            }
            ParameterRange::Nested(_) => None,
        }
    }

    /// Evenly spaced points covering the range
    pub fn grid_points(&self, n_points: usize) -> Vec<ParameterValue> {
        match self {
            ParameterRange::Integer { low, high } => {
                if n_points <= 1 || low == high {
                    return vec![ParameterValue::Int(*low)];
                }
                let width = (*high as i128 - *low as i128) as f64;
                let mut points: Vec<i64> = (0..n_points)
                    .map(|i| {
                        let t = i as f64 / (n_points - 1) as f64;
                        let point = (*low as f64 + t * width).round();
                        point.clamp(*low as f64, *high as f64) as i64
                    })
                    .collect();
                points.dedup();
                points.into_iter().map(ParameterValue::Int).collect()
            }
            ParameterRange::Real { low, high, log_scale } => {
                if n_points <= 1 {
                    return vec![ParameterValue::Float(*low)];
                }
                (0..n_points)
                    .map(|i| {
                        let t = i as f64 / (n_points - 1) as f64;
                        let value = if *log_scale {
                            let log_low = low.ln();
                            let log_high = high.ln();
                            (log_low + t * (log_high - log_low)).exp()
                        } else {
                            low + t * (high - low)
                        };
                        ParameterValue::Float(value)
                    })
                    .collect()
            }
            ParameterRange::Categorical { choices } => choices.clone(),
            ParameterRange::Nested(_) => Vec::new(),
        }
    }
}

fn empty_range_error(range: &ParameterRange) -> KolosalError {
    KolosalError::ConfigError(format!("range {:?} contains no values", range))
}

/// Parameter name -> range for one component
pub type ComponentRanges = BTreeMap<String, ParameterRange>;

/// Component name -> ranges for a whole pipeline architecture
pub type HyperparameterRanges = BTreeMap<String, ComponentRanges>;

/// Parameter name -> value for one component
pub type ComponentParameters = BTreeMap<String, ParameterValue>;

/// Component name -> parameters for a whole pipeline
pub type PipelineParameters = BTreeMap<String, ComponentParameters>;

/// Flatten nested range sub-mappings into `"<parameter>_<key>"` entries.
///
/// Applied to ensemble architectures, whose ensembler declares one nested
/// mapping per candidate final estimator. Non-nested entries (for example the
/// `final_estimator` categorical) are kept as they are.
pub fn flatten_nested_ranges(ranges: &HyperparameterRanges) -> HyperparameterRanges {
    ranges
        .iter()
        .map(|(component, component_ranges)| {
            let mut flattened = ComponentRanges::new();
            for (parameter, range) in component_ranges {
                flatten_into(&mut flattened, parameter, range);
            }
            (component.clone(), flattened)
        })
        .collect()
}

fn flatten_into(out: &mut ComponentRanges, prefix: &str, range: &ParameterRange) {
    match range {
        ParameterRange::Nested(sub) => {
            for (key, value) in sub {
                flatten_into(out, &format!("{}_{}", prefix, key), value);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

/// One tunable dimension of a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub component: String,
    pub parameter: String,
    pub range: ParameterRange,
}

/// Flat search space over every `(component, parameter)` pair of a pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchSpace {
    components: Vec<String>,
    dimensions: Vec<Dimension>,
}

impl SearchSpace {
    /// Build the flat space from a component-keyed range mapping
    pub fn from_ranges(ranges: &HyperparameterRanges) -> Result<Self> {
        let mut dimensions = Vec::new();
        for (component, component_ranges) in ranges {
            for (parameter, range) in component_ranges {
                if range.is_nested() {
                    return Err(KolosalError::ConfigError(format!(
                        "nested range for {}.{} must be flattened before tuning",
                        component, parameter
                    )));
                }
                dimensions.push(Dimension {
                    component: component.clone(),
                    parameter: parameter.clone(),
                    range: range.clone(),
                });
            }
        }

        Ok(Self {
            components: ranges.keys().cloned().collect(),
            dimensions,
        })
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Number of tunable dimensions
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Sample one value per dimension
    pub fn sample(&self, rng: &mut impl Rng) -> Result<Vec<ParameterValue>> {
        self.dimensions.iter().map(|d| d.range.sample(rng)).collect()
    }

    /// Turn one value per dimension back into pipeline parameters.
    ///
    /// Every component of the space gets an entry, even without tunable
    /// dimensions.
    pub fn to_parameters(&self, values: &[ParameterValue]) -> PipelineParameters {
        let mut parameters: PipelineParameters = self
            .components
            .iter()
            .map(|c| (c.clone(), ComponentParameters::new()))
            .collect();

        for (dimension, value) in self.dimensions.iter().zip(values) {
            parameters
                .entry(dimension.component.clone())
                .or_default()
                .insert(dimension.parameter.clone(), value.clone());
        }
        parameters
    }

    /// Pull the value of every dimension out of pipeline parameters
    pub fn extract(&self, parameters: &PipelineParameters) -> Result<Vec<ParameterValue>> {
        self.dimensions
            .iter()
            .map(|d| {
                let value = parameters
                    .get(&d.component)
                    .and_then(|c| c.get(&d.parameter))
                    .ok_or_else(|| KolosalError::InvalidParameter {
                        name: format!("{}.{}", d.component, d.parameter),
                        value: "missing".to_string(),
                        reason: "pipeline parameters missing required field".to_string(),
                    })?;

                if !d.range.contains(value) {
                    return Err(KolosalError::InvalidParameter {
                        name: format!("{}.{}", d.component, d.parameter),
                        value: value.to_string(),
                        reason: "is not within the bounds of the space".to_string(),
                    });
                }
                Ok(value.clone())
            })
            .collect()
    }

    /// Encode values onto the unit hypercube
    pub fn encode(&self, values: &[ParameterValue]) -> Vec<f64> {
        self.dimensions
            .iter()
            .zip(values)
            .map(|(d, v)| d.range.to_unit(v).unwrap_or(0.5))
            .collect()
    }
}
