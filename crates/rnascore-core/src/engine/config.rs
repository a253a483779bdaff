use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_D0_FLOOR: f64 = 0.5;
pub const DEFAULT_SHORT_LENGTH_THRESHOLD: f64 = 15.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// How the TM-score sum is normalized.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Normalization {
    /// Reference (target) length.
    #[default]
    Target,
    /// Predicted structure length.
    Predicted,
    /// Mean of predicted and reference lengths.
    Average,
    /// An explicit length supplied by the caller.
    Fixed(f64),
}

impl Normalization {
    pub fn resolve(&self, predicted_len: usize, reference_len: usize) -> f64 {
        match *self {
            Normalization::Target => reference_len as f64,
            Normalization::Predicted => predicted_len as f64,
            Normalization::Average => (predicted_len + reference_len) as f64 / 2.0,
            Normalization::Fixed(length) => length,
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalization::Target => write!(f, "target"),
            Normalization::Predicted => write!(f, "predicted"),
            Normalization::Average => write!(f, "average"),
            Normalization::Fixed(length) => write!(f, "{}", length),
        }
    }
}

impl FromStr for Normalization {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "target" | "reference" => Ok(Normalization::Target),
            "predicted" | "pred" => Ok(Normalization::Predicted),
            "average" | "avg" => Ok(Normalization::Average),
            other => other
                .parse::<f64>()
                .map(Normalization::Fixed)
                .map_err(|_| ConfigError::InvalidValue {
                    name: "normalization",
                    value: s.to_string(),
                }),
        }
    }
}

/// Reduction applied to per-candidate scores against a single reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnsemblePolicy {
    /// Maximum candidate score, first-seen candidate wins ties.
    #[default]
    Best,
    /// Mean of all candidate scores.
    AvgOfBest,
    /// Score of the element-wise average candidate.
    BestOfAvg,
}

impl fmt::Display for EnsemblePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnsemblePolicy::Best => "best",
            EnsemblePolicy::AvgOfBest => "avg-of-best",
            EnsemblePolicy::BestOfAvg => "best-of-avg",
        };
        f.write_str(name)
    }
}

impl FromStr for EnsemblePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "best" => Ok(EnsemblePolicy::Best),
            "avg-of-best" => Ok(EnsemblePolicy::AvgOfBest),
            "best-of-avg" => Ok(EnsemblePolicy::BestOfAvg),
            _ => Err(ConfigError::InvalidValue {
                name: "policy",
                value: s.to_string(),
            }),
        }
    }
}

/// Reduction applied to a prediction-by-reference score matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnsembleMethod {
    #[default]
    BestOfBest,
    AvgOfBest,
    BestOfAvg,
}

impl fmt::Display for EnsembleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnsembleMethod::BestOfBest => "best-of-best",
            EnsembleMethod::AvgOfBest => "avg-of-best",
            EnsembleMethod::BestOfAvg => "best-of-avg",
        };
        f.write_str(name)
    }
}

impl FromStr for EnsembleMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "best-of-best" => Ok(EnsembleMethod::BestOfBest),
            "avg-of-best" => Ok(EnsembleMethod::AvgOfBest),
            "best-of-avg" => Ok(EnsembleMethod::BestOfAvg),
            _ => Err(ConfigError::InvalidValue {
                name: "method",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringConfig {
    pub normalization: Normalization,
    /// d0 used for short structures, and the lower bound of d0 in general.
    pub d0_floor: f64,
    /// Normalization lengths at or below this use `d0_floor` directly.
    pub short_length_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            normalization: Normalization::Target,
            d0_floor: DEFAULT_D0_FLOOR,
            short_length_threshold: DEFAULT_SHORT_LENGTH_THRESHOLD,
        }
    }
}

impl ScoringConfig {
    pub fn with_normalization(normalization: Normalization) -> Self {
        Self {
            normalization,
            ..Self::default()
        }
    }
}

#[derive(Default)]
pub struct ScoringConfigBuilder {
    normalization: Option<Normalization>,
    d0_floor: Option<f64>,
    short_length_threshold: Option<f64>,
}

impl ScoringConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = Some(normalization);
        self
    }
    pub fn d0_floor(mut self, floor: f64) -> Self {
        self.d0_floor = Some(floor);
        self
    }
    pub fn short_length_threshold(mut self, threshold: f64) -> Self {
        self.short_length_threshold = Some(threshold);
        self
    }

    pub fn build(self) -> Result<ScoringConfig, ConfigError> {
        let defaults = ScoringConfig::default();

        let d0_floor = self.d0_floor.unwrap_or(defaults.d0_floor);
        if !(d0_floor.is_finite() && d0_floor > 0.0) {
            return Err(ConfigError::InvalidValue {
                name: "d0_floor",
                value: d0_floor.to_string(),
            });
        }

        let short_length_threshold = self
            .short_length_threshold
            .unwrap_or(defaults.short_length_threshold);
        if !short_length_threshold.is_finite() || short_length_threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "short_length_threshold",
                value: short_length_threshold.to_string(),
            });
        }

        let normalization = self.normalization.unwrap_or(defaults.normalization);
        if let Normalization::Fixed(length) = normalization {
            if !(length.is_finite() && length > 0.0) {
                return Err(ConfigError::InvalidValue {
                    name: "normalization",
                    value: length.to_string(),
                });
            }
        }

        Ok(ScoringConfig {
            normalization,
            d0_floor,
            short_length_threshold,
        })
    }
}
