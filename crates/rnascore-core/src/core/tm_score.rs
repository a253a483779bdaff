//! Length-normalized TM-score between a predicted structure and its reference.
//!
//! ```text
//! TM = (1 / L_norm) * Σ 1 / (1 + (d_i / d0)^2)
//! d0 = 1.24 * (L_norm - 15)^(1/3) - 1.8
//! ```
//!
//! The prediction is always superposed onto the reference first, so the score does not
//! depend on the input frames.

use super::superposition::{Alignment, align};
use crate::engine::config::ScoringConfig;
use crate::engine::error::ScoreError;
use nalgebra::Point3;
use serde::Serialize;

const D0_COEFFICIENT: f64 = 1.24;
const D0_OFFSET: f64 = 1.8;

/// Full result of one prediction/reference comparison.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreReport {
    pub tm_score: f64,
    pub rmsd: f64,
    pub mean_distance: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub d0: f64,
    pub l_norm: f64,
    pub distances: Vec<f64>,
    #[serde(skip)]
    pub alignment: Alignment,
}

/// Distance scale for a normalization length.
///
/// Lengths at or below the configured threshold use the floor directly. The floor is
/// also a lower bound for longer structures, because the formula is negative just above
/// the threshold (L = 16 gives -0.56).
pub fn d0_for_length(l_norm: f64, config: &ScoringConfig) -> f64 {
    if l_norm <= config.short_length_threshold {
        return config.d0_floor;
    }
    let d0 = D0_COEFFICIENT * (l_norm - 15.0).cbrt() - D0_OFFSET;
    d0.max(config.d0_floor)
}

/// TM-score of `predicted` against `reference`.
///
/// # Errors
///
/// [`ScoreError::DimensionMismatch`] for unequal or empty sets,
/// [`ScoreError::InvalidLength`] for a non-positive normalization length and
/// [`ScoreError::InvalidD0Floor`] for a non-positive d0 floor.
pub fn score(
    predicted: &[Point3<f64>],
    reference: &[Point3<f64>],
    config: &ScoringConfig,
) -> Result<f64, ScoreError> {
    score_detailed(predicted, reference, config).map(|report| report.tm_score)
}

pub fn score_detailed(
    predicted: &[Point3<f64>],
    reference: &[Point3<f64>],
    config: &ScoringConfig,
) -> Result<ScoreReport, ScoreError> {
    ScoreError::check_lengths(predicted.len(), reference.len())?;

    let l_norm = config
        .normalization
        .resolve(predicted.len(), reference.len());
    if !(l_norm.is_finite() && l_norm > 0.0) {
        return Err(ScoreError::InvalidLength(l_norm));
    }
    // Configs built without the builder are not validated; a zero floor would zero the score.
    if !(config.d0_floor.is_finite() && config.d0_floor > 0.0) {
        return Err(ScoreError::InvalidD0Floor(config.d0_floor));
    }

    let alignment = align(predicted, reference)?;
    let distances = alignment.distances_to(reference);
    let d0 = d0_for_length(l_norm, config);

    Ok(build_report(alignment, distances, d0, l_norm))
}

/// Sum of the per-point TM terms for the given distances.
pub fn tm_sum(distances: &[f64], d0: f64) -> f64 {
    let d0_sq = d0 * d0;
    distances
        .iter()
        .map(|d| 1.0 / (1.0 + d * d / d0_sq))
        .sum()
}

fn build_report(alignment: Alignment, distances: Vec<f64>, d0: f64, l_norm: f64) -> ScoreReport {
    let n = distances.len() as f64;
    // A fixed normalization shorter than the structure could push the raw value past 1.
    let tm_score = (tm_sum(&distances, d0) / l_norm).min(1.0);

    let mean_distance = distances.iter().sum::<f64>() / n;
    let rmsd = (distances.iter().map(|d| d * d).sum::<f64>() / n).sqrt();
    let min_distance = distances.iter().copied().fold(f64::INFINITY, f64::min);
    let max_distance = distances.iter().copied().fold(0.0, f64::max);

    ScoreReport {
        tm_score,
        rmsd,
        mean_distance,
        min_distance,
        max_distance,
        d0,
        l_norm,
        distances,
        alignment,
    }
}
