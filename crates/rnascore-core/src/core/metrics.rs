//! Auxiliary structure-quality metrics.
//!
//! Apart from [`StructureMetrics::compute`], none of these superpose their inputs: pass
//! coordinates that are already in a common frame (e.g. [`Alignment::aligned`]), or use
//! the superposition-free ones ([`lddt`], [`pairwise_distance_accuracy`],
//! [`clash_count`]).
//!
//! [`Alignment::aligned`]: super::superposition::Alignment::aligned

use super::tm_score::score_detailed;
use crate::engine::config::ScoringConfig;
use crate::engine::error::ScoreError;
use itertools::Itertools;
use nalgebra::Point3;
use serde::Serialize;

pub const GDT_TS_CUTOFFS: [f64; 4] = [1.0, 2.0, 4.0, 8.0];
pub const LDDT_THRESHOLDS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];
pub const DEFAULT_LDDT_CUTOFF: f64 = 15.0;
pub const DEFAULT_PAIRWISE_THRESHOLD: f64 = 2.0;
pub const DEFAULT_CLASH_THRESHOLD: f64 = 2.0;

fn pointwise_distances(
    a: &[Point3<f64>],
    b: &[Point3<f64>],
) -> Result<Vec<f64>, ScoreError> {
    ScoreError::check_lengths(a.len(), b.len())?;
    Ok(a.iter().zip(b.iter()).map(|(p, q)| (p - q).norm()).collect())
}

pub fn rmsd(a: &[Point3<f64>], b: &[Point3<f64>]) -> Result<f64, ScoreError> {
    let distances = pointwise_distances(a, b)?;
    let mean_sq = distances.iter().map(|d| d * d).sum::<f64>() / distances.len() as f64;
    Ok(mean_sq.sqrt())
}

/// Global Distance Test total score, 0–100.
pub fn gdt_ts(a: &[Point3<f64>], b: &[Point3<f64>]) -> Result<f64, ScoreError> {
    let distances = pointwise_distances(a, b)?;
    let n = distances.len() as f64;
    let total: f64 = GDT_TS_CUTOFFS
        .iter()
        .map(|&cutoff| distances.iter().filter(|&&d| d < cutoff).count() as f64 / n * 100.0)
        .sum();
    Ok(total / GDT_TS_CUTOFFS.len() as f64)
}

/// Local Distance Difference Test, 0–1.
///
/// Considers every pair whose reference distance lies in `(0, cutoff)` and averages the
/// fraction preserved within each of [`LDDT_THRESHOLDS`]. Returns 0.0 when no pair
/// qualifies.
pub fn lddt(
    predicted: &[Point3<f64>],
    reference: &[Point3<f64>],
    cutoff: f64,
) -> Result<f64, ScoreError> {
    ScoreError::check_lengths(predicted.len(), reference.len())?;

    let diffs: Vec<f64> = (0..reference.len())
        .tuple_combinations::<(usize, usize)>()
        .filter_map(|(i, j)| {
            let ref_dist = (reference[i] - reference[j]).norm();
            (ref_dist > 0.0 && ref_dist < cutoff).then(|| {
                let pred_dist = (predicted[i] - predicted[j]).norm();
                (ref_dist - pred_dist).abs()
            })
        })
        .collect();

    if diffs.is_empty() {
        return Ok(0.0);
    }

    let total = diffs.len() as f64;
    let preserved: f64 = LDDT_THRESHOLDS
        .iter()
        .map(|&t| diffs.iter().filter(|&&d| d < t).count() as f64 / total)
        .sum();
    Ok(preserved / LDDT_THRESHOLDS.len() as f64)
}

/// Percentage of residue pairs whose internal distance is reproduced within `threshold`.
pub fn pairwise_distance_accuracy(
    predicted: &[Point3<f64>],
    reference: &[Point3<f64>],
    threshold: f64,
) -> Result<f64, ScoreError> {
    ScoreError::check_lengths(predicted.len(), reference.len())?;

    let (within, total) = (0..reference.len()).tuple_combinations::<(usize, usize)>().fold(
        (0usize, 0usize),
        |(within, total), (i, j)| {
            let diff = ((reference[i] - reference[j]).norm()
                - (predicted[i] - predicted[j]).norm())
            .abs();
            (within + usize::from(diff < threshold), total + 1)
        },
    );

    if total == 0 {
        return Ok(0.0);
    }
    Ok(within as f64 / total as f64 * 100.0)
}

/// Number of atom pairs closer than `threshold` (coincident atoms are not counted).
pub fn clash_count(points: &[Point3<f64>], threshold: f64) -> usize {
    points
        .iter()
        .tuple_combinations::<(&Point3<f64>, &Point3<f64>)>()
        .filter(|(a, b)| {
            let d = (*a - *b).norm();
            d > 0.0 && d < threshold
        })
        .count()
}

/// Every metric for one structure, optionally against a reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureMetrics {
    pub clash_count: usize,
    pub tm_score: Option<f64>,
    pub rmsd: Option<f64>,
    pub gdt_ts: Option<f64>,
    pub lddt: Option<f64>,
    pub pairwise_accuracy: Option<f64>,
}

impl StructureMetrics {
    /// Computes all metrics. With a reference, the prediction is superposed onto it
    /// first, so RMSD and GDT-TS are post-superposition values.
    pub fn compute(
        predicted: &[Point3<f64>],
        reference: Option<&[Point3<f64>]>,
        config: &ScoringConfig,
    ) -> Result<Self, ScoreError> {
        let clash_count = clash_count(predicted, DEFAULT_CLASH_THRESHOLD);

        let Some(reference) = reference else {
            return Ok(Self {
                clash_count,
                tm_score: None,
                rmsd: None,
                gdt_ts: None,
                lddt: None,
                pairwise_accuracy: None,
            });
        };

        let report = score_detailed(predicted, reference, config)?;
        let aligned = &report.alignment.aligned;

        Ok(Self {
            clash_count,
            tm_score: Some(report.tm_score),
            rmsd: Some(report.rmsd),
            gdt_ts: Some(gdt_ts(aligned, reference)?),
            lddt: Some(lddt(predicted, reference, DEFAULT_LDDT_CUTOFF)?),
            pairwise_accuracy: Some(pairwise_distance_accuracy(
                predicted,
                reference,
                DEFAULT_PAIRWISE_THRESHOLD,
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Vector3};

    const TOLERANCE: f64 = 1e-9;

    fn line(n: usize, spacing: f64) -> Vec<Point3<f64>> {
        (0..n)
            .map(|i| Point3::new(i as f64 * spacing, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn rmsd_of_uniform_shift_is_shift_length() {
        let a = line(5, 3.0);
        let b: Vec<_> = a.iter().map(|p| p + Vector3::new(0.0, 3.0, 4.0)).collect();
        assert!((rmsd(&a, &b).unwrap() - 5.0).abs() < TOLERANCE);
    }

    #[test]
    fn rmsd_rejects_mismatched_lengths() {
        assert!(matches!(
            rmsd(&line(3, 1.0), &line(4, 1.0)),
            Err(ScoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn gdt_ts_counts_points_under_each_cutoff() {
        let reference = line(4, 10.0);
        let offsets = [0.5, 1.5, 3.0, 9.0];
        let predicted: Vec<_> = reference
            .iter()
            .zip(offsets)
            .map(|(p, d)| p + Vector3::new(0.0, d, 0.0))
            .collect();

        // <1: 1/4, <2: 2/4, <4: 3/4, <8: 3/4
        let expected = (25.0 + 50.0 + 75.0 + 75.0) / 4.0;
        assert!((gdt_ts(&predicted, &reference).unwrap() - expected).abs() < TOLERANCE);
    }

    #[test]
    fn gdt_ts_of_identical_structures_is_one_hundred() {
        let coords = line(6, 4.0);
        assert!((gdt_ts(&coords, &coords).unwrap() - 100.0).abs() < TOLERANCE);
    }

    #[test]
    fn lddt_is_invariant_under_rigid_motion() {
        let reference = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.8, 0.0, 0.0),
            Point3::new(5.0, 3.5, 0.0),
            Point3::new(4.0, 6.0, 2.5),
            Point3::new(1.0, 7.0, 4.0),
        ];
        let rotation = Rotation3::from_euler_angles(0.4, 1.2, -0.7);
        let moved: Vec<_> = reference
            .iter()
            .map(|p| rotation * p + Vector3::new(50.0, -10.0, 3.0))
            .collect();

        assert!((lddt(&moved, &reference, 15.0).unwrap() - 1.0).abs() < TOLERANCE);
    }

    #[test]
    fn lddt_without_pairs_in_cutoff_is_zero() {
        let reference = line(3, 100.0);
        assert_eq!(lddt(&reference, &reference, 15.0).unwrap(), 0.0);
    }

    #[test]
    fn lddt_penalizes_stretched_distances() {
        let reference = line(4, 3.0);
        let stretched = line(4, 4.5);
        let score = lddt(&stretched, &reference, 15.0).unwrap();
        assert!(score < 1.0 && score > 0.0);
    }

    #[test]
    fn pairwise_accuracy_of_single_point_is_zero() {
        let p = vec![Point3::origin()];
        assert_eq!(pairwise_distance_accuracy(&p, &p, 2.0).unwrap(), 0.0);
    }

    #[test]
    fn pairwise_accuracy_counts_preserved_pairs() {
        let reference = line(3, 5.0);
        // Pair (0,1) distance 5 vs 5, (1,2) 5 vs 8, (0,2) 10 vs 13.
        let predicted = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(13.0, 0.0, 0.0),
        ];
        let accuracy = pairwise_distance_accuracy(&predicted, &reference, 2.0).unwrap();
        assert!((accuracy - 100.0 / 3.0).abs() < TOLERANCE);
    }

    #[test]
    fn clash_count_ignores_coincident_atoms() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(10.0, 0.0, 0.0),
        ];
        // (0,1) and (1,2) clash; (0,2) coincide.
        assert_eq!(clash_count(&points, 2.0), 2);
    }

    #[test]
    fn structure_metrics_without_reference_only_counts_clashes() {
        let metrics =
            StructureMetrics::compute(&line(4, 1.0), None, &ScoringConfig::default()).unwrap();
        assert_eq!(metrics.clash_count, 3);
        assert!(metrics.tm_score.is_none());
        assert!(metrics.lddt.is_none());
    }

    #[test]
    fn structure_metrics_superpose_before_comparing() {
        let reference = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.8, 0.0, 0.0),
            Point3::new(5.0, 3.5, 0.0),
            Point3::new(4.0, 6.0, 2.5),
        ];
        let rotation = Rotation3::from_euler_angles(0.3, -0.6, 2.0);
        let predicted: Vec<_> = reference
            .iter()
            .map(|p| rotation * p + Vector3::new(-8.0, 2.0, 11.0))
            .collect();

        let metrics =
            StructureMetrics::compute(&predicted, Some(&reference), &ScoringConfig::default())
                .unwrap();

        assert!((metrics.tm_score.unwrap() - 1.0).abs() < 1e-6);
        assert!(metrics.rmsd.unwrap() < 1e-6);
        assert!((metrics.gdt_ts.unwrap() - 100.0).abs() < TOLERANCE);
        assert!((metrics.pairwise_accuracy.unwrap() - 100.0).abs() < TOLERANCE);
    }
}
