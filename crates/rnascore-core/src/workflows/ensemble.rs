use crate::core::models::{PointSet, average_point_set};
use crate::core::tm_score::score;
use crate::engine::config::{EnsembleMethod, EnsemblePolicy, ScoringConfig};
use crate::engine::error::ScoreError;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A structure that can be scored against a reference of the same kind and averaged
/// with its peers.
///
/// Implemented for single point sets and for [`ChainSet`](crate::ChainSet)s, so every
/// reduction in this module works for both.
pub trait Comparable: Sized + Sync {
    fn tm_score(&self, reference: &Self, config: &ScoringConfig) -> Result<f64, ScoreError>;

    /// Element-wise mean of `members`.
    fn mean_of(members: &[Self]) -> Result<Self, ScoreError>;
}

impl Comparable for PointSet {
    fn tm_score(&self, reference: &Self, config: &ScoringConfig) -> Result<f64, ScoreError> {
        score(self, reference, config)
    }

    fn mean_of(members: &[Self]) -> Result<Self, ScoreError> {
        let first = members.first().ok_or(ScoreError::EmptyEnsemble)?;
        if let Some(odd) = members.iter().find(|m| m.len() != first.len()) {
            return Err(ScoreError::DimensionMismatch {
                predicted: odd.len(),
                reference: first.len(),
            });
        }
        average_point_set(members).ok_or(ScoreError::EmptyEnsemble)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleScore {
    pub tm_score: f64,
    pub policy: EnsemblePolicy,
    /// Winning candidate under [`EnsemblePolicy::Best`].
    pub best_index: Option<usize>,
    /// One score per candidate in input order. Empty for [`EnsemblePolicy::BestOfAvg`].
    pub candidate_scores: Vec<f64>,
}

/// Prediction-by-reference evaluation of two ensembles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleEvaluation {
    pub tm_score: f64,
    pub method: EnsembleMethod,
    pub best_prediction: Option<usize>,
    pub best_reference: Option<usize>,
    /// `scores[i][j]` is prediction `i` against reference `j`. Under
    /// [`EnsembleMethod::BestOfAvg`] there is a single column: the averaged reference.
    pub scores: Vec<Vec<f64>>,
}

/// One prediction against every member of a reference ensemble.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceSummary {
    pub best: f64,
    pub mean: f64,
    pub worst: f64,
    pub std_dev: f64,
    pub best_index: usize,
    pub scores: Vec<f64>,
}

/// Highest score and its index. Ties keep the earliest index.
pub fn best_score(scores: &[f64]) -> Option<(usize, f64)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (index, value)| match best {
            Some((_, current)) if !(value > current) => best,
            _ => Some((index, value)),
        })
}

pub fn mean_score(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Scores every candidate against `reference`, preserving input order.
///
/// # Errors
///
/// The first candidate that fails to score aborts the whole call.
pub fn candidate_scores<T: Comparable>(
    candidates: &[T],
    reference: &T,
    config: &ScoringConfig,
) -> Result<Vec<f64>, ScoreError> {
    #[cfg(not(feature = "parallel"))]
    let iterator = candidates.iter();

    #[cfg(feature = "parallel")]
    let iterator = candidates.par_iter();

    iterator
        .map(|candidate| candidate.tm_score(reference, config))
        .collect()
}

#[instrument(skip_all, name = "ensemble_scoring", fields(policy = %policy))]
pub fn score_ensemble<T: Comparable>(
    candidates: &[T],
    reference: &T,
    policy: EnsemblePolicy,
    config: &ScoringConfig,
) -> Result<EnsembleScore, ScoreError> {
    if candidates.is_empty() {
        return Err(ScoreError::EmptyEnsemble);
    }
    debug!(candidates = candidates.len(), "Scoring candidate ensemble.");

    let result = match policy {
        EnsemblePolicy::Best => {
            let scores = candidate_scores(candidates, reference, config)?;
            let (index, tm_score) = best_score(&scores).ok_or(ScoreError::EmptyEnsemble)?;
            EnsembleScore {
                tm_score,
                policy,
                best_index: Some(index),
                candidate_scores: scores,
            }
        }
        EnsemblePolicy::AvgOfBest => {
            let scores = candidate_scores(candidates, reference, config)?;
            let tm_score = mean_score(&scores).ok_or(ScoreError::EmptyEnsemble)?;
            EnsembleScore {
                tm_score,
                policy,
                best_index: None,
                candidate_scores: scores,
            }
        }
        EnsemblePolicy::BestOfAvg => {
            let averaged = T::mean_of(candidates)?;
            EnsembleScore {
                tm_score: averaged.tm_score(reference, config)?,
                policy,
                best_index: None,
                candidate_scores: Vec::new(),
            }
        }
    };

    debug!(
        tm_score = result.tm_score,
        best_index = ?result.best_index,
        "Ensemble reduced."
    );
    Ok(result)
}

pub fn score_ensemble_value<T: Comparable>(
    candidates: &[T],
    reference: &T,
    policy: EnsemblePolicy,
    config: &ScoringConfig,
) -> Result<f64, ScoreError> {
    score_ensemble(candidates, reference, policy, config).map(|result| result.tm_score)
}

/// Scores a pair for matrix-style evaluations, where one failing pair must not sink the
/// rest: failures are logged and recorded as 0.0.
fn lenient_score<T: Comparable>(
    prediction: &T,
    reference: &T,
    config: &ScoringConfig,
    (i, j): (usize, usize),
) -> f64 {
    prediction
        .tm_score(reference, config)
        .unwrap_or_else(|e| {
            warn!(prediction = i, reference = j, error = %e, "Pair failed to score; recording 0.0.");
            0.0
        })
}

fn score_matrix<T: Comparable>(
    predictions: &[T],
    references: &[T],
    config: &ScoringConfig,
) -> Vec<Vec<f64>> {
    let row = |(i, prediction): (usize, &T)| -> Vec<f64> {
        references
            .iter()
            .enumerate()
            .map(|(j, reference)| lenient_score(prediction, reference, config, (i, j)))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let rows = predictions.iter().enumerate().map(row).collect();

    #[cfg(feature = "parallel")]
    let rows = predictions.par_iter().enumerate().map(row).collect();

    rows
}

/// Evaluates an ensemble of predictions against an ensemble of references.
///
/// # Errors
///
/// [`ScoreError::EmptyEnsemble`] if either side is empty. Under
/// [`EnsembleMethod::BestOfAvg`], references that cannot be averaged propagate their
/// error. Individual pairs never fail the call.
#[instrument(skip_all, name = "ensemble_evaluation", fields(method = %method))]
pub fn evaluate_ensembles<T: Comparable>(
    predictions: &[T],
    references: &[T],
    method: EnsembleMethod,
    config: &ScoringConfig,
) -> Result<EnsembleEvaluation, ScoreError> {
    if predictions.is_empty() || references.is_empty() {
        return Err(ScoreError::EmptyEnsemble);
    }
    debug!(
        predictions = predictions.len(),
        references = references.len(),
        "Evaluating ensemble against ensemble."
    );

    let evaluation = match method {
        EnsembleMethod::BestOfBest => {
            let scores = score_matrix(predictions, references, config);
            let (best_prediction, best_reference, tm_score) = scores
                .iter()
                .enumerate()
                .flat_map(|(i, row)| row.iter().enumerate().map(move |(j, &s)| (i, j, s)))
                .fold(None, |best, (i, j, s)| match best {
                    Some((_, _, current)) if !(s > current) => best,
                    _ => Some((i, j, s)),
                })
                .ok_or(ScoreError::EmptyEnsemble)?;
            EnsembleEvaluation {
                tm_score,
                method,
                best_prediction: Some(best_prediction),
                best_reference: Some(best_reference),
                scores,
            }
        }
        EnsembleMethod::AvgOfBest => {
            let scores = score_matrix(predictions, references, config);
            let best_per_reference: Vec<f64> = (0..references.len())
                .map(|j| scores.iter().map(|row| row[j]).fold(0.0, f64::max))
                .collect();
            EnsembleEvaluation {
                tm_score: mean_score(&best_per_reference).ok_or(ScoreError::EmptyEnsemble)?,
                method,
                best_prediction: None,
                best_reference: None,
                scores,
            }
        }
        EnsembleMethod::BestOfAvg => {
            let averaged = T::mean_of(references)?;
            let column: Vec<f64> = predictions
                .iter()
                .enumerate()
                .map(|(i, prediction)| lenient_score(prediction, &averaged, config, (i, 0)))
                .collect();
            let (best_prediction, tm_score) =
                best_score(&column).ok_or(ScoreError::EmptyEnsemble)?;
            EnsembleEvaluation {
                tm_score,
                method,
                best_prediction: Some(best_prediction),
                best_reference: None,
                scores: column.into_iter().map(|s| vec![s]).collect(),
            }
        }
    };

    debug!(
        tm_score = evaluation.tm_score,
        best_prediction = ?evaluation.best_prediction,
        best_reference = ?evaluation.best_reference,
        "Ensemble evaluation complete."
    );
    Ok(evaluation)
}

/// Summary statistics of one prediction scored against every reference.
pub fn evaluate_against_references<T: Comparable>(
    prediction: &T,
    references: &[T],
    config: &ScoringConfig,
) -> Result<ReferenceSummary, ScoreError> {
    let scores: Vec<f64> = references
        .iter()
        .enumerate()
        .map(|(j, reference)| lenient_score(prediction, reference, config, (0, j)))
        .collect();

    let (best_index, best) = best_score(&scores).ok_or(ScoreError::EmptyEnsemble)?;
    let mean = mean_score(&scores).ok_or(ScoreError::EmptyEnsemble)?;
    let worst = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;

    Ok(ReferenceSummary {
        best,
        mean,
        worst,
        std_dev: variance.sqrt(),
        best_index,
        scores,
    })
}

/// `1 - mean pairwise TM-score` over the first `sample` references.
///
/// Pairs that fail to score are skipped. Returns 0.0 when fewer than two references are
/// sampled or no pair scores.
pub fn reference_variability<T: Comparable>(
    references: &[T],
    sample: usize,
    config: &ScoringConfig,
) -> f64 {
    let sampled = &references[..sample.min(references.len())];
    let pair_scores: Vec<f64> = sampled
        .iter()
        .tuple_combinations::<(&T, &T)>()
        .filter_map(|(a, b)| a.tm_score(b, config).ok())
        .collect();

    mean_score(&pair_scores).map_or(0.0, |mean| 1.0 - mean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Rotation3, Vector3};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    const TOLERANCE: f64 = 1e-6;

    fn helix(n: usize) -> PointSet {
        (0..n)
            .map(|i| {
                let t = i as f64 * 0.6;
                Point3::new(9.0 * t.cos(), 9.0 * t.sin(), 2.8 * i as f64)
            })
            .collect()
    }

    fn perturbed(points: &PointSet, sigma: f64, seed: u64) -> PointSet {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, sigma).unwrap();
        points
            .iter()
            .map(|p| {
                p + Vector3::new(
                    normal.sample(&mut rng),
                    normal.sample(&mut rng),
                    normal.sample(&mut rng),
                )
            })
            .collect()
    }

    fn moved(points: &PointSet) -> PointSet {
        let rotation = Rotation3::from_euler_angles(1.1, -0.3, 0.8);
        points
            .iter()
            .map(|p| rotation * p + Vector3::new(20.0, -5.0, 7.5))
            .collect()
    }

    #[test]
    fn best_score_is_order_independent() {
        let scores = [0.12, 0.45, 0.30, 0.91, 0.60];
        for permutation in scores.iter().copied().permutations(scores.len()) {
            let (index, best) = best_score(&permutation).unwrap();
            assert_eq!(best, 0.91);
            assert_eq!(permutation[index], 0.91);
        }
    }

    #[test]
    fn best_score_keeps_first_of_ties() {
        assert_eq!(best_score(&[0.3, 0.8, 0.1, 0.8]), Some((1, 0.8)));
        assert_eq!(best_score(&[]), None);
    }

    #[test]
    fn best_policy_picks_the_exact_candidate() {
        let reference = helix(60);
        let candidates = vec![
            perturbed(&reference, 3.0, 1),
            perturbed(&reference, 1.0, 2),
            perturbed(&reference, 5.0, 3),
            moved(&reference),
            perturbed(&reference, 2.0, 4),
        ];

        let result =
            score_ensemble(&candidates, &reference, EnsemblePolicy::Best, &ScoringConfig::default())
                .unwrap();

        assert_eq!(result.best_index, Some(3));
        assert!((result.tm_score - 1.0).abs() < TOLERANCE);
        assert_eq!(result.candidate_scores.len(), 5);
        assert!(result.candidate_scores.iter().all(|&s| s <= result.tm_score));
    }

    #[test]
    fn best_policy_reports_first_of_equal_candidates() {
        let reference = helix(40);
        let candidates = vec![
            perturbed(&reference, 4.0, 9),
            reference.clone(),
            perturbed(&reference, 4.0, 10),
            reference.clone(),
        ];

        let result =
            score_ensemble(&candidates, &reference, EnsemblePolicy::Best, &ScoringConfig::default())
                .unwrap();

        assert_eq!(result.best_index, Some(1));
    }

    #[test]
    fn avg_of_best_is_the_mean_candidate_score() {
        let reference = helix(50);
        let candidates: Vec<_> = (0..4)
            .map(|k| perturbed(&reference, 1.0 + k as f64, k))
            .collect();

        let result = score_ensemble(
            &candidates,
            &reference,
            EnsemblePolicy::AvgOfBest,
            &ScoringConfig::default(),
        )
        .unwrap();

        let expected = result.candidate_scores.iter().sum::<f64>() / 4.0;
        assert!((result.tm_score - expected).abs() < 1e-12);
        assert!(result.best_index.is_none());
    }

    #[test]
    fn best_of_avg_cancels_symmetric_noise() {
        let reference = helix(50);
        let noisy = perturbed(&reference, 2.0, 21);
        let mirrored_noise: PointSet = reference
            .iter()
            .zip(noisy.iter())
            .map(|(r, n)| r - (n - r))
            .collect();
        let candidates = vec![noisy, mirrored_noise];
        let config = ScoringConfig::default();

        let averaged =
            score_ensemble(&candidates, &reference, EnsemblePolicy::BestOfAvg, &config).unwrap();
        let best = score_ensemble(&candidates, &reference, EnsemblePolicy::Best, &config).unwrap();

        assert!((averaged.tm_score - 1.0).abs() < TOLERANCE);
        assert!(best.tm_score < averaged.tm_score);
        assert!(averaged.candidate_scores.is_empty());
    }

    #[test]
    fn empty_ensemble_is_an_error() {
        let reference = helix(10);
        let candidates: Vec<PointSet> = Vec::new();
        for policy in [
            EnsemblePolicy::Best,
            EnsemblePolicy::AvgOfBest,
            EnsemblePolicy::BestOfAvg,
        ] {
            assert_eq!(
                score_ensemble(&candidates, &reference, policy, &ScoringConfig::default()),
                Err(ScoreError::EmptyEnsemble)
            );
        }
    }

    #[test]
    fn mismatched_candidate_fails_every_policy() {
        let reference = helix(30);
        let candidates = vec![reference.clone(), helix(29)];
        for policy in [
            EnsemblePolicy::Best,
            EnsemblePolicy::AvgOfBest,
            EnsemblePolicy::BestOfAvg,
        ] {
            assert!(matches!(
                score_ensemble(&candidates, &reference, policy, &ScoringConfig::default()),
                Err(ScoreError::DimensionMismatch { .. })
            ));
        }
    }

    #[test]
    fn best_of_best_locates_the_matching_pair() {
        let truth = helix(45);
        let predictions = vec![perturbed(&truth, 4.0, 1), moved(&truth), perturbed(&truth, 6.0, 2)];
        let references = vec![
            perturbed(&truth, 3.0, 3),
            truth.clone(),
            perturbed(&truth, 2.0, 7),
        ];

        let evaluation = evaluate_ensembles(
            &predictions,
            &references,
            EnsembleMethod::BestOfBest,
            &ScoringConfig::default(),
        )
        .unwrap();

        assert_eq!(evaluation.best_prediction, Some(1));
        assert_eq!(evaluation.best_reference, Some(1));
        assert!((evaluation.tm_score - 1.0).abs() < TOLERANCE);
        assert_eq!(evaluation.scores.len(), 3);
        assert!(evaluation.scores.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn unscorable_pairs_count_as_zero() {
        let truth = helix(30);
        let predictions = vec![truth.clone()];
        let references = vec![truth.clone(), helix(31)];

        let evaluation = evaluate_ensembles(
            &predictions,
            &references,
            EnsembleMethod::AvgOfBest,
            &ScoringConfig::default(),
        )
        .unwrap();

        assert_eq!(evaluation.scores[0][1], 0.0);
        assert!((evaluation.tm_score - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn best_of_avg_scores_against_the_mean_reference() {
        let truth = helix(40);
        let noisy = perturbed(&truth, 1.5, 5);
        let opposite: PointSet = truth
            .iter()
            .zip(noisy.iter())
            .map(|(t, n)| t - (n - t))
            .collect();
        let predictions = vec![perturbed(&truth, 3.0, 6), truth.clone()];

        let evaluation = evaluate_ensembles(
            &predictions,
            &[noisy, opposite],
            EnsembleMethod::BestOfAvg,
            &ScoringConfig::default(),
        )
        .unwrap();

        assert_eq!(evaluation.best_prediction, Some(1));
        assert!((evaluation.tm_score - 1.0).abs() < TOLERANCE);
        assert!(evaluation.scores.iter().all(|row| row.len() == 1));
    }

    #[test]
    fn best_of_avg_rejects_ragged_references() {
        let result = evaluate_ensembles(
            &[helix(20)],
            &[helix(20), helix(21)],
            EnsembleMethod::BestOfAvg,
            &ScoringConfig::default(),
        );
        assert!(matches!(result, Err(ScoreError::DimensionMismatch { .. })));
    }

    #[test]
    fn evaluating_empty_ensembles_fails() {
        let empty: Vec<PointSet> = Vec::new();
        let result = evaluate_ensembles(
            &empty,
            &[helix(10)],
            EnsembleMethod::BestOfBest,
            &ScoringConfig::default(),
        );
        assert_eq!(result, Err(ScoreError::EmptyEnsemble));
    }

    #[test]
    fn reference_summary_statistics() {
        let truth = helix(35);
        let references = vec![perturbed(&truth, 3.0, 8), moved(&truth), helix(34)];

        let summary =
            evaluate_against_references(&truth, &references, &ScoringConfig::default()).unwrap();

        assert_eq!(summary.best_index, 1);
        assert!((summary.best - 1.0).abs() < TOLERANCE);
        assert_eq!(summary.worst, 0.0);
        assert!(summary.mean > 0.0 && summary.mean < summary.best);
        assert!(summary.std_dev > 0.0);
        assert_eq!(summary.scores.len(), 3);
    }

    #[test]
    fn reference_summary_of_no_references_fails() {
        let empty: Vec<PointSet> = Vec::new();
        assert_eq!(
            evaluate_against_references(&helix(10), &empty, &ScoringConfig::default()),
            Err(ScoreError::EmptyEnsemble)
        );
    }

    #[test]
    fn identical_references_have_no_variability() {
        let truth = helix(30);
        let references = vec![truth.clone(), moved(&truth), truth.clone()];
        let variability = reference_variability(&references, 5, &ScoringConfig::default());
        assert!(variability.abs() < TOLERANCE);
    }

    #[test]
    fn variability_grows_with_disagreement() {
        let truth = helix(60);
        let config = ScoringConfig::default();
        let tight: Vec<_> = (0..4).map(|k| perturbed(&truth, 0.5, k)).collect();
        let loose: Vec<_> = (0..4).map(|k| perturbed(&truth, 4.0, k)).collect();

        assert!(reference_variability(&loose, 5, &config) > reference_variability(&tight, 5, &config));
        assert_eq!(reference_variability(&loose[..1], 5, &config), 0.0);
    }
}
