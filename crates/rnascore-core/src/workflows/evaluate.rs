use super::ensemble::{Comparable, evaluate_ensembles, mean_score, score_ensemble};
use crate::core::models::PointSet;
use crate::core::models::chain_set::ChainSet;
use crate::engine::config::{EnsembleMethod, EnsemblePolicy, ScoringConfig};
use crate::engine::error::ScoreError;
use crate::engine::progress::{Progress, ProgressReporter};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Every model of one target: the candidate predictions and the reference structures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetEnsembles {
    pub target_id: String,
    pub predictions: Vec<ChainSet>,
    pub references: Vec<ChainSet>,
}

/// How each target is reduced to a single score.
///
/// With exactly one reference the candidates are reduced by `policy`; with several, the
/// prediction-by-reference matrix is reduced by `method`. Unless `multichain` is set,
/// the chains of every model are concatenated and compared as one point set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvaluationOptions {
    pub policy: EnsemblePolicy,
    pub method: EnsembleMethod,
    pub multichain: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetResult {
    pub target_id: String,
    pub tm_score: f64,
    pub predictions: usize,
    pub references: usize,
    pub best_prediction: Option<usize>,
    pub best_reference: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetFailure {
    pub target_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<TargetResult>,
    pub failures: Vec<TargetFailure>,
    /// Mean over all targets, failed targets counting as 0.0. `None` for an empty batch.
    pub mean_tm_score: Option<f64>,
}

struct Reduced {
    tm_score: f64,
    best_prediction: Option<usize>,
    best_reference: Option<usize>,
}

/// Scores one target.
pub fn evaluate_target(
    target: &TargetEnsembles,
    options: &EvaluationOptions,
    config: &ScoringConfig,
) -> Result<TargetResult, ScoreError> {
    let reduced = if options.multichain {
        reduce_models(&target.predictions, &target.references, options, config)?
    } else {
        let predictions: Vec<PointSet> =
            target.predictions.iter().map(ChainSet::concatenated).collect();
        let references: Vec<PointSet> =
            target.references.iter().map(ChainSet::concatenated).collect();
        reduce_models(&predictions, &references, options, config)?
    };

    Ok(TargetResult {
        target_id: target.target_id.clone(),
        tm_score: reduced.tm_score,
        predictions: target.predictions.len(),
        references: target.references.len(),
        best_prediction: reduced.best_prediction,
        best_reference: reduced.best_reference,
    })
}

fn reduce_models<T: Comparable>(
    predictions: &[T],
    references: &[T],
    options: &EvaluationOptions,
    config: &ScoringConfig,
) -> Result<Reduced, ScoreError> {
    match references {
        [reference] => {
            let result = score_ensemble(predictions, reference, options.policy, config)?;
            Ok(Reduced {
                tm_score: result.tm_score,
                best_prediction: result.best_index,
                best_reference: None,
            })
        }
        _ => {
            let evaluation = evaluate_ensembles(predictions, references, options.method, config)?;
            Ok(Reduced {
                tm_score: evaluation.tm_score,
                best_prediction: evaluation.best_prediction,
                best_reference: evaluation.best_reference,
            })
        }
    }
}

/// Scores every target in order. A target that fails is recorded and the batch goes on.
#[instrument(skip_all, name = "batch_evaluation")]
pub fn evaluate_targets(
    targets: &[TargetEnsembles],
    options: &EvaluationOptions,
    config: &ScoringConfig,
    reporter: &ProgressReporter,
) -> BatchReport {
    info!(
        targets = targets.len(),
        policy = %options.policy,
        method = %options.method,
        multichain = options.multichain,
        "Starting batch evaluation."
    );
    reporter.report(Progress::BatchStart {
        label: "Scoring targets".to_string(),
        total: targets.len() as u64,
    });

    let mut report = BatchReport::default();
    let mut all_scores = Vec::with_capacity(targets.len());

    for (index, target) in targets.iter().enumerate() {
        match evaluate_target(target, options, config) {
            Ok(result) => {
                reporter.report(Progress::ItemScored {
                    index,
                    tm_score: result.tm_score,
                });
                all_scores.push(result.tm_score);
                report.results.push(result);
            }
            Err(e) => {
                warn!(target_id = %target.target_id, error = %e, "Target failed to score.");
                reporter.report(Progress::ItemFailed {
                    index,
                    reason: e.to_string(),
                });
                all_scores.push(0.0);
                report.failures.push(TargetFailure {
                    target_id: target.target_id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report.mean_tm_score = mean_score(&all_scores);
    if let Some(mean) = report.mean_tm_score {
        reporter.report(Progress::Message(format!(
            "Mean TM-score {:.4} over {} target(s), {} failed",
            mean,
            targets.len(),
            report.failures.len()
        )));
    }
    reporter.report(Progress::BatchFinish);

    info!(
        scored = report.results.len(),
        failed = report.failures.len(),
        mean_tm_score = ?report.mean_tm_score,
        "Batch evaluation complete."
    );
    report
}
