use super::ensemble::Comparable;
use crate::core::assignment;
use crate::core::models::PointSet;
use crate::core::models::chain_set::ChainSet;
use crate::core::tm_score::score;
use crate::engine::config::ScoringConfig;
use crate::engine::error::ScoreError;
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, instrument, trace};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainMatch {
    pub predicted: String,
    pub reference: String,
    pub tm_score: f64,
    /// Reference chain length, the weight of this pair in the overall score.
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiChainReport {
    /// Length-weighted mean of the matched chain scores.
    pub tm_score: f64,
    pub matched: Vec<ChainMatch>,
    pub unassigned_predicted: Vec<String>,
    pub unassigned_reference: Vec<String>,
}

/// Scores a multi-chain prediction after pairing its chains with the reference chains.
///
/// Only chains of equal length can be paired. Among those, the pairing that maximizes
/// the summed TM-score is chosen, and the result is the reference-length-weighted mean
/// over the matched pairs. Chains left without a partner are listed in the report and do
/// not contribute.
///
/// # Errors
///
/// [`ScoreError::NoValidAssignment`] if no predicted chain has the length of any
/// reference chain (including when either side has no chains).
#[instrument(skip_all, name = "multichain_scoring")]
pub fn score_multichain(
    predicted: &ChainSet,
    reference: &ChainSet,
    config: &ScoringConfig,
) -> Result<MultiChainReport, ScoreError> {
    let no_assignment = || ScoreError::NoValidAssignment {
        predicted_chains: predicted.len(),
        reference_chains: reference.len(),
    };

    let pred_chains: Vec<(&str, &PointSet)> = predicted.iter().collect();
    let ref_chains: Vec<(&str, &PointSet)> = reference.iter().collect();
    if pred_chains.is_empty() || ref_chains.is_empty() {
        return Err(no_assignment());
    }

    debug!(
        predicted_chains = pred_chains.len(),
        reference_chains = ref_chains.len(),
        "Scoring chain pairs."
    );

    let pairs: Vec<(usize, usize)> = (0..pred_chains.len())
        .cartesian_product(0..ref_chains.len())
        .collect();

    #[cfg(not(feature = "parallel"))]
    let iterator = pairs.iter();

    #[cfg(feature = "parallel")]
    let iterator = pairs.par_iter();

    let pair_scores: Vec<Option<f64>> = iterator
        .map(|&(i, j)| {
            let (p, q) = (pred_chains[i].1, ref_chains[j].1);
            if p.len() != q.len() || p.is_empty() {
                return Ok(None);
            }
            score(p, q, config).map(Some)
        })
        .collect::<Result<_, ScoreError>>()?;

    let costs: Vec<Vec<Option<f64>>> = pair_scores
        .chunks(ref_chains.len())
        .map(|row| row.iter().map(|s| s.map(|tm| -tm)).collect())
        .collect();

    if costs.iter().flatten().all(Option::is_none) {
        return Err(no_assignment());
    }

    let matched: Vec<ChainMatch> = assignment::solve(&costs)
        .into_iter()
        .filter_map(|(i, j)| {
            let tm_score = pair_scores[i * ref_chains.len() + j]?;
            trace!(
                predicted = pred_chains[i].0,
                reference = ref_chains[j].0,
                tm_score,
                "Chain pair matched."
            );
            Some(ChainMatch {
                predicted: pred_chains[i].0.to_string(),
                reference: ref_chains[j].0.to_string(),
                tm_score,
                length: ref_chains[j].1.len(),
            })
        })
        .collect();

    let total_length: usize = matched.iter().map(|m| m.length).sum();
    if total_length == 0 {
        return Err(no_assignment());
    }
    let tm_score = matched
        .iter()
        .map(|m| m.tm_score * m.length as f64)
        .sum::<f64>()
        / total_length as f64;

    let unassigned_predicted =
        unmatched_ids(&pred_chains, |id| matched.iter().any(|m| m.predicted == id));
    let unassigned_reference =
        unmatched_ids(&ref_chains, |id| matched.iter().any(|m| m.reference == id));

    debug!(
        tm_score,
        matched = matched.len(),
        unassigned_predicted = unassigned_predicted.len(),
        unassigned_reference = unassigned_reference.len(),
        "Multi-chain score complete."
    );

    Ok(MultiChainReport {
        tm_score,
        matched,
        unassigned_predicted,
        unassigned_reference,
    })
}

fn unmatched_ids(chains: &[(&str, &PointSet)], is_matched: impl Fn(&str) -> bool) -> Vec<String> {
    chains
        .iter()
        .map(|(id, _)| *id)
        .filter(|&id| !is_matched(id))
        .map(str::to_string)
        .collect()
}

pub fn score_multichain_value(
    predicted: &ChainSet,
    reference: &ChainSet,
    config: &ScoringConfig,
) -> Result<f64, ScoreError> {
    score_multichain(predicted, reference, config).map(|report| report.tm_score)
}

impl Comparable for ChainSet {
    fn tm_score(&self, reference: &Self, config: &ScoringConfig) -> Result<f64, ScoreError> {
        score_multichain_value(self, reference, config)
    }

    /// Chain-wise mean. Every member must carry the same chain ids, in the same order and
    /// with the same lengths.
    fn mean_of(members: &[Self]) -> Result<Self, ScoreError> {
        let first = members.first().ok_or(ScoreError::EmptyEnsemble)?;
        if let Some(odd) = members.iter().find(|m| m.len() != first.len()) {
            return Err(ScoreError::DimensionMismatch {
                predicted: odd.total_points(),
                reference: first.total_points(),
            });
        }

        let mut averaged = ChainSet::new();

        for (chain_id, points) in first.iter() {
            let chains = members
                .iter()
                .map(|member| {
                    member
                        .get(chain_id)
                        .filter(|other| other.len() == points.len())
                        .cloned()
                        .ok_or(ScoreError::DimensionMismatch {
                            predicted: member.get(chain_id).map_or(0, Vec::len),
                            reference: points.len(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            averaged.insert(chain_id, <PointSet as Comparable>::mean_of(&chains)?);
        }
        Ok(averaged)
    }
}
