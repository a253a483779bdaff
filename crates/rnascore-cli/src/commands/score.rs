use crate::cli::{OutputFormat, ScoreArgs};
use crate::config::AppConfig;
use crate::config::builder::build_config;
use crate::error::{CliError, Result};
use crate::labels::{TargetModels, load_labels};
use crate::utils::progress::CliProgressHandler;
use rnascore::core::metrics::StructureMetrics;
use rnascore::engine::progress::ProgressReporter;
use rnascore::workflows::evaluate::TargetFailure;
use rnascore::{
    ChainSet, PointSet, ScoringConfig, TargetEnsembles, TargetResult, evaluate_targets,
    reference_variability,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct TargetSummary {
    #[serde(flatten)]
    result: TargetResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_variability: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<StructureMetrics>,
}

#[derive(Debug, Serialize)]
struct ScoreSummary {
    scoring: ScoringConfig,
    policy: String,
    method: String,
    multichain: bool,
    targets: Vec<TargetSummary>,
    failures: Vec<TargetFailure>,
    mean_tm_score: Option<f64>,
}

pub fn run(args: ScoreArgs) -> Result<()> {
    let config = build_config(&args)?;
    info!(
        normalization = %config.scoring.normalization,
        policy = %config.options.policy,
        method = %config.options.method,
        "Resolved scoring configuration."
    );

    let predicted = load_labels(&args.predicted)?;
    let reference = load_labels(&args.reference)?;
    let targets = pair_targets(predicted, reference, &args.targets)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Scoring {} target(s)...", targets.len());
    let batch = evaluate_targets(&targets, &config.options, &config.scoring, &reporter);

    let by_id: HashMap<&str, &TargetEnsembles> =
        targets.iter().map(|t| (t.target_id.as_str(), t)).collect();
    let summaries = batch
        .results
        .into_iter()
        .map(|result| {
            let target = by_id.get(result.target_id.as_str()).copied();
            summarize(result, target, &config, args.metrics)
        })
        .collect();

    let summary = ScoreSummary {
        scoring: config.scoring,
        policy: config.options.policy.to_string(),
        method: config.options.method.to_string(),
        multichain: config.options.multichain,
        targets: summaries,
        failures: batch.failures,
        mean_tm_score: batch.mean_tm_score,
    };

    let mut stdout = std::io::stdout().lock();
    match args.format {
        OutputFormat::Text => write_text(&mut stdout, &summary)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &summary)
                .map_err(|e| CliError::Other(e.into()))?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

/// Builds one scoring job per reference target, in reference file order.
///
/// A reference target absent from the predictions is kept with no candidates so it
/// fails (and counts as zero) instead of silently disappearing from the mean.
fn pair_targets(
    predicted: Vec<TargetModels>,
    reference: Vec<TargetModels>,
    selected: &[String],
) -> Result<Vec<TargetEnsembles>> {
    if let Some(unknown) = selected
        .iter()
        .find(|id| !reference.iter().any(|r| &r.target_id == *id))
    {
        return Err(CliError::Argument(format!(
            "Target '{}' is not present in the reference file.",
            unknown
        )));
    }

    let mut predictions: HashMap<String, Vec<ChainSet>> = predicted
        .into_iter()
        .map(|t| (t.target_id, t.models))
        .collect();

    let targets: Vec<TargetEnsembles> = reference
        .into_iter()
        .filter(|r| selected.is_empty() || selected.contains(&r.target_id))
        .map(|r| {
            let candidates = predictions.remove(&r.target_id).unwrap_or_else(|| {
                warn!(target_id = %r.target_id, "No predictions found for target.");
                Vec::new()
            });
            TargetEnsembles {
                target_id: r.target_id,
                predictions: candidates,
                references: r.models,
            }
        })
        .collect();

    for extra in predictions.keys() {
        warn!(target_id = %extra, "Predicted target has no reference and is ignored.");
    }
    Ok(targets)
}

fn summarize(
    result: TargetResult,
    target: Option<&TargetEnsembles>,
    config: &AppConfig,
    with_metrics: bool,
) -> TargetSummary {
    let variability = target
        .filter(|t| t.references.len() >= 2)
        .map(|t| variability_of(t, config));
    let metrics = target
        .filter(|_| with_metrics)
        .and_then(|t| metrics_of(t, &result, &config.scoring));

    TargetSummary {
        result,
        reference_variability: variability,
        metrics,
    }
}

fn variability_of(target: &TargetEnsembles, config: &AppConfig) -> f64 {
    if config.options.multichain {
        reference_variability(&target.references, config.variability_sample, &config.scoring)
    } else {
        let references: Vec<PointSet> = target
            .references
            .iter()
            .map(ChainSet::concatenated)
            .collect();
        reference_variability(&references, config.variability_sample, &config.scoring)
    }
}

fn metrics_of(
    target: &TargetEnsembles,
    result: &TargetResult,
    scoring: &ScoringConfig,
) -> Option<StructureMetrics> {
    let prediction = target
        .predictions
        .get(result.best_prediction.unwrap_or(0))?
        .concatenated();
    let reference = target
        .references
        .get(result.best_reference.unwrap_or(0))?
        .concatenated();

    match StructureMetrics::compute(&prediction, Some(&reference), scoring) {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            warn!(
                target_id = %target.target_id,
                error = %e,
                "Could not compute structure metrics."
            );
            None
        }
    }
}

fn write_text<W: Write>(out: &mut W, summary: &ScoreSummary) -> std::io::Result<()> {
    writeln!(
        out,
        "Normalization: {} | policy: {} | method: {}{}",
        summary.scoring.normalization,
        summary.policy,
        summary.method,
        if summary.multichain { " | multichain" } else { "" }
    )?;

    for target in &summary.targets {
        let r = &target.result;
        write!(
            out,
            "  {:<16} TM-score {:.4}  ({} prediction(s), {} reference(s)",
            r.target_id, r.tm_score, r.predictions, r.references
        )?;
        if let Some(best) = r.best_prediction {
            write!(out, ", best prediction #{}", best + 1)?;
        }
        if let Some(best) = r.best_reference {
            write!(out, ", best reference #{}", best + 1)?;
        }
        writeln!(out, ")")?;

        if let Some(variability) = target.reference_variability {
            writeln!(out, "      reference variability {:.4}", variability)?;
        }
        if let Some(m) = &target.metrics {
            writeln!(
                out,
                "      RMSD {:.3} | GDT-TS {:.4} | lDDT {:.4} | clashes {}",
                m.rmsd.unwrap_or(f64::NAN),
                m.gdt_ts.unwrap_or(f64::NAN),
                m.lddt.unwrap_or(f64::NAN),
                m.clash_count
            )?;
        }
    }

    for failure in &summary.failures {
        writeln!(out, "  {:<16} FAILED: {}", failure.target_id, failure.reason)?;
    }

    match summary.mean_tm_score {
        Some(mean) => writeln!(
            out,
            "✓ Mean TM-score over {} target(s): {:.4}",
            summary.targets.len() + summary.failures.len(),
            mean
        ),
        None => writeln!(out, "No targets were scored."),
    }
}
