use super::AppConfig;
use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileNormalization};
use crate::cli::ScoreArgs;
use crate::error::{CliError, Result};
use rnascore::{EvaluationOptions, Normalization, ScoringConfigBuilder};
use std::str::FromStr;

/// Resolves the settings for `score`: built-in defaults, then the TOML file, then `-S`
/// overrides, then explicit flags.
pub fn build_config(args: &ScoreArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let file_config = apply_set_values(file_config, &args.set_values)?;

    let scoring_file = file_config.scoring.unwrap_or_default();
    let ensemble_file = file_config.ensemble.unwrap_or_default();

    let normalization = args
        .normalize
        .or(scoring_file.normalize.map(Normalization::from))
        .unwrap_or(defaults.normalization);

    let scoring = ScoringConfigBuilder::new()
        .normalization(normalization)
        .d0_floor(scoring_file.d0_floor.unwrap_or(defaults.d0_floor))
        .short_length_threshold(
            scoring_file
                .short_length_threshold
                .unwrap_or(defaults.short_length_threshold),
        )
        .build()?;

    let options = EvaluationOptions {
        policy: args
            .policy
            .or(ensemble_file.policy)
            .unwrap_or(defaults.policy),
        method: args
            .method
            .or(ensemble_file.method)
            .unwrap_or(defaults.method),
        multichain: args.multichain
            || ensemble_file.multichain.unwrap_or(defaults.multichain),
    };

    let variability_sample = ensemble_file
        .variability_sample
        .unwrap_or(defaults.variability_sample);

    Ok(AppConfig {
        scoring,
        options,
        variability_sample,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            "scoring.normalize" => {
                let normalization: Normalization = parse_value(key, value, "normalization")?;
                config
                    .scoring
                    .get_or_insert_with(Default::default)
                    .normalize = Some(FileNormalization::Mode(normalization));
            }
            "scoring.d0-floor" => {
                config.scoring.get_or_insert_with(Default::default).d0_floor =
                    Some(parse_value(key, value, "float")?);
            }
            "scoring.short-length-threshold" => {
                config
                    .scoring
                    .get_or_insert_with(Default::default)
                    .short_length_threshold = Some(parse_value(key, value, "float")?);
            }
            "ensemble.policy" => {
                config.ensemble.get_or_insert_with(Default::default).policy =
                    Some(parse_value(key, value, "policy")?);
            }
            "ensemble.method" => {
                config.ensemble.get_or_insert_with(Default::default).method =
                    Some(parse_value(key, value, "method")?);
            }
            "ensemble.multichain" => {
                config.ensemble.get_or_insert_with(Default::default).multichain =
                    Some(parse_value(key, value, "boolean")?);
            }
            "ensemble.variability-sample" => {
                config
                    .ensemble
                    .get_or_insert_with(Default::default)
                    .variability_sample = Some(parse_value(key, value, "integer")?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
