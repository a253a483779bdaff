use crate::error::{CliError, Result};
use rnascore::{EnsembleMethod, EnsemblePolicy, Normalization};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// `normalize = "average"` or `normalize = 120`.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum FileNormalization {
    Length(f64),
    Mode(Normalization),
}

impl From<FileNormalization> for Normalization {
    fn from(value: FileNormalization) -> Self {
        match value {
            FileNormalization::Length(length) => Normalization::Fixed(length),
            FileNormalization::Mode(mode) => mode,
        }
    }
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileScoringConfig {
    pub normalize: Option<FileNormalization>,
    pub d0_floor: Option<f64>,
    pub short_length_threshold: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEnsembleConfig {
    pub policy: Option<EnsemblePolicy>,
    pub method: Option<EnsembleMethod>,
    pub multichain: Option<bool>,
    pub variability_sample: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub scoring: Option<FileScoringConfig>,
    pub ensemble: Option<FileEnsembleConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}
