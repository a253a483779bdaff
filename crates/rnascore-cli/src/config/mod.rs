pub mod builder;
pub mod defaults;
pub mod file;

use rnascore::{EvaluationOptions, ScoringConfig};

/// Fully resolved settings for one `score` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub scoring: ScoringConfig,
    pub options: EvaluationOptions,
    /// Number of leading references sampled for the variability estimate.
    pub variability_sample: usize,
}
