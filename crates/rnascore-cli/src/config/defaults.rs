use rnascore::engine::config::{DEFAULT_D0_FLOOR, DEFAULT_SHORT_LENGTH_THRESHOLD};
use rnascore::{EnsembleMethod, EnsemblePolicy, Normalization};

pub struct DefaultsConfig {
    pub normalization: Normalization,
    pub d0_floor: f64,
    pub short_length_threshold: f64,
    pub policy: EnsemblePolicy,
    pub method: EnsembleMethod,
    pub multichain: bool,
    pub variability_sample: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            normalization: Normalization::Target,
            d0_floor: DEFAULT_D0_FLOOR,
            short_length_threshold: DEFAULT_SHORT_LENGTH_THRESHOLD,
            policy: EnsemblePolicy::Best,
            method: EnsembleMethod::BestOfBest,
            multichain: false,
            variability_sample: 5,
        }
    }
}
