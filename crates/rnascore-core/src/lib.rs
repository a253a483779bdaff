//! # RNAScore Core Library
//!
//! Structural superposition and TM-score evaluation for predicted RNA 3D structures,
//! one C1' coordinate per residue.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Point set models, Kabsch superposition, the TM-score
//!   itself, auxiliary quality metrics and the assignment solver. All pure functions.
//!
//! - **[`engine`]: Shared Infrastructure.** Scoring configuration, the error type and the
//!   progress reporting hook.
//!
//! - **[`workflows`]: The Public API.** Reductions over many comparisons: best-of-N
//!   ensembles, ensemble-vs-ensemble evaluation and multi-chain scoring with optimal
//!   chain assignment.
//!
//! ```
//! use nalgebra::Point3;
//! use rnascore::{ScoringConfig, score};
//!
//! let reference: Vec<_> = (0..30)
//!     .map(|i| Point3::new(i as f64 * 3.8, (i as f64).sin(), 0.0))
//!     .collect();
//! let tm = score(&reference, &reference, &ScoringConfig::default()).unwrap();
//! assert!((tm - 1.0).abs() < 1e-9);
//! ```

pub mod core;
pub mod engine;
pub mod workflows;

pub use crate::core::models::PointSet;
pub use crate::core::models::chain_set::ChainSet;
pub use crate::core::superposition::{Alignment, align};
pub use crate::core::tm_score::{ScoreReport, score, score_detailed};
pub use crate::engine::config::{
    EnsembleMethod, EnsemblePolicy, Normalization, ScoringConfig, ScoringConfigBuilder,
};
pub use crate::engine::error::ScoreError;
pub use crate::workflows::ensemble::{
    Comparable, EnsembleEvaluation, EnsembleScore, ReferenceSummary, evaluate_against_references,
    evaluate_ensembles, reference_variability, score_ensemble,
};
pub use crate::workflows::evaluate::{
    BatchReport, EvaluationOptions, TargetEnsembles, TargetResult, evaluate_targets,
};
pub use crate::workflows::multichain::{MultiChainReport, score_multichain};
