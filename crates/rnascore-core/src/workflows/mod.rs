//! # Workflows Module
//!
//! Reductions over many structure comparisons. These are the entry points most callers
//! need once they hold more than one prediction or reference.
//!
//! - **Ensembles** ([`ensemble`]) - Best-of-N scoring of candidate ensembles against a
//!   reference, ensemble-vs-ensemble evaluation and reference variability
//! - **Multi-chain** ([`multichain`]) - Optimal pairing of predicted and reference chains
//!   followed by a length-weighted score
//! - **Batch Evaluation** ([`evaluate`]) - Per-target evaluation of a whole data set with
//!   progress reporting

pub mod ensemble;
pub mod evaluate;
pub mod multichain;
