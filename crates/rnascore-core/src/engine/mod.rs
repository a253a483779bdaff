//! # Engine Module
//!
//! Shared infrastructure for every scoring operation: the error taxonomy, scoring
//! configuration and the progress reporting hook used by batch evaluations.
//!
//! - **Configuration** ([`config`]) - Normalization modes, the d0 edge-case policy and
//!   ensemble reduction policies, with a validating builder.
//! - **Error Handling** ([`error`]) - The [`error::ScoreError`] kinds raised to callers.
//! - **Progress Monitoring** ([`progress`]) - Optional callbacks for long-running batches
//!   such as scoring every target of a validation set.

pub mod config;
pub mod error;
pub mod progress;
