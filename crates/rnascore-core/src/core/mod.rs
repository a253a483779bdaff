//! # Core Module
//!
//! Stateless geometry and scoring primitives. Nothing in here performs I/O or keeps
//! state between calls; every function takes coordinates and returns a value.
//!
//! - **Coordinate Models** ([`models`]) - Point sets and chain-keyed collections of them
//! - **Superposition** ([`superposition`]) - Optimal rigid-body fit (Kabsch) of one point
//!   set onto another
//! - **TM-score** ([`tm_score`]) - Length-normalized structural similarity with
//!   configurable normalization
//! - **Auxiliary Metrics** ([`metrics`]) - RMSD, GDT-TS, lDDT, pairwise distance accuracy
//!   and clash counting
//! - **Assignment** ([`assignment`]) - Rectangular minimum-cost bipartite matching used to
//!   pair predicted chains with reference chains

pub mod assignment;
pub mod metrics;
pub mod models;
pub mod superposition;
pub mod tm_score;
