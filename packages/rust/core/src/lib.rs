//! Core pipeline orchestration for eventdigest.
//!
//! This crate ties together consolidation, review, rendering, result files,
//! webhook delivery and the known-URL ledger into one end-to-end run
//! (`run_digest`).

pub mod delivery;
pub mod output;
pub mod pipeline;
pub mod review;
