//! Search-answer extraction for eventdigest.
//!
//! The search collaborator answers in loosely formatted markdown. This crate
//! cuts that answer into per-event blocks and pulls a [`RawEvent`] out of
//! each one. Nothing here validates dates or removes duplicates: that is the
//! consolidation step's job.
//!
//! [`RawEvent`]: eventdigest_shared::RawEvent

mod parser;

pub use parser::{
    DateWindow, ExtractOptions, classify_attendance, classify_kind, clean_title,
    parse_search_answer, split_blocks,
};
