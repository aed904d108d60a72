//! Shared types, error model, and configuration for eventdigest.
//!
//! This crate is the foundation depended on by all other eventdigest crates.
//! It provides:
//! - [`EventDigestError`]: the unified error type
//! - Domain types ([`RawEvent`], [`CanonicalEvent`], [`EventGroup`], [`RejectedEvent`])
//! - Configuration ([`AppConfig`], [`DigestConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ConsolidateSection, DISCORD_MESSAGE_LIMIT, DefaultsConfig, DigestConfig,
    DiscordConfig, ExtractSection, config_dir, config_file_path, init_config, load_config,
    load_config_from, webhook_url,
};
pub use error::{EventDigestError, Result};
pub use types::{
    Attendance, CURRENT_SCHEMA_VERSION, CanonicalEvent, Consolidation, EventGroup, EventKind,
    RawDate, RawEvent, RejectReason, RejectedEvent, RunId,
};
