//! Application configuration for eventdigest.
//!
//! User config lives at `~/.eventdigest/eventdigest.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EventDigestError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "eventdigest.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".eventdigest";

/// Discord rejects message content longer than this.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

// ---------------------------------------------------------------------------
// Config structs (matching eventdigest.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Consolidation tuning.
    #[serde(default)]
    pub consolidate: ConsolidateSection,

    /// Search-answer extraction.
    #[serde(default)]
    pub extract: ExtractSection,

    /// Discord delivery settings.
    #[serde(default)]
    pub discord: DiscordConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Directory receiving `discord_events.txt`, `events.md`, `final_results.json`.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Line-delimited file of canonical URLs posted by earlier runs.
    #[serde(default = "default_known_urls_file")]
    pub known_urls_file: String,

    /// Always render Monday..Friday headers, even with no events.
    #[serde(default = "default_true")]
    pub show_empty_workdays: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            known_urls_file: default_known_urls_file(),
            show_empty_workdays: true,
        }
    }
}

fn default_output_dir() -> String {
    "./results".into()
}
fn default_known_urls_file() -> String {
    "./results/posted_urls.txt".into()
}
fn default_true() -> bool {
    true
}

/// `[consolidate]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsolidateSection {
    /// Query parameters stripped in addition to the built-in tracking list.
    #[serde(default)]
    pub extra_tracking_params: Vec<String>,
}

/// `[extract]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractSection {
    /// Keep only events dated within this many days from today; 0 keeps all.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

impl Default for ExtractSection {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

fn default_window_days() -> u32 {
    7
}

/// `[discord]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Name of the env var holding the webhook URL (never store the URL itself).
    #[serde(default = "default_webhook_url_env")]
    pub webhook_url_env: String,

    /// Display name for webhook posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Maximum characters per posted message.
    #[serde(default = "default_message_limit")]
    pub message_limit: usize,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            webhook_url_env: default_webhook_url_env(),
            username: None,
            message_limit: default_message_limit(),
        }
    }
}

fn default_webhook_url_env() -> String {
    "DISCORD_WEBHOOK_URL".into()
}
fn default_message_limit() -> usize {
    DISCORD_MESSAGE_LIMIT
}

// ---------------------------------------------------------------------------
// Digest config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime digest configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Output directory for result files.
    pub output_dir: PathBuf,
    /// Known-URL ledger path.
    pub known_urls_file: PathBuf,
    /// Always render Monday..Friday headers.
    pub show_empty_workdays: bool,
    /// Extra query parameters to strip during URL canonicalization.
    pub extra_tracking_params: Vec<String>,
    /// Maximum characters per posted message chunk.
    pub message_limit: usize,
    /// Webhook display name.
    pub username: Option<String>,
}

impl From<&AppConfig> for DigestConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_dir: PathBuf::from(&config.defaults.output_dir),
            known_urls_file: PathBuf::from(&config.defaults.known_urls_file),
            show_empty_workdays: config.defaults.show_empty_workdays,
            extra_tracking_params: config.consolidate.extra_tracking_params.clone(),
            message_limit: config.discord.message_limit,
            username: config.discord.username.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.eventdigest/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EventDigestError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.eventdigest/eventdigest.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EventDigestError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        EventDigestError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EventDigestError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EventDigestError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EventDigestError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the Discord webhook URL from the env var named in the config.
pub fn webhook_url(config: &AppConfig) -> Result<String> {
    let var_name = &config.discord.webhook_url_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val.trim().to_string()),
        _ => Err(EventDigestError::config(format!(
            "Discord webhook URL not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("output_dir"));
        assert!(toml_str.contains("DISCORD_WEBHOOK_URL"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.output_dir, "./results");
        assert!(parsed.defaults.show_empty_workdays);
        assert_eq!(parsed.discord.message_limit, DISCORD_MESSAGE_LIMIT);
    }

    #[test]
    fn config_with_overrides() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/digest"
show_empty_workdays = false

[consolidate]
extra_tracking_params = ["aff", "campaign"]

[discord]
username = "Event Bot"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output_dir, "/tmp/digest");
        assert_eq!(config.defaults.known_urls_file, "./results/posted_urls.txt");
        assert_eq!(config.consolidate.extra_tracking_params.len(), 2);
        assert_eq!(config.discord.username.as_deref(), Some("Event Bot"));
        assert_eq!(config.discord.webhook_url_env, "DISCORD_WEBHOOK_URL");
        assert_eq!(config.extract.window_days, 7);
    }

    #[test]
    fn extract_window_override() {
        let config: AppConfig = toml::from_str("[extract]\nwindow_days = 0\n").expect("parse");
        assert_eq!(config.extract.window_days, 0);
        assert_eq!(config.defaults.output_dir, "./results");
    }

    #[test]
    fn digest_config_from_app_config() {
        let app = AppConfig::default();
        let digest = DigestConfig::from(&app);
        assert_eq!(digest.output_dir, PathBuf::from("./results"));
        assert!(digest.show_empty_workdays);
        assert!(digest.extra_tracking_params.is_empty());
        assert_eq!(digest.message_limit, 2000);
    }

    #[test]
    fn webhook_url_missing() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.discord.webhook_url_env = "ED_TEST_NONEXISTENT_WEBHOOK_12345".into();
        let result = webhook_url(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("webhook URL not found"));
    }
}
