//! Application configuration for ListScout.
//!
//! User config lives at `~/.listscout/listscout.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ListScoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "listscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".listscout";

// ---------------------------------------------------------------------------
// Config structs (matching listscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Search task policies.
    #[serde(default)]
    pub search: SearchPoliciesConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default run output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Default global run timeout in seconds.
    #[serde(default = "default_global_timeout_secs")]
    pub global_timeout_secs: u64,

    /// Default per-category time budget in seconds.
    #[serde(default = "default_category_timeout_secs")]
    pub category_timeout_secs: u64,

    /// Accepted-resource count that triggers an intermediate checkpoint.
    #[serde(default = "default_checkpoint_every")]
    pub checkpoint_every: usize,

    /// Whether to randomize category order by default.
    #[serde(default)]
    pub randomize: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            global_timeout_secs: default_global_timeout_secs(),
            category_timeout_secs: default_category_timeout_secs(),
            checkpoint_every: default_checkpoint_every(),
            randomize: false,
        }
    }
}

fn default_output_dir() -> String {
    "~/listscout-runs".into()
}
fn default_global_timeout_secs() -> u64 {
    14_400
}
fn default_category_timeout_secs() -> u64 {
    300
}
fn default_checkpoint_every() -> usize {
    25
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Default model to use for planning, search, and idea generation.
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            default_model: default_model(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPoliciesConfig {
    /// Hard timeout for a single search attempt, seconds.
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Maximum attempts per search query.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay between attempts, seconds.
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    /// Extra URL substrings to reject in addition to the built-in
    /// search-results-page denylist.
    #[serde(default)]
    pub extra_denylist: Vec<String>,
}

impl Default for SearchPoliciesConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout_secs(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay_secs(),
            extra_denylist: Vec::new(),
        }
    }
}

fn default_attempt_timeout_secs() -> u64 {
    60
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_secs() -> u64 {
    2
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime run configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Directory where checkpoints and the final artifact are written.
    pub output_root: PathBuf,
    /// Global wall-clock budget for the whole run, seconds.
    pub global_timeout_secs: u64,
    /// Wall-clock budget per category round, seconds.
    pub category_timeout_secs: u64,
    /// Unique-resource yield target. `None` selects single-pass scheduling.
    pub target_yield: Option<usize>,
    /// Accepted-resource count between intermediate checkpoints.
    pub checkpoint_every: usize,
    /// Shuffle category order.
    pub randomize: bool,
    /// Seed for reproducible shuffling.
    pub random_seed: Option<u64>,
    /// Hard timeout for a single search attempt, seconds.
    pub attempt_timeout_secs: u64,
    /// Maximum attempts per search query.
    pub max_attempts: u32,
    /// Fixed delay between attempts, seconds.
    pub retry_delay_secs: u64,
    /// Extra URL denylist substrings.
    pub extra_denylist: Vec<String>,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            output_root: PathBuf::from(&config.defaults.output_dir),
            global_timeout_secs: config.defaults.global_timeout_secs,
            category_timeout_secs: config.defaults.category_timeout_secs,
            target_yield: None,
            checkpoint_every: config.defaults.checkpoint_every,
            randomize: config.defaults.randomize,
            random_seed: None,
            attempt_timeout_secs: config.search.attempt_timeout_secs,
            max_attempts: config.search.max_attempts,
            retry_delay_secs: config.search.retry_delay_secs,
            extra_denylist: config.search.extra_denylist.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.listscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ListScoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.listscout/listscout.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ListScoutError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ListScoutError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ListScoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ListScoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ListScoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(ListScoutError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
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
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.global_timeout_secs, 14_400);
        assert_eq!(parsed.defaults.category_timeout_secs, 300);
        assert_eq!(parsed.openrouter.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
output_dir = "/tmp/runs"
category_timeout_secs = 120

[search]
max_attempts = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.output_dir, "/tmp/runs");
        assert_eq!(config.defaults.category_timeout_secs, 120);
        assert_eq!(config.defaults.global_timeout_secs, 14_400);
        assert_eq!(config.search.max_attempts, 5);
        assert_eq!(config.search.attempt_timeout_secs, 60);
    }

    #[test]
    fn run_config_from_app_config() {
        let app = AppConfig::default();
        let run = RunConfig::from(&app);
        assert_eq!(run.global_timeout_secs, 14_400);
        assert_eq!(run.category_timeout_secs, 300);
        assert_eq!(run.checkpoint_every, 25);
        assert_eq!(run.max_attempts, 3);
        assert!(run.target_yield.is_none());
        assert!(!run.randomize);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.openrouter.api_key_env = "LS_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
