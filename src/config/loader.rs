//! Config file loading

use crate::domain::Config;
use anyhow::{Context, Result};
use figment::providers::{Env, Serialized};
use figment::Figment;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of environment variables layered over file values.
pub const ENV_PREFIX: &str = "TWEET_COLLECT_";

/// Nested section honoured in config files.
const SECTION: &str = "tweet-collect";

/// Load `config_path`, or the first config file discovered in `dir`, then
/// layer `TWEET_COLLECT_*` environment variables on top.
pub fn load_config(dir: &Path, config_path: Option<&Path>) -> Result<Config> {
    let file_config = load_file_config(dir, config_path)?;
    layer_env(file_config, ENV_PREFIX)
}

fn load_file_config(dir: &Path, config_path: Option<&Path>) -> Result<Config> {
    let config_path_provided = config_path.is_some();

    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(dir),
    };

    let Some(config_file) = discovered else {
        return Ok(Config::default());
    };

    let content = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;

    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "toml" => parse_toml_config(&content, &config_file),
        "yaml" | "yml" => parse_yaml_config(&content, &config_file),
        other => Err(anyhow::anyhow!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        )),
    };

    match parsed {
        Ok(cfg) => {
            tracing::debug!("Loaded config from {}", config_file.display());
            Ok(cfg)
        }
        Err(e) if config_path_provided => Err(e),
        Err(e) => {
            // Auto-discovered files never abort a run.
            tracing::warn!("Failed to parse auto-discovered config {}: {:#}", config_file.display(), e);
            Ok(Config::default())
        }
    }
}

/// Parse TOML config, supporting a nested [tweet-collect] section.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, supporting a nested tweet-collect section.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

/// Environment variables named `<prefix><FIELD>` override file values.
pub fn layer_env(config: Config, prefix: &str) -> Result<Config> {
    Figment::from(Serialized::defaults(config))
        .merge(Env::prefixed(prefix))
        .extract()
        .with_context(|| format!("Invalid {prefix}* environment settings"))
}

fn discover_config(dir: &Path) -> Option<PathBuf> {
    let candidates = [
        "tweet-collect.toml",
        ".tweet-collect.toml",
        "tweet-collect.yml",
        ".tweet-collect.yml",
        "tweet-collect.yaml",
        ".tweet-collect.yaml",
    ];

    candidates.iter().map(|candidate| dir.join(candidate)).find(|path| path.exists())
}
