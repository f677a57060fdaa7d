use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{Convention, SortOrder};
use crate::error::ConfigError;

use super::{CONFIG_FILE_NAME, RegistryConfig};

pub fn config_path(repo_root: &Path) -> PathBuf {
    repo_root.join(CONFIG_FILE_NAME)
}

/// Load config for a repository root: `.gto` file first, then `GTO_*`
/// environment overrides on top.
pub fn load_for_repo(repo_root: &Path) -> Result<RegistryConfig, ConfigError> {
    let mut config = read_file(&config_path(repo_root))?.unwrap_or_default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Load config with no repository context (env overrides only).
pub fn load() -> RegistryConfig {
    let mut config = RegistryConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

fn read_file(path: &Path) -> Result<Option<RegistryConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Some(RegistryConfig::default()));
    }
    serde_yaml::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn apply_env_overrides<F>(config: &mut RegistryConfig, get: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get("GTO_TYPES") {
        config.types = split_list(&raw);
    }
    if let Some(raw) = get("GTO_STAGES") {
        config.stages = split_list(&raw);
    }
    if let Some(raw) = get("GTO_VERSION_CONVENTION") {
        match raw.as_str() {
            "numbers" => config.version_convention = Convention::Numbers,
            "semver" => config.version_convention = Convention::SemVer,
            other => tracing::warn!("ignoring unknown GTO_VERSION_CONVENTION `{other}`"),
        }
    }
    if let Some(raw) = get("GTO_EMOJIS") {
        config.emojis = parse_bool(&raw).unwrap_or(config.emojis);
    }
    if let Some(raw) = get("GTO_INDEX") {
        config.index = raw;
    }
    if let Some(raw) = get("GTO_SORT") {
        match raw.as_str() {
            "by_time" => config.sort = SortOrder::ByTime,
            "by_semver" => config.sort = SortOrder::BySemVer,
            other => tracing::warn!("ignoring unknown GTO_SORT `{other}`"),
        }
    }
    if let Some(raw) = get("GTO_KANBAN") {
        config.kanban = parse_bool(&raw).unwrap_or(config.kanban);
    }
    if let Some(raw) = get("GTO_MULTI_STAGE") {
        config.multi_stage = parse_bool(&raw).unwrap_or(config.multi_stage);
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
