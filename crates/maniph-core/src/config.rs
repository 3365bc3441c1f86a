use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const URL_ENV: &str = "PHABRICATOR_URL";
pub const TOKEN_ENV: &str = "PHABRICATOR_TOKEN";
pub const DEFAULT_PROJECT_ENV: &str = "PHABRICATOR_DEFAULT_PROJECT_PHID";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing setting `{key}`: set the {env} environment variable or add `{key}` to config.toml")]
    Missing { key: &'static str, env: &'static str },
}

/// On-disk config, `~/.maniph/config.toml`. Every key is optional; the
/// environment takes precedence over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub token: Option<String>,
    pub default_project_phid: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub token: String,
    pub default_project_phid: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let file = load_config_file().unwrap_or_default();
        Self::from_sources(file, |name| std::env::var(name).ok())
    }

    pub fn from_sources(
        file: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let url = setting(&env, URL_ENV, file.url, "url")?;
        let token = setting(&env, TOKEN_ENV, file.token, "token")?;
        let default_project_phid = env(DEFAULT_PROJECT_ENV)
            .filter(|value| !value.trim().is_empty())
            .or(file.default_project_phid);
        Ok(Self {
            url: url.trim_end_matches('/').to_string(),
            token,
            default_project_phid,
        })
    }
}

fn setting(
    env: impl Fn(&str) -> Option<String>,
    env_name: &'static str,
    file_value: Option<String>,
    key: &'static str,
) -> Result<String, ConfigError> {
    env(env_name)
        .filter(|value| !value.trim().is_empty())
        .or(file_value)
        .ok_or(ConfigError::Missing {
            key,
            env: env_name,
        })
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_maniph_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("MANIPH_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".maniph"))
}

pub fn config_path() -> Option<PathBuf> {
    resolve_maniph_home_dir().map(|home| home.join("config.toml"))
}

pub fn cache_path() -> Option<PathBuf> {
    resolve_maniph_home_dir().map(|home| home.join("cache.json"))
}

pub fn load_config_file() -> Option<ConfigFile> {
    let path = config_path()?;
    if !path.is_file() {
        return None;
    }
    let text = fs::read_to_string(path).ok()?;
    toml::from_str::<ConfigFile>(&text).ok()
}
