use crate::error::{AccountError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "account-resources.toml";
pub const DEFAULT_API_URL: &str = "https://api.dynatrace.com";
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

pub const ENV_API_TOKEN: &str = "ACCOUNT_API_TOKEN";
pub const ENV_FEATURE_BOUNDARIES: &str = "ACCOUNT_FEATURE_BOUNDARIES";
pub const ENV_FEATURE_SERVICE_USERS: &str = "ACCOUNT_FEATURE_SERVICE_USERS";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    #[serde(default)]
    pub features: FeatureFlags,
    #[serde(default)]
    pub output: OutputConfig,
    /// Bearer token for the account API, only ever taken from the environment.
    #[serde(skip)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub name: String,
    pub uuid: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

/// Toggles for resource kinds that are not downloaded or written by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct FeatureFlags {
    #[serde(default)]
    pub boundaries: bool,
    #[serde(default)]
    pub service_users: bool,
}

impl FeatureFlags {
    pub fn all() -> Self {
        Self {
            boundaries: true,
            service_users: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_folder")]
    pub folder: PathBuf,
    #[serde(default = "default_project")]
    pub project: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            folder: default_output_folder(),
            project: default_project(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("download")
}

fn default_project() -> String {
    "account".to_string()
}

impl Config {
    /// Reads the TOML file at `path` and applies `.env` and environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            AccountError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        dotenv::dotenv().ok();
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(content)?;
        config.validate()?;
        config.account.page_size = config.account.page_size.min(MAX_PAGE_SIZE);
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.account.uuid.trim().is_empty() {
            return Err(AccountError::Config("account.uuid must not be empty".into()));
        }
        if self.account.page_size == 0 {
            return Err(AccountError::Config("account.page_size must be positive".into()));
        }
        if self.account.max_concurrency == 0 {
            return Err(AccountError::Config(
                "account.max_concurrency must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Overrides come from a lookup function so tests don't need to touch the process env.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup(ENV_API_TOKEN).filter(|t| !t.trim().is_empty()) {
            self.api_token = Some(token);
        }
        if let Some(value) = lookup(ENV_FEATURE_BOUNDARIES) {
            self.features.boundaries = parse_flag(ENV_FEATURE_BOUNDARIES, &value)?;
        }
        if let Some(value) = lookup(ENV_FEATURE_SERVICE_USERS) {
            self.features.service_users = parse_flag(ENV_FEATURE_SERVICE_USERS, &value)?;
        }
        Ok(())
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(AccountError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const MINIMAL: &str = r#"
        [account]
        name = "my-account"
        uuid = "6ae3b2a6-0a0b-4b8e-a1d1-4c1c10c5c4a8"
    "#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();

        assert_eq!(config.account.name, "my-account");
        assert_eq!(config.account.api_url, DEFAULT_API_URL);
        assert_eq!(config.account.page_size, MAX_PAGE_SIZE);
        assert_eq!(config.account.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.features, FeatureFlags::default());
        assert_eq!(config.output.folder, PathBuf::from("download"));
        assert_eq!(config.output.project, "account");
        assert!(config.api_token.is_none());
    }

    #[test]
    fn test_page_size_is_capped() {
        let toml = format!("{}\npage_size = 500\n", MINIMAL);
        let config = Config::from_toml(&toml).unwrap();
        assert_eq!(config.account.page_size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_empty_uuid_is_rejected() {
        let toml = r#"
            [account]
            name = "a"
            uuid = " "
        "#;
        assert!(matches!(Config::from_toml(toml), Err(AccountError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_TOKEN, "secret"),
            (ENV_FEATURE_BOUNDARIES, "true"),
            (ENV_FEATURE_SERVICE_USERS, "0"),
        ]);

        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert!(config.features.boundaries);
        assert!(!config.features.service_users);
    }

    #[test]
    fn test_invalid_flag_value() {
        let mut config = Config::from_toml(MINIMAL).unwrap();
        let result = config.apply_env_overrides(|k| {
            (k == ENV_FEATURE_BOUNDARIES).then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("does/not/exist.toml");
        assert!(matches!(result, Err(AccountError::Config(_))));
    }
}
