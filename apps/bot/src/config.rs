use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

use crate::automation::form_walker::FormSettings;
use crate::automation::pacing::PacingSettings;

// ────────────────────────────────────────────────────────────────────────────
// Service configuration (environment)
// ────────────────────────────────────────────────────────────────────────────

/// Service configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub webdriver_url: String,
    pub headless: bool,
    pub bot_config_path: PathBuf,
    pub port: u16,
    pub rust_log: String,
    pub log_dir: PathBuf,
    pub log_rotation: String,
    pub log_max_files: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: env_or("DATABASE_URL", "sqlite://data/applications.db?mode=rwc"),
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            webdriver_url: env_or("WEBDRIVER_URL", "http://localhost:9515"),
            headless: parse_flag(&env_or("HEADLESS", "false")),
            bot_config_path: PathBuf::from(env_or("BOT_CONFIG_PATH", "config/config.yaml")),
            port: env_or("PORT", "5000")
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: env_or("RUST_LOG", "info"),
            log_dir: PathBuf::from(env_or("LOG_DIR", "logs")),
            log_rotation: env_or("LOG_ROTATION", "daily"),
            log_max_files: env_or("LOG_MAX_FILES", "5")
                .parse::<usize>()
                .context("LOG_MAX_FILES must be a positive integer")?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Bot configuration (YAML)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read bot config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid YAML in bot config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid bot config: {0}")]
    Invalid(String),

    #[error("Unknown account '{0}'")]
    UnknownAccount(String),
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_platform_name")]
    pub name: String,
    #[serde(flatten)]
    pub credentials: Credentials,
}

fn default_platform_name() -> String {
    "linkedin".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotSettings {
    pub keywords: Vec<String>,
    pub preferred_locations: Vec<String>,
    pub max_applications_per_day: u32,
    /// Question fragment → answer for required form fields.
    #[serde(default)]
    pub answers: BTreeMap<String, String>,
    #[serde(default)]
    pub pacing: PacingSettings,
    #[serde(default)]
    pub form: FormSettings,
    /// Ask the language model for free-text questions no configured answer covers.
    #[serde(default)]
    pub llm_answers: bool,
}

/// The YAML file that describes what to apply for and as whom.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub platform: PlatformConfig,
    /// Named alternative logins selectable from the start request.
    #[serde(default)]
    pub accounts: BTreeMap<String, Credentials>,
    pub resume_path: PathBuf,
    pub settings: BotSettings,
}

impl BotConfig {
    /// Reads and validates the YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: BotConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.platform.name.trim().is_empty() {
            return invalid("platform.name must not be empty");
        }
        check_credentials("platform", &self.platform.credentials)?;
        for (name, credentials) in &self.accounts {
            check_credentials(&format!("accounts.{name}"), credentials)?;
        }
        if !has_entry(&self.settings.keywords) {
            return invalid("settings.keywords needs at least one keyword");
        }
        if !has_entry(&self.settings.preferred_locations) {
            return invalid("settings.preferred_locations needs at least one location");
        }
        if self.settings.max_applications_per_day == 0 {
            return invalid("settings.max_applications_per_day must be at least 1");
        }
        if self.settings.form.max_steps == 0 {
            return invalid("settings.form.max_steps must be at least 1");
        }
        Ok(())
    }

    /// Login for `account`, or the platform's own login when none is named.
    pub fn credentials_for(&self, account: Option<&str>) -> Result<&Credentials, ConfigError> {
        match account.map(str::trim).filter(|a| !a.is_empty()) {
            None => Ok(&self.platform.credentials),
            Some(name) if name == self.platform.credentials.username => {
                Ok(&self.platform.credentials)
            }
            Some(name) => self
                .accounts
                .get(name)
                .ok_or_else(|| ConfigError::UnknownAccount(name.to_string())),
        }
    }

    pub fn keywords(&self) -> Vec<String> {
        non_blank(&self.settings.keywords)
    }

    pub fn locations(&self) -> Vec<String> {
        non_blank(&self.settings.preferred_locations)
    }
}

fn check_credentials(scope: &str, credentials: &Credentials) -> Result<(), ConfigError> {
    if credentials.username.trim().is_empty() || credentials.password.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "{scope} needs a non-empty username and password"
        )));
    }
    Ok(())
}

fn has_entry(values: &[String]) -> bool {
    values.iter().any(|v| !v.trim().is_empty())
}

fn non_blank(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
platform:
  name: linkedin
  username: me@example.com
  password: hunter2
accounts:
  backup:
    username: other@example.com
    password: s3cret
resume_path: data/resumes
settings:
  keywords: ["Software Engineer", "  "]
  preferred_locations: ["Remote"]
  max_applications_per_day: 20
  answers:
    "years of experience": "5"
  pacing: { short_min: 1, short_max: 2 }
  form: { max_steps: 8 }
"#;

    #[test]
    fn test_valid_config_parses_with_defaults() {
        let config = BotConfig::parse(VALID).unwrap();

        assert_eq!(config.platform.name, "linkedin");
        assert_eq!(config.settings.max_applications_per_day, 20);
        assert_eq!(config.keywords(), vec!["Software Engineer"]);
        assert_eq!(config.settings.pacing.short_max, 2.0);
        assert_eq!(config.settings.pacing.long_max, 120.0);
        assert_eq!(config.settings.form.max_steps, 8);
        assert_eq!(config.settings.form.submit_wait_secs, 10);
        assert!(!config.settings.llm_answers);
    }

    #[test]
    fn test_credentials_for_account() {
        let config = BotConfig::parse(VALID).unwrap();

        assert_eq!(config.credentials_for(None).unwrap().username, "me@example.com");
        assert_eq!(
            config.credentials_for(Some("backup")).unwrap().username,
            "other@example.com"
        );
        assert_eq!(
            config.credentials_for(Some("me@example.com")).unwrap().username,
            "me@example.com"
        );
        assert!(matches!(
            config.credentials_for(Some("nobody")),
            Err(ConfigError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_missing_keywords_is_invalid() {
        let raw = VALID.replace(r#"["Software Engineer", "  "]"#, "[]");
        assert!(matches!(BotConfig::parse(&raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_cap_is_invalid() {
        let raw = VALID.replace("max_applications_per_day: 20", "max_applications_per_day: 0");
        assert!(matches!(BotConfig::parse(&raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_empty_password_is_invalid() {
        let raw = VALID.replace("password: hunter2", "password: \"\"");
        assert!(matches!(BotConfig::parse(&raw), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_yaml_is_reported() {
        assert!(matches!(
            BotConfig::parse("platform: [unclosed"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_password_is_not_debug_printed() {
        let config = BotConfig::parse(VALID).unwrap();
        let printed = format!("{:?}", config.platform);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("me@example.com"));
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("TRUE"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }
}
