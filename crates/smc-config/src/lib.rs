//! Shared configuration for SMC clients.
//!
//! TOML profiles, credential resolution (env + plaintext), and translation
//! to `smc_api::SessionConfig` plus `smc_api::Credential`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use smc_api::{ApiVersion, Credential, RetryPolicy, Session, SessionConfig, TlsMode};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{name}'")]
    UnknownProfile { name: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Api(#[from] smc_api::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named server profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            insecure: false,
            timeout: default_timeout(),
            retries: default_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    250
}

/// A named server profile.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Server base URL (e.g., "https://smc.example.com:8082").
    pub url: String,

    /// API client authentication key (plaintext -- prefer an env var).
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    pub api_key_env: Option<String>,

    /// Pin an API version ("6.5") instead of negotiating.
    pub api_version: Option<String>,

    /// Administrative domain to log in to.
    pub domain: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Override read retry count.
    pub retries: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "smc-rs", "smc").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("smc");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, then `SMC_*` environment overrides
/// (`SMC_DEFAULT_PROFILE`, `SMC_DEFAULTS__TIMEOUT`, ...).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("SMC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve an API key: the profile's env var first, then plaintext.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

pub fn resolve_credential(profile: &Profile, profile_name: &str) -> Result<Credential, ConfigError> {
    let credential = Credential::new(resolve_api_key(profile, profile_name)?);
    Ok(match profile.domain {
        Some(ref domain) => credential.with_domain(domain.clone()),
        None => credential,
    })
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `SessionConfig` from a profile, falling back to `defaults`.
///
/// TLS verification stays on unless the profile (or defaults) says
/// `insecure`; a `ca_cert` adds a trust root.
pub fn profile_to_session_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SessionConfig, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;

    let api_version = profile
        .api_version
        .as_deref()
        .map(str::parse::<ApiVersion>)
        .transpose()
        .map_err(|e| ConfigError::Validation {
            field: "api_version".into(),
            reason: e.to_string(),
        })?;

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::Verify
    };

    let mut config = SessionConfig::new(url);
    config.api_version = api_version;
    config.transport.tls = tls;
    config.transport.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    config.transport.retry = RetryPolicy {
        max_retries: profile.retries.unwrap_or(defaults.retries),
        backoff: Duration::from_millis(defaults.backoff_ms),
    };
    Ok(config)
}

/// Resolve a profile by name (or the default) into everything needed to
/// log in.
pub fn resolve_profile(
    config: &Config,
    name: Option<&str>,
) -> Result<(SessionConfig, Credential), ConfigError> {
    let (name, profile) = config.profile(name)?;
    let session_config = profile_to_session_config(profile, &config.defaults)?;
    let credential = resolve_credential(profile, name)?;
    Ok((session_config, credential))
}

/// Load the config, resolve a profile and log in.
pub async fn connect(name: Option<&str>) -> Result<Arc<Session>, ConfigError> {
    let config = load_config()?;
    let (session_config, credential) = resolve_profile(&config, name)?;
    Ok(Session::connect(session_config, &credential).await?)
}
