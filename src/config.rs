use std::env;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub http_timeout: Duration,
    /// `None` keeps cached queries until they are invalidated.
    pub cache_ttl: Option<Duration>,
    pub email_redirect_url: Option<String>,
}

fn required_env_var(key: &'static str) -> Result<String, ConfigError> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn optional_env_var(key: &'static str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn seconds_env_var(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional_env_var(key) {
        Some(raw) => raw.parse::<u64>().map_err(|err| ConfigError::Invalid {
            key,
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok(); // Load .env file

        let supabase_url = required_env_var("SUPABASE_URL")?;
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "SUPABASE_URL",
                reason: "expected an http(s) URL".into(),
            });
        }
        let supabase_anon_key = required_env_var("SUPABASE_ANON_KEY")?;

        let http_timeout = Duration::from_secs(seconds_env_var(
            "JANMITR_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);
        let cache_ttl = match seconds_env_var("JANMITR_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Config {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            http_timeout,
            cache_ttl,
            email_redirect_url: optional_env_var("JANMITR_EMAIL_REDIRECT_URL"),
        })
    }

    pub fn new(supabase_url: impl Into<String>, supabase_anon_key: impl Into<String>) -> Self {
        let supabase_url: String = supabase_url.into();
        Config {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key: supabase_anon_key.into(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            cache_ttl: Some(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            email_redirect_url: None,
        }
    }
}
