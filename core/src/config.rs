//! Client configuration.

use std::time::Duration;

/// Uniform timeout applied to every request unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Base URL and timeout shared by every request a `Transport` sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Load configuration from the environment (and `.env`, if present).
    ///
    /// | Env Var                | Default  |
    /// |------------------------|----------|
    /// | `TUTOR_API_BASE_URL`   | required |
    /// | `TUTOR_API_TIMEOUT_MS` | `10000`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(
            std::env::var("TUTOR_API_BASE_URL").ok(),
            std::env::var("TUTOR_API_TIMEOUT_MS").ok(),
        )
    }

    fn from_vars(base_url: Option<String>, timeout_ms: Option<String>) -> Result<Self, ConfigError> {
        let base_url = base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("TUTOR_API_BASE_URL"))?;

        let config = Self::new(base_url.trim());
        match timeout_ms {
            None => Ok(config),
            Some(raw) => {
                let millis: u64 = raw
                    .trim()
                    .parse()
                    .ok()
                    .filter(|ms| *ms > 0)
                    .ok_or(ConfigError::Invalid {
                        name: "TUTOR_API_TIMEOUT_MS",
                        value: raw.clone(),
                    })?;
                Ok(config.with_timeout(Duration::from_millis(millis)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = ClientConfig::new("http://localhost:3000/");
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn timeout_defaults_to_ten_seconds() {
        let config = ClientConfig::from_vars(Some("http://api".into()), None).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn timeout_is_read_in_millis() {
        let config =
            ClientConfig::from_vars(Some("http://api".into()), Some("2500".into())).unwrap();
        assert_eq!(config.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn missing_base_url_is_rejected() {
        let err = ClientConfig::from_vars(None, None).unwrap_err();
        assert_matches!(err, ConfigError::Missing("TUTOR_API_BASE_URL"));
        let err = ClientConfig::from_vars(Some("  ".into()), None).unwrap_err();
        assert_matches!(err, ConfigError::Missing(_));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = ClientConfig::from_vars(Some("http://api".into()), Some("soon".into()))
            .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { name: "TUTOR_API_TIMEOUT_MS", .. });
        let err =
            ClientConfig::from_vars(Some("http://api".into()), Some("0".into())).unwrap_err();
        assert_matches!(err, ConfigError::Invalid { .. });
    }
}
