//! Runtime configuration.
//!
//! Settings come from an optional `fx-converter.toml` in the working
//! directory, overridden by `FX_CONVERTER_*` environment variables. A `.env`
//! file is loaded into the environment first. The API key has no default
//! and is never printed.

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::core::currency::CurrencyCode;
use crate::provider::freecurrencyapi::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Prefix of the environment variables read by [`ConverterConfig::from_env`].
pub const ENV_PREFIX: &str = "FX_CONVERTER";

/// Quiet period before an amount edit is considered settled.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    Load(#[from] config::ConfigError),
}

/// Converter configuration.
#[derive(Clone, Deserialize)]
pub struct ConverterConfig {
    /// freecurrencyapi.com key.
    #[serde(default)]
    api_key: String,
    #[serde(default = "default_base_url")]
    base_url: String,
    /// Debounce quiet period in milliseconds.
    #[serde(default = "default_debounce_ms")]
    debounce_ms: u64,
    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
    #[serde(default = "default_from")]
    default_from: CurrencyCode,
    #[serde(default = "default_to")]
    default_to: CurrencyCode,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_from() -> CurrencyCode {
    CurrencyCode::new("EUR")
}

fn default_to() -> CurrencyCode {
    CurrencyCode::new("USD")
}

impl ConverterConfig {
    /// Configuration with the given key and every other setting defaulted.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            debounce_ms: default_debounce_ms(),
            timeout_secs: default_timeout_secs(),
            default_from: default_from(),
            default_to: default_to(),
        }
    }

    /// Load from `fx-converter.toml` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => log::debug!("loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("ignoring unreadable .env file: {}", e),
        }

        let builder = config::Config::builder()
            .add_source(config::File::with_name("fx-converter").required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX));
        Self::from_builder(builder)
    }

    /// Load from an explicit set of `FX_CONVERTER_*` variables.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let builder = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX).source(Some(vars)));
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config: Self = builder.build()?.try_deserialize()?;
        config.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.api_key = self.api_key.trim().to_string();
        if self.api_key.is_empty() {
            return Err(ConfigError::Missing("FX_CONVERTER_API_KEY"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "FX_CONVERTER_BASE_URL",
                value: self.base_url,
                reason: "expected an http(s) URL".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "FX_CONVERTER_TIMEOUT_SECS",
                value: self.timeout_secs.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn default_from(&self) -> &CurrencyCode {
        &self.default_from
    }

    pub fn default_to(&self) -> &CurrencyCode {
        &self.default_to
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("debounce_ms", &self.debounce_ms)
            .field("timeout_secs", &self.timeout_secs)
            .field("default_from", &self.default_from)
            .field("default_to", &self.default_to)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ConverterConfig, ConfigError> {
        ConverterConfig::from_vars(vars.iter().copied())
    }

    #[test]
    fn test_missing_key() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("FX_CONVERTER_API_KEY")));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let err = load(&[("FX_CONVERTER_API_KEY", "  ")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("FX_CONVERTER_API_KEY", "key")]).unwrap();
        assert_eq!(config.api_key(), "key");
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.debounce(), Duration::from_millis(1000));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.default_from(), &CurrencyCode::new("EUR"));
        assert_eq!(config.default_to(), &CurrencyCode::new("USD"));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("FX_CONVERTER_API_KEY", "key"),
            ("FX_CONVERTER_BASE_URL", "http://127.0.0.1:8080/v1"),
            ("FX_CONVERTER_DEBOUNCE_MS", "250"),
            ("FX_CONVERTER_TIMEOUT_SECS", "5"),
            ("FX_CONVERTER_DEFAULT_FROM", "gbp"),
            ("FX_CONVERTER_DEFAULT_TO", "jpy"),
        ])
        .unwrap();
        assert_eq!(config.base_url(), "http://127.0.0.1:8080/v1");
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.default_from().as_str(), "GBP");
        assert_eq!(config.default_to().as_str(), "JPY");
    }

    #[test]
    fn test_unrelated_variables_ignored() {
        let config = load(&[("FX_CONVERTER_API_KEY", "key"), ("PATH", "/usr/bin")]).unwrap();
        assert_eq!(config.api_key(), "key");
    }

    #[test]
    fn test_invalid_debounce() {
        let err = load(&[("FX_CONVERTER_API_KEY", "key"), ("FX_CONVERTER_DEBOUNCE_MS", "soon")])
            .unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = load(&[("FX_CONVERTER_API_KEY", "key"), ("FX_CONVERTER_TIMEOUT_SECS", "0")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "FX_CONVERTER_TIMEOUT_SECS", .. }
        ));
    }

    #[test]
    fn test_base_url_must_be_http() {
        let err = load(&[("FX_CONVERTER_API_KEY", "key"), ("FX_CONVERTER_BASE_URL", "ftp://x")])
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { name: "FX_CONVERTER_BASE_URL", .. }
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = ConverterConfig::new("fca_live_secret");
        assert!(!format!("{:?}", config).contains("fca_live_secret"));
    }
}
