//! freecurrencyapi.com provider.
//!
//! Both calls hit the same `latest` endpoint. Without parameters it returns
//! every supported currency against USD; with `base_currency` and
//! `currencies` it returns only the requested pair:
//!
//! ```text
//! GET /v1/latest?apikey=...&currencies=USD&base_currency=EUR
//! {"data": {"USD": 1.0812}}
//! ```

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use super::{ProviderError, RateProvider};
use crate::config::ConverterConfig;
use crate::core::currency::CurrencyCode;

const PROVIDER_ID: &str = "FREECURRENCYAPI";

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.freecurrencyapi.com/v1";

/// Default HTTP request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct LatestResponse {
    data: HashMap<String, f64>,
}

/// HTTP client for freecurrencyapi.com.
///
/// # Example
///
/// ```no_run
/// use fx_converter::provider::{FreeCurrencyApiProvider, RateProvider};
/// use fx_converter::core::currency::CurrencyCode;
///
/// # async fn run() -> Result<(), fx_converter::provider::ProviderError> {
/// let provider = FreeCurrencyApiProvider::new("fca_live_...");
/// let rate = provider
///     .pair_rate(&CurrencyCode::new("EUR"), &CurrencyCode::new("USD"))
///     .await?;
/// println!("1 EUR = {rate} USD");
/// # Ok(())
/// # }
/// ```
pub struct FreeCurrencyApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl FreeCurrencyApiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_options(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::with_options(config.api_key(), config.base_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_latest(&self, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        let url = format!("{}/latest", self.base_url);
        log::debug!("{}: GET {} {:?}", PROVIDER_ID, url, query);

        // The key travels in the query string, so strip URLs from errors
        // before they reach a log line.
        let response = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| network_error(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Http {
                provider: PROVIDER_ID,
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| network_error(e.without_url()))
    }
}

impl fmt::Debug for FreeCurrencyApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeCurrencyApiProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl RateProvider for FreeCurrencyApiProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn latest_rates(&self) -> Result<HashMap<CurrencyCode, Decimal>, ProviderError> {
        let body = self.fetch_latest(&[]).await?;
        decode_latest(&body)
    }

    async fn pair_rate(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<Decimal, ProviderError> {
        let body = self
            .fetch_latest(&[
                ("currencies", target.as_str()),
                ("base_currency", base.as_str()),
            ])
            .await?;
        decode_pair(&body, base, target)
    }
}

fn network_error(e: reqwest::Error) -> ProviderError {
    let message = if e.is_timeout() {
        format!("timed out: {e}")
    } else {
        e.to_string()
    };
    ProviderError::Network {
        provider: PROVIDER_ID,
        message,
    }
}

fn parse_body(body: &str) -> Result<HashMap<String, f64>, ProviderError> {
    serde_json::from_str::<LatestResponse>(body)
        .map(|response| response.data)
        .map_err(|e| ProviderError::MalformedPayload {
            provider: PROVIDER_ID,
            message: e.to_string(),
        })
}

fn to_decimal(
    base: &CurrencyCode,
    target: &CurrencyCode,
    raw: f64,
) -> Result<Decimal, ProviderError> {
    let invalid = || ProviderError::InvalidRate {
        base: base.clone(),
        target: target.clone(),
        rate: raw.to_string(),
    };
    if !raw.is_finite() || raw <= 0.0 {
        return Err(invalid());
    }
    Decimal::try_from(raw).map_err(|_| invalid())
}

/// Decode the unparameterised `latest` payload.
///
/// Entries with unusable rates are skipped; the currency list matters more
/// than any single value in it.
pub(crate) fn decode_latest(body: &str) -> Result<HashMap<CurrencyCode, Decimal>, ProviderError> {
    let raw = parse_body(body)?;
    let base = CurrencyCode::new("USD");
    let mut rates = HashMap::with_capacity(raw.len());
    for (code, value) in raw {
        let code = CurrencyCode::new(code);
        match to_decimal(&base, &code, value) {
            Ok(rate) => {
                rates.insert(code, rate);
            }
            Err(e) => log::warn!("{}: skipping {}: {}", PROVIDER_ID, code, e),
        }
    }
    Ok(rates)
}

/// Decode a single-pair payload and pick out `target`.
pub(crate) fn decode_pair(
    body: &str,
    base: &CurrencyCode,
    target: &CurrencyCode,
) -> Result<Decimal, ProviderError> {
    let raw = parse_body(body)?;
    let value = raw
        .iter()
        .find(|(code, _)| CurrencyCode::new(code.as_str()) == *target)
        .map(|(_, value)| *value)
        .ok_or_else(|| ProviderError::RateNotFound {
            base: base.clone(),
            target: target.clone(),
        })?;
    to_decimal(base, target, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn eur() -> CurrencyCode {
        CurrencyCode::new("EUR")
    }

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD")
    }

    #[test]
    fn test_decode_latest_collects_codes() {
        let body = r#"{"data": {"EUR": 0.92, "USD": 1, "JPY": 149.5}}"#;
        let rates = decode_latest(body).unwrap();
        assert_eq!(rates.len(), 3);
        assert_eq!(rates[&CurrencyCode::new("JPY")], dec!(149.5));
    }

    #[test]
    fn test_decode_latest_empty_data() {
        let rates = decode_latest(r#"{"data": {}}"#).unwrap();
        assert!(rates.is_empty());
    }

    #[test]
    fn test_decode_latest_skips_bad_rates() {
        let rates = decode_latest(r#"{"data": {"EUR": 0.92, "XXX": 0}}"#).unwrap();
        assert_eq!(rates.len(), 1);
        assert!(rates.contains_key(&eur()));
    }

    #[test]
    fn test_decode_missing_data_is_malformed() {
        let body = r#"{"message": "Invalid authentication credentials"}"#;
        let err = decode_latest(body).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedPayload { .. }));
    }

    #[test]
    fn test_decode_non_json_is_malformed() {
        assert!(matches!(
            decode_latest("<html>bad gateway</html>"),
            Err(ProviderError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_decode_pair() {
        let rate = decode_pair(r#"{"data": {"USD": 1.08}}"#, &eur(), &usd()).unwrap();
        assert_eq!(rate, dec!(1.08));
    }

    #[test]
    fn test_decode_pair_missing_target() {
        let err = decode_pair(r#"{"data": {"GBP": 0.86}}"#, &eur(), &usd()).unwrap_err();
        assert!(matches!(err, ProviderError::RateNotFound { .. }));
    }

    #[test]
    fn test_decode_pair_negative_rate() {
        let err = decode_pair(r#"{"data": {"USD": -1.0}}"#, &eur(), &usd()).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRate { .. }));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let url = "http://localhost:9000/v1/";
        let provider = FreeCurrencyApiProvider::with_options("k", url, DEFAULT_TIMEOUT);
        assert_eq!(provider.base_url(), "http://localhost:9000/v1");
    }

    #[test]
    fn test_debug_redacts_key() {
        let provider = FreeCurrencyApiProvider::new("fca_live_secret");
        let rendered = format!("{:?}", provider);
        assert!(!rendered.contains("fca_live_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
