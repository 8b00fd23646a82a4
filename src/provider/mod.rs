//! Exchange rate providers.
//!
//! A [`RateProvider`] answers the two questions the converter asks:
//! which currencies exist, and what one unit of a base currency is worth
//! in a target currency right now.

pub mod freecurrencyapi;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use thiserror::Error;

use crate::core::currency::CurrencyCode;

pub use freecurrencyapi::FreeCurrencyApiProvider;

/// Errors returned by rate providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("request to {provider} failed: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    /// The provider answered with a non-success status.
    #[error("{provider} responded with HTTP {status}")]
    Http { provider: &'static str, status: u16 },

    /// The body could not be decoded into the expected shape.
    #[error("malformed payload from {provider}: {message}")]
    MalformedPayload {
        provider: &'static str,
        message: String,
    },

    /// The payload decoded but carried no rate for the requested pair.
    #[error("no rate for {base} -> {target}")]
    RateNotFound {
        base: CurrencyCode,
        target: CurrencyCode,
    },

    /// The rate was zero, negative, or not representable as a decimal.
    #[error("invalid rate {rate} for {base} -> {target}")]
    InvalidRate {
        base: CurrencyCode,
        target: CurrencyCode,
        rate: String,
    },
}

/// Source of currency codes and spot rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Identifier used in logs.
    fn id(&self) -> &'static str;

    /// All latest rates against the provider's default base.
    ///
    /// The keys of the returned map are the currencies the provider supports.
    async fn latest_rates(&self) -> Result<HashMap<CurrencyCode, Decimal>, ProviderError>;

    /// Units of `target` per one unit of `base`.
    async fn pair_rate(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<Decimal, ProviderError>;
}
