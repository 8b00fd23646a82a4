use crate::core::currency::CurrencyCode;
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of fractional digits shown for a converted amount.
pub const RESULT_SCALE: u32 = 2;

/// Errors arising from building or evaluating a conversion.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("amount must not be negative, got {0}")]
    NegativeAmount(Decimal),
    #[error("rate must be positive, got {rate} for {from} -> {to}")]
    InvalidRate {
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    },
    #[error("converting {amount} {from} at {rate} overflows")]
    Overflow {
        amount: Decimal,
        from: CurrencyCode,
        rate: Decimal,
    },
}

/// Round a converted amount for display.
///
/// Midpoints round away from zero, so `0.125` becomes `0.13`.
pub fn round_result(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(RESULT_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(RESULT_SCALE);
    rounded
}

/// A single conversion to perform: `amount` units of `source` into `target`.
///
/// Built fresh each time the settled amount or the currency pair changes.
///
/// # Examples
///
/// ```
/// use fx_converter::core::conversion::ConversionRequest;
/// use fx_converter::core::currency::CurrencyCode;
/// use rust_decimal_macros::dec;
///
/// let request = ConversionRequest::new(
///     dec!(10),
///     CurrencyCode::new("EUR"),
///     CurrencyCode::new("USD"),
/// ).unwrap();
///
/// let result = request.convert(dec!(1.08)).unwrap();
/// assert_eq!(result.to_string(), "10.80 USD");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    amount: Decimal,
    source: CurrencyCode,
    target: CurrencyCode,
}

impl ConversionRequest {
    pub fn new(
        amount: Decimal,
        source: CurrencyCode,
        target: CurrencyCode,
    ) -> Result<Self, ConversionError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(ConversionError::NegativeAmount(amount));
        }
        Ok(Self {
            amount,
            source,
            target,
        })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn source(&self) -> &CurrencyCode {
        &self.source
    }

    pub fn target(&self) -> &CurrencyCode {
        &self.target
    }

    /// Apply `rate` (units of target per unit of source) and round for display.
    pub fn convert(&self, rate: Decimal) -> Result<ConversionResult, ConversionError> {
        if rate <= Decimal::ZERO {
            return Err(ConversionError::InvalidRate {
                from: self.source.clone(),
                to: self.target.clone(),
                rate,
            });
        }
        let raw = self
            .amount
            .checked_mul(rate)
            .ok_or_else(|| ConversionError::Overflow {
                amount: self.amount,
                from: self.source.clone(),
                rate,
            })?;

        Ok(ConversionResult {
            amount: round_result(raw),
            currency: self.target.clone(),
            rate,
            converted_at: Utc::now(),
        })
    }
}

/// The converted amount shown to the user.
///
/// Replaced wholesale by every successful conversion; no history is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    amount: Decimal,
    currency: CurrencyCode,
    rate: Decimal,
    converted_at: DateTime<Utc>,
}

impl ConversionResult {
    /// Amount in the target currency, always carrying two fractional digits.
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &CurrencyCode {
        &self.currency
    }

    /// The rate the amount was computed with.
    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn converted_at(&self) -> DateTime<Utc> {
        self.converted_at
    }
}

impl fmt::Display for ConversionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}
