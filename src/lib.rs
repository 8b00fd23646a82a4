//! # fx-converter
//!
//! Currency converter backed by a live exchange rate API.
//!
//! A converter session loads the list of supported currencies once, waits
//! for amount edits to settle, and converts the settled amount between the
//! selected currencies whenever the amount or the pair changes.
//!
//! ## Architecture
//!
//! - **core** — Currency codes, the currency directory, conversion requests and results
//! - **provider** — Rate provider trait and the freecurrencyapi.com HTTP client
//! - **pipeline** — Directory loader, debouncer and the converter session
//! - **config** — Environment-driven configuration

pub mod config;
pub mod core;
pub mod pipeline;
pub mod provider;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::ConverterConfig;
    pub use crate::core::conversion::{ConversionRequest, ConversionResult};
    pub use crate::core::currency::{CurrencyCode, CurrencyDirectory};
    pub use crate::pipeline::converter::{
        ConverterEvent, ConverterHandle, ConverterSession, DisplayState, SessionOptions,
    };
    pub use crate::provider::{FreeCurrencyApiProvider, ProviderError, RateProvider};
}
