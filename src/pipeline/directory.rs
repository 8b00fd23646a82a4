//! One-shot load of the selectable currency set.

use crate::core::currency::CurrencyDirectory;
use crate::provider::RateProvider;

/// Ask `provider` for its latest rates once and keep the currency codes.
///
/// Failures and empty payloads are logged and yield an empty directory.
/// There is no retry.
pub async fn load_directory(provider: &dyn RateProvider) -> CurrencyDirectory {
    match provider.latest_rates().await {
        Ok(rates) if rates.is_empty() => {
            log::warn!("{}: latest rates payload was empty, no currencies to offer", provider.id());
            CurrencyDirectory::new()
        }
        Ok(rates) => {
            let directory: CurrencyDirectory = rates.into_keys().collect();
            log::debug!("{}: loaded {} currencies", provider.id(), directory.len());
            directory
        }
        Err(e) => {
            log::error!("{}: error fetching currencies: {}", provider.id(), e);
            CurrencyDirectory::new()
        }
    }
}
