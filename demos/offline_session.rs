//! Drives a converter session against a fixed rate table.
//!
//! Shows the debounce at work: a burst of edits produces a single
//! conversion, and a swap converts straight away.

use async_trait::async_trait;
use fx_converter::core::currency::CurrencyCode;
use fx_converter::pipeline::converter::{ConverterSession, SessionOptions};
use fx_converter::provider::{ProviderError, RateProvider};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

struct FixedRates(HashMap<(CurrencyCode, CurrencyCode), Decimal>);

#[async_trait]
impl RateProvider for FixedRates {
    fn id(&self) -> &'static str {
        "FIXED"
    }

    async fn latest_rates(&self) -> Result<HashMap<CurrencyCode, Decimal>, ProviderError> {
        Ok(self
            .0
            .keys()
            .map(|(base, _)| (base.clone(), Decimal::ONE))
            .collect())
    }

    async fn pair_rate(
        &self,
        base: &CurrencyCode,
        target: &CurrencyCode,
    ) -> Result<Decimal, ProviderError> {
        self.0
            .get(&(base.clone(), target.clone()))
            .copied()
            .ok_or_else(|| ProviderError::RateNotFound {
                base: base.clone(),
                target: target.clone(),
            })
    }
}

#[tokio::main]
async fn main() {
    println!("╔══════════════════════════════════════════╗");
    println!("║  fx-converter: Offline Session Example   ║");
    println!("╚══════════════════════════════════════════╝\n");

    let mut table = HashMap::new();
    table.insert((CurrencyCode::new("EUR"), CurrencyCode::new("USD")), dec!(1.08));
    table.insert((CurrencyCode::new("USD"), CurrencyCode::new("EUR")), dec!(0.9259));
    let provider: Arc<dyn RateProvider> = Arc::new(FixedRates(table));

    let options = SessionOptions {
        quiet_period: Duration::from_millis(300),
        ..SessionOptions::default()
    };
    let (handle, task) = ConverterSession::spawn(provider, options);
    let mut state = handle.subscribe();

    println!("━━━ Typing 1, 10, 100 in quick succession ━━━\n");
    for amount in [dec!(1), dec!(10), dec!(100)] {
        handle.edit_amount(amount).expect("session running");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let shown = state
        .wait_for(|s| s.result.is_some())
        .await
        .expect("session running")
        .clone();
    println!(
        "  settled at {} → {}\n",
        shown.settled_amount.unwrap_or_default(),
        shown.result_line().unwrap_or_default()
    );

    println!("━━━ Swapping currencies ━━━\n");
    handle.swap().expect("session running");
    let shown = state
        .wait_for(|s| s.result.as_ref().is_some_and(|r| r.currency().as_str() == "EUR"))
        .await
        .expect("session running")
        .clone();
    println!(
        "  {} {} → {}",
        shown.settled_amount.unwrap_or_default(),
        shown.source,
        shown.result_line().unwrap_or_default()
    );

    handle.shutdown().expect("session running");
    task.await.expect("session task");
}
