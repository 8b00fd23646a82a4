use fx_converter::core::conversion::{round_result, ConversionRequest, RESULT_SCALE};
use fx_converter::core::currency::{CurrencyCode, CurrencyDirectory};
use fx_converter::pipeline::debounce::Debouncer;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::time::Duration;

/// Generate a non-negative amount with up to 4 fractional digits.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000i64, 0u32..=4u32)
        .prop_map(|(mantissa, scale)| Decimal::new(mantissa, scale))
}

/// Generate a positive rate between 0.000001 and 100000.
fn arb_rate() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000_000i64).prop_map(|mantissa| Decimal::new(mantissa, 6))
}

/// Generate a three-letter code in mixed case.
fn arb_code() -> impl Strategy<Value = String> {
    "[A-Za-z]{3}"
}

fn eur_to_usd(amount: Decimal) -> ConversionRequest {
    ConversionRequest::new(amount, CurrencyCode::new("EUR"), CurrencyCode::new("USD")).unwrap()
}

proptest! {
    // ===================================================================
    // INVARIANT 1: Converted amounts always carry exactly two decimals.
    // ===================================================================
    #[test]
    fn result_has_display_scale(amount in arb_amount(), rate in arb_rate()) {
        let result = eur_to_usd(amount).convert(rate).unwrap();
        prop_assert_eq!(result.amount().scale(), RESULT_SCALE);
    }

    // ===================================================================
    // INVARIANT 2: Rounding moves the exact product by at most half a cent.
    // ===================================================================
    #[test]
    fn result_within_half_cent_of_exact(amount in arb_amount(), rate in arb_rate()) {
        let exact = amount * rate;
        let result = eur_to_usd(amount).convert(rate).unwrap();
        let error = (result.amount() - exact).abs();
        prop_assert!(
            error <= Decimal::new(5, 3),
            "{} * {} = {} rounded to {} (error {})",
            amount, rate, exact, result.amount(), error
        );
    }

    // ===================================================================
    // INVARIANT 3: Rounding is idempotent.
    // ===================================================================
    #[test]
    fn rounding_is_idempotent(amount in arb_amount(), rate in arb_rate()) {
        let once = round_result(amount * rate);
        prop_assert_eq!(round_result(once), once);
    }

    // ===================================================================
    // INVARIANT 4: Conversion never produces a negative amount.
    // ===================================================================
    #[test]
    fn result_is_never_negative(amount in arb_amount(), rate in arb_rate()) {
        let result = eur_to_usd(amount).convert(rate).unwrap();
        prop_assert!(result.amount() >= Decimal::ZERO);
    }

    // ===================================================================
    // INVARIANT 5: The directory is the set of normalised codes, whatever
    // order or case they arrive in.
    // ===================================================================
    #[test]
    fn directory_is_order_and_case_independent(codes in prop::collection::vec(arb_code(), 0..30)) {
        let forward: CurrencyDirectory = codes.iter().map(CurrencyCode::new).collect();
        let backward: CurrencyDirectory = codes
            .iter()
            .rev()
            .map(|c| CurrencyCode::new(c.to_lowercase()))
            .collect();
        prop_assert_eq!(&forward, &backward);

        let mut unique: Vec<String> = codes.iter().map(|c| c.to_uppercase()).collect();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(forward.len(), unique.len());
        for code in &unique {
            prop_assert!(forward.contains(&CurrencyCode::new(code)));
        }
    }

    // ===================================================================
    // INVARIANT 6: Edits arriving faster than the quiet period settle
    // exactly once, with the last value.
    // ===================================================================
    #[test]
    fn bursts_settle_once_with_last_value(gaps in prop::collection::vec(0u64..1000u64, 1..20)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .unwrap();

        let (settled, extra) = runtime.block_on(async {
            let quiet = Duration::from_millis(1000);
            let (mut debouncer, mut rx) = Debouncer::new(quiet);
            for (value, gap) in gaps.iter().enumerate() {
                debouncer.push(value);
                tokio::time::sleep(Duration::from_millis(*gap)).await;
            }
            tokio::time::sleep(quiet * 2).await;

            let mut values = Vec::new();
            while let Ok(message) = rx.try_recv() {
                if let Some(value) = debouncer.accept(message) {
                    values.push(value);
                }
            }
            (values, rx.try_recv().is_ok())
        });

        prop_assert_eq!(settled, vec![gaps.len() - 1]);
        prop_assert!(!extra);
    }
}
