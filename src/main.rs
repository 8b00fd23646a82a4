//! fx-converter CLI
//!
//! Convert amounts between currencies using live rates.
//!
//! # Usage
//!
//! ```bash
//! # List the currencies the provider supports
//! fx-converter currencies
//!
//! # One-shot conversion
//! fx-converter convert --amount 10 --from EUR --to USD
//!
//! # Output as JSON
//! fx-converter convert --amount 10 --from EUR --to USD --format json
//!
//! # Live converter: type amounts, switch currencies, swap
//! fx-converter interactive
//! ```
//!
//! The API key is read from `FX_CONVERTER_API_KEY` (or a `.env` file).

use fx_converter::config::ConverterConfig;
use fx_converter::core::conversion::ConversionRequest;
use fx_converter::core::currency::CurrencyCode;
use fx_converter::pipeline::converter::{ConverterHandle, ConverterSession, SessionOptions};
use fx_converter::pipeline::directory::load_directory;
use fx_converter::provider::{FreeCurrencyApiProvider, RateProvider};
use rust_decimal::Decimal;
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

fn print_usage() {
    eprintln!(
        r#"fx-converter — currency converter backed by live exchange rates

USAGE:
    fx-converter <COMMAND> [OPTIONS]

COMMANDS:
    currencies    List supported currency codes
    convert       Convert a single amount
    interactive   Run the live converter on stdin
    help          Show this message

OPTIONS (currencies):
    --format <FORMAT>   Output format: text (default) or json

OPTIONS (convert):
    --amount <N>        Amount to convert (required)
    --from <CODE>       Source currency (default: FX_CONVERTER_DEFAULT_FROM or EUR)
    --to <CODE>         Target currency (default: FX_CONVERTER_DEFAULT_TO or USD)
    --format <FORMAT>   Output format: text (default) or json

ENVIRONMENT:
    FX_CONVERTER_API_KEY        API key for freecurrencyapi.com (required)
    FX_CONVERTER_BASE_URL       API root (default: https://api.freecurrencyapi.com/v1)
    FX_CONVERTER_DEBOUNCE_MS    Quiet period for interactive edits (default: 1000)
    FX_CONVERTER_TIMEOUT_SECS   HTTP timeout (default: 30)
    RUST_LOG                    Log filter (default: warn)

EXAMPLES:
    fx-converter currencies
    fx-converter convert --amount 10 --from EUR --to USD
    fx-converter convert --amount 250 --from gbp --to jpy --format json
    fx-converter interactive"#
    );
}

fn print_interactive_help() {
    println!(
        r#"Type an amount to convert it. Other commands:
    from <CODE>   change the source currency
    to <CODE>     change the target currency
    swap          exchange source and target
    list          show available currencies
    state         show the current form
    quit          leave"#
    );
}

#[derive(serde::Serialize)]
struct ConversionOutput {
    amount: String,
    from: String,
    to: String,
    rate: String,
    result: String,
}

fn load_config() -> ConverterConfig {
    ConverterConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        eprintln!("Set FX_CONVERTER_API_KEY in the environment or in a .env file.");
        process::exit(1);
    })
}

fn parse_format(args: &[String], i: usize) -> String {
    let format = args.get(i).cloned().unwrap_or_else(|| {
        eprintln!("--format requires 'text' or 'json'");
        process::exit(1);
    });
    if format != "text" && format != "json" {
        eprintln!("Unknown format '{}': expected 'text' or 'json'", format);
        process::exit(1);
    }
    format
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error encoding JSON: {}", e);
        process::exit(1);
    })
}

async fn cmd_currencies(args: &[String]) {
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--format" => {
                i += 1;
                format = parse_format(args, i);
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = load_config();
    let provider = FreeCurrencyApiProvider::from_config(&config);
    let directory = load_directory(&provider).await;

    if directory.is_empty() {
        eprintln!("No currencies available (run with RUST_LOG=error for details)");
        process::exit(1);
    }

    if format == "json" {
        println!("{}", to_json(&directory));
    } else {
        for code in directory.iter() {
            println!("{}", code);
        }
        println!("\nTotal currencies: {}", directory.len());
    }
}

async fn cmd_convert(args: &[String]) {
    let mut amount: Option<Decimal> = None;
    let mut from: Option<CurrencyCode> = None;
    let mut to: Option<CurrencyCode> = None;
    let mut format = "text".to_string();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--amount" => {
                i += 1;
                amount = Some(
                    args.get(i)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or_else(|| {
                            eprintln!("--amount requires a decimal number");
                            process::exit(1);
                        }),
                );
            }
            "--from" => {
                i += 1;
                from = Some(args.get(i).map(CurrencyCode::new).unwrap_or_else(|| {
                    eprintln!("--from requires a currency code");
                    process::exit(1);
                }));
            }
            "--to" => {
                i += 1;
                to = Some(args.get(i).map(CurrencyCode::new).unwrap_or_else(|| {
                    eprintln!("--to requires a currency code");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = parse_format(args, i);
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let amount = amount.unwrap_or_else(|| {
        eprintln!("Error: --amount <N> is required");
        process::exit(1);
    });

    let config = load_config();
    let from = from.unwrap_or_else(|| config.default_from().clone());
    let to = to.unwrap_or_else(|| config.default_to().clone());

    let request = ConversionRequest::new(amount, from, to).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        process::exit(1);
    });

    let provider = FreeCurrencyApiProvider::from_config(&config);
    let rate = provider
        .pair_rate(request.source(), request.target())
        .await
        .unwrap_or_else(|e| {
            eprintln!("Error converting currencies: {}", e);
            process::exit(1);
        });
    let result = request.convert(rate).unwrap_or_else(|e| {
        eprintln!("Error converting currencies: {}", e);
        process::exit(1);
    });

    if format == "json" {
        let output = ConversionOutput {
            amount: request.amount().to_string(),
            from: request.source().to_string(),
            to: request.target().to_string(),
            rate: result.rate().to_string(),
            result: result.amount().to_string(),
        };
        println!("{}", to_json(&output));
    } else {
        println!("{}", result);
    }
}

/// Apply one line of interactive input. Returns `false` when the user quits.
fn apply_command(handle: &ConverterHandle, line: &str) -> bool {
    let mut parts = line.split_whitespace();
    let sent = match (parts.next(), parts.next()) {
        (None, _) => Ok(()),
        (Some("quit" | "exit"), _) => return false,
        (Some("help"), _) => {
            print_interactive_help();
            Ok(())
        }
        (Some("swap"), None) => handle.swap(),
        (Some("from"), Some(code)) => handle.select_source(CurrencyCode::new(code)),
        (Some("to"), Some(code)) => handle.select_target(CurrencyCode::new(code)),
        (Some("list"), None) => {
            let state = handle.snapshot();
            if state.currencies.is_empty() {
                println!("(no currency list loaded)");
            } else {
                println!("{}", state.currencies);
            }
            Ok(())
        }
        (Some("state"), None) => {
            let state = handle.snapshot();
            println!(
                "{} {} -> {} = {}",
                state.amount,
                state.source,
                state.target,
                state.result_line().unwrap_or_else(|| "…".to_string())
            );
            Ok(())
        }
        (Some(word), None) => match word.parse::<Decimal>() {
            Ok(amount) => handle.edit_amount(amount),
            Err(_) => {
                eprintln!("Unknown command: {} (type 'help')", word);
                Ok(())
            }
        },
        (Some(word), Some(_)) => {
            eprintln!("Unknown command: {} (type 'help')", word);
            Ok(())
        }
    };
    sent.is_ok()
}

async fn cmd_interactive(args: &[String]) {
    if let Some(arg) = args.first() {
        eprintln!("Unknown option: {}", arg);
        process::exit(1);
    }

    let config = load_config();
    let provider: Arc<dyn RateProvider> = Arc::new(FreeCurrencyApiProvider::from_config(&config));
    let (handle, task) = ConverterSession::spawn(provider, SessionOptions::from_config(&config));

    print_interactive_help();

    let mut state_rx = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown_result: Option<String> = None;
    let mut shown_pair = {
        let state = state_rx.borrow();
        (state.source.clone(), state.target.clone())
    };
    let mut shown_currencies = 0usize;

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = state_rx.borrow_and_update().clone();
                if state.currencies.len() != shown_currencies {
                    shown_currencies = state.currencies.len();
                    println!("{} currencies available", shown_currencies);
                }
                let pair = (state.source.clone(), state.target.clone());
                if pair != shown_pair {
                    println!("{} -> {}", pair.0, pair.1);
                    shown_pair = pair;
                }
                let result = state.result_line();
                if result != shown_result {
                    if let Some(line) = &result {
                        println!("= {}", line);
                    }
                    shown_result = result;
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !apply_command(&handle, line.trim()) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    eprintln!("Error reading input: {}", e);
                    break;
                }
            },
        }
    }

    let _ = handle.shutdown();
    if let Err(e) = task.await {
        log::error!("converter session panicked: {}", e);
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "currencies" => cmd_currencies(rest).await,
        "convert" => cmd_convert(rest).await,
        "interactive" => cmd_interactive(rest).await,
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
