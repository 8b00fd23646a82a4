//! The converter session.
//!
//! A session owns the state of one converter form: the selectable currencies,
//! the edited and settled amounts, the currency pair and the displayed
//! result. It runs as a single tokio task that is the only writer of that
//! state and publishes every change through a [`watch`] channel.
//!
//! ```text
//!  ConverterHandle ──events──▶ session task ──watch──▶ DisplayState observers
//!                               │      ▲
//!                 amount edits  ▼      │ settled
//!                             Debouncer
//!                               │
//!            settled / pair changes ──▶ spawned rate request ──completion──▶ session
//! ```
//!
//! Rate requests are never cancelled. Each one carries a sequence number and
//! a completion older than the newest completed one is dropped, so a slow
//! response cannot overwrite a fresher result or one for a pair the user has
//! since moved away from.

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::{ConverterConfig, DEFAULT_DEBOUNCE};
use crate::core::conversion::{ConversionRequest, ConversionResult};
use crate::core::currency::{CurrencyCode, CurrencyDirectory};
use crate::pipeline::debounce::{Debouncer, Settled};
use crate::pipeline::directory::load_directory;
use crate::provider::{ProviderError, RateProvider};

/// Input to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConverterEvent {
    AmountEdited(Decimal),
    SourceSelected(CurrencyCode),
    TargetSelected(CurrencyCode),
    Swap,
    Shutdown,
}

/// Everything an observer needs to render the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayState {
    pub currencies: CurrencyDirectory,
    /// Amount as last edited, settled or not.
    pub amount: Decimal,
    /// Amount after the quiet period; `None` until the first settle.
    pub settled_amount: Option<Decimal>,
    pub source: CurrencyCode,
    pub target: CurrencyCode,
    pub result: Option<ConversionResult>,
    /// Flipped by every swap.
    pub swapped: bool,
}

impl DisplayState {
    /// Text shown in the result slot, e.g. `"10.80 USD"`.
    pub fn result_line(&self) -> Option<String> {
        self.result.as_ref().map(ConversionResult::to_string)
    }
}

/// Starting values for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub quiet_period: Duration,
    pub initial_amount: Decimal,
    pub source: CurrencyCode,
    pub target: CurrencyCode,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_DEBOUNCE,
            initial_amount: Decimal::ONE,
            source: CurrencyCode::new("EUR"),
            target: CurrencyCode::new("USD"),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self {
            quiet_period: config.debounce(),
            source: config.default_from().clone(),
            target: config.default_to().clone(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("converter session has shut down")]
pub struct SessionClosed;

/// Cloneable front end to a running session.
#[derive(Debug, Clone)]
pub struct ConverterHandle {
    events: mpsc::UnboundedSender<ConverterEvent>,
    state: watch::Receiver<DisplayState>,
}

impl ConverterHandle {
    pub fn send(&self, event: ConverterEvent) -> Result<(), SessionClosed> {
        self.events.send(event).map_err(|_| SessionClosed)
    }

    pub fn edit_amount(&self, amount: Decimal) -> Result<(), SessionClosed> {
        self.send(ConverterEvent::AmountEdited(amount))
    }

    pub fn select_source(&self, code: CurrencyCode) -> Result<(), SessionClosed> {
        self.send(ConverterEvent::SourceSelected(code))
    }

    pub fn select_target(&self, code: CurrencyCode) -> Result<(), SessionClosed> {
        self.send(ConverterEvent::TargetSelected(code))
    }

    pub fn swap(&self) -> Result<(), SessionClosed> {
        self.send(ConverterEvent::Swap)
    }

    pub fn shutdown(&self) -> Result<(), SessionClosed> {
        self.send(ConverterEvent::Shutdown)
    }

    /// A receiver that observes every published state.
    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.state.clone()
    }

    /// The most recently published state.
    pub fn snapshot(&self) -> DisplayState {
        self.state.borrow().clone()
    }
}

/// Outcome of one spawned rate request.
#[derive(Debug)]
struct Completion {
    sequence: u64,
    request: ConversionRequest,
    outcome: Result<Decimal, ProviderError>,
}

/// Session state and the channels it writes to.
pub struct ConverterSession {
    provider: Arc<dyn RateProvider>,
    state: DisplayState,
    debouncer: Debouncer<Decimal>,
    publisher: watch::Sender<DisplayState>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    issued: u64,
    completed: u64,
}

impl ConverterSession {
    /// Start a session on the current tokio runtime.
    ///
    /// The initial amount goes through the debounce stage like any other
    /// edit, so the first conversion fires one quiet period after start.
    /// The currency directory loads alongside; until it arrives every
    /// selection is accepted.
    pub fn spawn(
        provider: Arc<dyn RateProvider>,
        options: SessionOptions,
    ) -> (ConverterHandle, JoinHandle<()>) {
        let initial = DisplayState {
            currencies: CurrencyDirectory::new(),
            amount: options.initial_amount,
            settled_amount: None,
            source: options.source,
            target: options.target,
            result: None,
            swapped: false,
        };

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (publisher, state_rx) = watch::channel(initial.clone());
        let (debouncer, settled_rx) = Debouncer::new(options.quiet_period);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let session = Self {
            provider,
            state: initial,
            debouncer,
            publisher,
            completions_tx,
            issued: 0,
            completed: 0,
        };

        let task = tokio::spawn(session.run(events_rx, settled_rx, completions_rx));
        let handle = ConverterHandle {
            events: events_tx,
            state: state_rx,
        };
        (handle, task)
    }

    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<ConverterEvent>,
        mut settled: mpsc::UnboundedReceiver<Settled<Decimal>>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        self.debouncer.push(self.state.amount);

        let (directory_tx, mut directory_rx) = oneshot::channel();
        let provider = Arc::clone(&self.provider);
        let directory_task = tokio::spawn(async move {
            let _ = directory_tx.send(load_directory(provider.as_ref()).await);
        });
        let mut directory_pending = true;

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(ConverterEvent::Shutdown) | None => break,
                    Some(event) => self.handle_event(event),
                },
                directory = &mut directory_rx, if directory_pending => {
                    directory_pending = false;
                    match directory {
                        Ok(directory) => self.handle_directory(directory),
                        Err(_) => log::error!("currency directory task ended without a result"),
                    }
                }
                Some(value) = settled.recv() => self.handle_settled(value),
                Some(completion) = completions.recv() => {
                    self.handle_completion(completion)
                }
            }
        }

        directory_task.abort();
        self.debouncer.cancel();
        log::debug!("converter session stopped");
    }

    fn handle_event(&mut self, event: ConverterEvent) {
        match event {
            ConverterEvent::AmountEdited(amount) => {
                if amount.is_sign_negative() && !amount.is_zero() {
                    log::warn!("ignoring negative amount {}", amount);
                    return;
                }
                self.state.amount = amount;
                self.debouncer.push(amount);
                self.publish();
            }
            ConverterEvent::SourceSelected(code) => {
                if !self.selectable(&code) || code == self.state.source {
                    return;
                }
                self.state.source = code;
                self.publish();
                self.request_conversion();
            }
            ConverterEvent::TargetSelected(code) => {
                if !self.selectable(&code) || code == self.state.target {
                    return;
                }
                self.state.target = code;
                self.publish();
                self.request_conversion();
            }
            ConverterEvent::Swap => {
                std::mem::swap(&mut self.state.source, &mut self.state.target);
                self.state.swapped = !self.state.swapped;
                self.publish();
                self.request_conversion();
            }
            ConverterEvent::Shutdown => {}
        }
    }

    fn handle_directory(&mut self, directory: CurrencyDirectory) {
        self.state.currencies = directory;
        self.publish();
    }

    fn selectable(&self, code: &CurrencyCode) -> bool {
        if self.state.currencies.accepts(code) {
            return true;
        }
        log::warn!("ignoring selection of unsupported currency {}", code);
        false
    }

    fn handle_settled(&mut self, settled: Settled<Decimal>) {
        let Some(amount) = self.debouncer.accept(settled) else {
            return;
        };
        if self.state.settled_amount == Some(amount) {
            log::debug!("settled amount {} unchanged", amount);
            return;
        }
        log::debug!("amount settled at {}", amount);
        self.state.settled_amount = Some(amount);
        self.publish();
        self.request_conversion();
    }

    fn request_conversion(&mut self) {
        let Some(amount) = self.state.settled_amount else {
            return;
        };
        let request = match ConversionRequest::new(
            amount,
            self.state.source.clone(),
            self.state.target.clone(),
        ) {
            Ok(request) => request,
            Err(e) => {
                log::error!("error converting currencies: {}", e);
                return;
            }
        };

        self.issued += 1;
        let sequence = self.issued;
        let provider = Arc::clone(&self.provider);
        let tx = self.completions_tx.clone();
        log::debug!(
            "requesting {} -> {} (request #{})",
            request.source(),
            request.target(),
            sequence
        );

        tokio::spawn(async move {
            let outcome = provider.pair_rate(request.source(), request.target()).await;
            let _ = tx.send(Completion {
                sequence,
                request,
                outcome,
            });
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        if completion.sequence < self.completed {
            log::debug!(
                "discarding request #{}, #{} already completed",
                completion.sequence,
                self.completed
            );
            return;
        }
        // A failed newer request still supersedes older ones.
        self.completed = completion.sequence;

        let rate = match completion.outcome {
            Ok(rate) => rate,
            Err(e) => {
                log::error!("error converting currencies: {}", e);
                return;
            }
        };

        match completion.request.convert(rate) {
            Ok(result) => {
                self.state.result = Some(result);
                self.publish();
            }
            Err(e) => log::error!("error converting currencies: {}", e),
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }
}
