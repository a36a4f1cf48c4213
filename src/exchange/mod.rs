//! Exchange tracking across the client's suspend/resume cycle
//!
//! Each request the client sends opens an exchange:
//!
//! ```text
//! Idle -> Issued -> AwaitingResponse -> Resolved | TimedOut | Abandoned
//! ```
//!
//! Pending exchanges are persisted through a [`PendingStore`] before the host
//! is launched, so a response that arrives after the process was evicted and
//! restarted still finds its record. A single [`ExchangeListener`] receives
//! exactly one terminal [`ExchangeOutcome`] per exchange.

mod clock;
mod store;

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{LaunchError, StoreError};
use crate::model::{CorrelationId, Response, Variant};

pub use clock::{Clock, ManualClock, SystemClock};
use clock::millis;
pub use store::{FileStore, MemoryStore, PendingRecord, PendingState, PendingStore};

/// Timing policy for pending exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangePolicy {
    /// How long a persisted record survives before it is abandoned at startup
    pub grace_window: Duration,
    /// Hard deadline applied by [`ExchangeTracker::expire_overdue`]
    pub response_deadline: Option<Duration>,
}

impl Default for ExchangePolicy {
    fn default() -> Self {
        Self {
            grace_window: Duration::from_secs(15 * 60),
            response_deadline: None,
        }
    }
}

/// Lifecycle state of a single exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeState {
    Idle,
    Issued,
    AwaitingResponse,
    Resolved,
    TimedOut,
    Abandoned,
}

impl ExchangeState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::TimedOut | Self::Abandoned)
    }
}

/// Handle to an exchange; doubles as its cancellation token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Terminal result of an exchange, reported once to the listener
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Resolved {
        ticket: Ticket,
        response: Response,
    },
    LaunchFailed {
        ticket: Ticket,
        variant: Variant,
        error: LaunchError,
    },
    TimedOut {
        ticket: Ticket,
        variant: Variant,
    },
    Abandoned {
        ticket: Ticket,
        variant: Variant,
    },
}

impl ExchangeOutcome {
    pub fn ticket(&self) -> Ticket {
        match self {
            Self::Resolved { ticket, .. }
            | Self::LaunchFailed { ticket, .. }
            | Self::TimedOut { ticket, .. }
            | Self::Abandoned { ticket, .. } => *ticket,
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            Self::Resolved { response, .. } => response.variant(),
            Self::LaunchFailed { variant, .. }
            | Self::TimedOut { variant, .. }
            | Self::Abandoned { variant, .. } => *variant,
        }
    }

    /// State the exchange ended in
    ///
    /// A failed launch never reached the host, so it counts as abandoned.
    pub fn state(&self) -> ExchangeState {
        match self {
            Self::Resolved { .. } => ExchangeState::Resolved,
            Self::TimedOut { .. } => ExchangeState::TimedOut,
            Self::LaunchFailed { .. } | Self::Abandoned { .. } => ExchangeState::Abandoned,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Resolved { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// Receives terminal outcomes
///
/// Implemented for any `FnMut(ExchangeOutcome) + Send` closure.
pub trait ExchangeListener: Send {
    fn on_outcome(&mut self, outcome: ExchangeOutcome);
}

impl<F> ExchangeListener for F
where
    F: FnMut(ExchangeOutcome) + Send,
{
    fn on_outcome(&mut self, outcome: ExchangeOutcome) {
        self(outcome)
    }
}

/// What happened to a response handed to [`ExchangeTracker::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Matched and passed to the listener
    Delivered(Ticket),
    /// Matched while no listener was registered; held until one is
    Buffered(Ticket),
    /// No pending exchange matched
    Dropped,
}

/// Number of finished exchanges whose terminal state stays queryable
pub const FINISHED_HISTORY: usize = 1024;

/// Correlates outgoing requests with the responses the host sends back
///
/// Not thread-safe: every call must happen on the one task that owns the
/// tracker.
pub struct ExchangeTracker<S: PendingStore = MemoryStore> {
    store: S,
    clock: Arc<dyn Clock>,
    policy: ExchangePolicy,
    pending: Vec<PendingRecord>,
    finished: BTreeMap<u64, ExchangeState>,
    next_exchange_id: u64,
    listener: Option<Box<dyn ExchangeListener>>,
    buffered: VecDeque<ExchangeOutcome>,
    recovered: Vec<PendingRecord>,
}

impl<S: PendingStore> ExchangeTracker<S> {
    /// Load persisted records and abandon those past the grace window
    pub fn open(store: S, policy: ExchangePolicy) -> Result<Self, StoreError> {
        Self::with_clock(store, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: S,
        policy: ExchangePolicy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let pending = store.load()?;
        let next_exchange_id = pending
            .iter()
            .map(|record| record.exchange_id)
            .max()
            .map_or(1, |id| id + 1);

        let mut tracker = Self {
            store,
            clock,
            policy,
            pending,
            finished: BTreeMap::new(),
            next_exchange_id,
            listener: None,
            buffered: VecDeque::new(),
            recovered: Vec::new(),
        };
        tracker.recovered = tracker.recover()?;
        Ok(tracker)
    }

    /// Abandon persisted records older than the grace window
    ///
    /// Returns the abandoned records; retrying them is up to the caller.
    pub fn recover(&mut self) -> Result<Vec<PendingRecord>, StoreError> {
        let now = self.clock.now_ms();
        let grace = millis(self.policy.grace_window);
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .pending
            .iter()
            .cloned()
            .partition(|record| now.saturating_sub(record.issued_at_ms) > grace);

        if expired.is_empty() {
            return Ok(expired);
        }

        self.commit(kept)?;
        for record in &expired {
            tracing::info!(
                exchange_id = record.exchange_id,
                variant = %record.variant,
                correlation_id = %record.correlation_id,
                age_ms = now.saturating_sub(record.issued_at_ms),
                "abandoned pending exchange past grace window"
            );
            self.finish(ExchangeOutcome::Abandoned {
                ticket: Ticket(record.exchange_id),
                variant: record.variant,
            });
        }
        Ok(expired)
    }

    /// Records abandoned when the tracker was opened
    pub fn recovered(&self) -> &[PendingRecord] {
        &self.recovered
    }

    pub fn pending(&self) -> &[PendingRecord] {
        &self.pending
    }

    pub fn policy(&self) -> &ExchangePolicy {
        &self.policy
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Register the listener, replacing any previous one
    ///
    /// Responses buffered while no listener was registered are delivered
    /// immediately.
    pub fn set_listener(&mut self, listener: impl ExchangeListener + 'static) {
        if self.listener.is_some() {
            tracing::debug!("replacing exchange listener");
        }
        let mut listener: Box<dyn ExchangeListener> = Box::new(listener);
        while let Some(outcome) = self.buffered.pop_front() {
            tracing::debug!(
                exchange_id = outcome.ticket().id(),
                variant = %outcome.variant(),
                "delivering buffered outcome"
            );
            listener.on_outcome(outcome);
        }
        self.listener = Some(listener);
    }

    /// Deregister the listener, abandoning every pending exchange
    ///
    /// The outgoing listener receives the `Abandoned` outcomes.
    pub fn clear_listener(&mut self) -> Result<(), StoreError> {
        let abandoned = std::mem::take(&mut self.pending);
        if let Err(e) = self.store.save(&[]) {
            self.pending = abandoned;
            return Err(e);
        }

        for record in abandoned {
            let ticket = Ticket(record.exchange_id);
            self.finish(ExchangeOutcome::Abandoned {
                ticket,
                variant: record.variant,
            });
        }
        self.listener = None;
        Ok(())
    }

    /// Current state of an exchange
    ///
    /// Only the last [`FINISHED_HISTORY`] finished exchanges are remembered;
    /// older tickets report `Idle`.
    pub fn state(&self, ticket: Ticket) -> ExchangeState {
        if let Some(record) = self.find(ticket) {
            return match record.state {
                PendingState::Issued => ExchangeState::Issued,
                PendingState::AwaitingResponse => ExchangeState::AwaitingResponse,
            };
        }
        self.finished
            .get(&ticket.0)
            .copied()
            .unwrap_or(ExchangeState::Idle)
    }

    /// Persist a new exchange
    ///
    /// An exchange already pending for the same correlation id and variant is
    /// superseded and reported as abandoned.
    pub fn issue(
        &mut self,
        correlation_id: &CorrelationId,
        variant: Variant,
    ) -> Result<Ticket, StoreError> {
        let ticket = Ticket(self.next_exchange_id);
        let (superseded, mut records): (Vec<_>, Vec<_>) = self
            .pending
            .iter()
            .cloned()
            .partition(|record| record.matches(correlation_id, variant));

        records.push(PendingRecord {
            exchange_id: ticket.0,
            correlation_id: correlation_id.clone(),
            variant,
            issued_at_ms: self.clock.now_ms(),
            state: PendingState::Issued,
        });
        self.commit(records)?;
        self.next_exchange_id += 1;

        for record in superseded {
            tracing::warn!(
                exchange_id = record.exchange_id,
                superseded_by = ticket.0,
                variant = %variant,
                correlation_id = %correlation_id,
                "pending exchange superseded"
            );
            self.finish(ExchangeOutcome::Abandoned {
                ticket: Ticket(record.exchange_id),
                variant,
            });
        }

        tracing::debug!(
            exchange_id = ticket.0,
            variant = %variant,
            correlation_id = %correlation_id,
            "exchange issued"
        );
        Ok(ticket)
    }

    /// Record that the launch call returned and control is with the host
    pub fn mark_awaiting(&mut self, ticket: Ticket) -> Result<(), StoreError> {
        let mut records = self.pending.clone();
        let Some(record) = records
            .iter_mut()
            .find(|record| record.exchange_id == ticket.0)
        else {
            return Ok(());
        };
        if record.state == PendingState::AwaitingResponse {
            return Ok(());
        }

        record.state = PendingState::AwaitingResponse;
        self.commit(records)?;
        tracing::debug!(exchange_id = ticket.0, "awaiting host response");
        Ok(())
    }

    /// Close an exchange whose launch failed
    pub fn fail_launch(&mut self, ticket: Ticket, error: LaunchError) -> Result<(), StoreError> {
        let Some(record) = self.remove(ticket)? else {
            return Ok(());
        };
        tracing::debug!(exchange_id = ticket.0, %error, "host launch failed");
        self.finish(ExchangeOutcome::LaunchFailed {
            ticket,
            variant: record.variant,
            error,
        });
        Ok(())
    }

    /// Match a decoded response against the pending exchanges
    ///
    /// Responses without a pending exchange are dropped silently: the host may
    /// still answer a request that was cancelled or abandoned.
    pub fn resolve(&mut self, response: Response) -> Result<Resolution, StoreError> {
        let variant = response.variant();
        let position = self
            .pending
            .iter()
            .position(|record| record.matches(response.correlation_id(), variant));

        let Some(position) = position else {
            if self.pending.iter().any(|record| record.variant == variant) {
                tracing::warn!(
                    variant = %variant,
                    correlation_id = %response.correlation_id(),
                    "correlation id mismatch, dropping response"
                );
            } else {
                tracing::debug!(
                    variant = %variant,
                    correlation_id = %response.correlation_id(),
                    "no pending exchange, dropping response"
                );
            }
            return Ok(Resolution::Dropped);
        };

        let mut records = self.pending.clone();
        let record = records.remove(position);
        self.commit(records)?;

        let ticket = Ticket(record.exchange_id);
        self.remember(ticket, ExchangeState::Resolved);
        tracing::debug!(
            exchange_id = ticket.0,
            variant = %variant,
            error_code = ?response.error_code(),
            "exchange resolved"
        );

        let outcome = ExchangeOutcome::Resolved { ticket, response };
        match self.listener.as_mut() {
            Some(listener) => {
                listener.on_outcome(outcome);
                Ok(Resolution::Delivered(ticket))
            }
            None => {
                self.buffered.push_back(outcome);
                Ok(Resolution::Buffered(ticket))
            }
        }
    }

    /// Cancel an exchange, reporting `TimedOut`
    ///
    /// Returns `false` when the exchange was no longer pending. A response
    /// arriving afterwards is dropped.
    pub fn cancel(&mut self, ticket: Ticket) -> Result<bool, StoreError> {
        let Some(record) = self.remove(ticket)? else {
            return Ok(false);
        };
        tracing::debug!(exchange_id = ticket.0, variant = %record.variant, "exchange cancelled");
        self.finish(ExchangeOutcome::TimedOut {
            ticket,
            variant: record.variant,
        });
        Ok(true)
    }

    /// Time out every exchange older than the response deadline
    pub fn expire_overdue(&mut self) -> Result<Vec<Ticket>, StoreError> {
        let Some(deadline) = self.policy.response_deadline else {
            return Ok(Vec::new());
        };

        let now = self.clock.now_ms();
        let deadline = millis(deadline);
        let (overdue, kept): (Vec<_>, Vec<_>) = self
            .pending
            .iter()
            .cloned()
            .partition(|record| now.saturating_sub(record.issued_at_ms) >= deadline);

        if overdue.is_empty() {
            return Ok(Vec::new());
        }
        self.commit(kept)?;

        let mut tickets = Vec::with_capacity(overdue.len());
        for record in overdue {
            let ticket = Ticket(record.exchange_id);
            tracing::debug!(exchange_id = ticket.0, variant = %record.variant, "exchange timed out");
            self.finish(ExchangeOutcome::TimedOut {
                ticket,
                variant: record.variant,
            });
            tickets.push(ticket);
        }
        Ok(tickets)
    }

    fn find(&self, ticket: Ticket) -> Option<&PendingRecord> {
        self.pending
            .iter()
            .find(|record| record.exchange_id == ticket.0)
    }

    fn remove(&mut self, ticket: Ticket) -> Result<Option<PendingRecord>, StoreError> {
        let Some(position) = self
            .pending
            .iter()
            .position(|record| record.exchange_id == ticket.0)
        else {
            return Ok(None);
        };
        let mut records = self.pending.clone();
        let record = records.remove(position);
        self.commit(records)?;
        Ok(Some(record))
    }

    /// Save first, then adopt: memory never runs ahead of the store
    fn commit(&mut self, records: Vec<PendingRecord>) -> Result<(), StoreError> {
        self.store.save(&records)?;
        self.pending = records;
        Ok(())
    }

    fn remember(&mut self, ticket: Ticket, state: ExchangeState) {
        self.finished.insert(ticket.0, state);
        while self.finished.len() > FINISHED_HISTORY {
            self.finished.pop_first();
        }
    }

    fn finish(&mut self, outcome: ExchangeOutcome) {
        let ticket = outcome.ticket();
        self.remember(ticket, outcome.state());
        match self.listener.as_mut() {
            Some(listener) => listener.on_outcome(outcome),
            None => tracing::debug!(
                exchange_id = ticket.0,
                state = ?outcome.state(),
                "no listener registered, outcome not delivered"
            ),
        }
    }
}

impl<S: PendingStore> fmt::Debug for ExchangeTracker<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeTracker")
            .field("policy", &self.policy)
            .field("pending", &self.pending)
            .field("has_listener", &self.listener.is_some())
            .field("buffered", &self.buffered.len())
            .finish()
    }
}
