//! hostbridge - typed request/response protocol between a client app and a host app
//!
//! The client and the host live in separate processes and talk only by
//! launching each other with an encoded payload attached (URL-scheme launch
//! and callback). This crate provides the parts of that conversation that
//! are worth getting right:
//!
//! - a payload model where every request and response variant validates its
//!   field ceilings at construction
//! - a [`Codec`] that turns messages into opaque transport payloads and back
//! - an [`ExchangeTracker`] that persists outstanding requests so a response
//!   can still be matched after the client process was evicted
//! - a [`Dispatcher`] that the platform integration calls to submit requests
//!   and deliver inbound payloads
//!
//! Launching the host and receiving payloads stay outside the crate, behind
//! the [`HostLauncher`] trait and [`Dispatcher::deliver_inbound_payload`].
//!
//! # Example
//!
//! ```rust,ignore
//! use hostbridge::{
//!     AuthRequest, BridgeConfig, CorrelationId, Dispatcher, ExchangeOutcome, Request,
//! };
//!
//! fn sign_in(launcher: impl hostbridge::HostLauncher) -> hostbridge::Result<()> {
//!     let config = BridgeConfig::load("hostbridge.toml")?;
//!     let mut dispatcher = Dispatcher::from_config(&config, launcher)?;
//!     dispatcher.start()?;
//!
//!     let request = Request::new(
//!         CorrelationId::new("o-user")?,
//!         AuthRequest::new("snsapi_userinfo", "nonce-1")?,
//!     )?;
//!     dispatcher.submit_with(request, |outcome: ExchangeOutcome| {
//!         if let Some(response) = outcome.response() {
//!             println!("auth finished: {:?}", response.body());
//!         }
//!     })?;
//!     Ok(())
//! }
//! ```
//!
//! # Exchange lifecycle
//!
//! Every submitted request moves through
//! `Idle -> Issued -> AwaitingResponse` and ends in exactly one of
//! `Resolved`, `TimedOut` or `Abandoned`. Responses that arrive for an
//! exchange the tracker no longer knows are dropped without error.

mod codec;
mod config;
mod dispatch;
mod error;
mod exchange;
mod model;

pub use codec::{
    AttachmentStore, Codec, CodecLimits, MemoryAttachments, PROTOCOL_VERSION, TransportPayload,
};
pub use config::{BridgeConfig, BridgeConfigBuilder};
pub use dispatch::{
    Dispatcher, HostLauncher, InboundDisposition, InboundRequestHandler, Registration,
    SupportedContent,
};
pub use error::{
    DecodingError, EncodingError, Error, LaunchError, Result, StoreError, ValidationError,
};
pub use exchange::{
    Clock, ExchangeListener, ExchangeOutcome, ExchangePolicy, ExchangeState, ExchangeTracker,
    FINISHED_HISTORY, FileStore, ManualClock, MemoryStore, PendingRecord, PendingState,
    PendingStore, Resolution, SystemClock, Ticket,
};
pub use model::*;
