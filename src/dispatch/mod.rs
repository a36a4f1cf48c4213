//! Dispatch facade
//!
//! [`Dispatcher`] is the one entry point the platform integration talks to.
//! Outbound, it encodes and persists a request before handing it to the
//! [`HostLauncher`]. Inbound, it decodes whatever payload the host attached
//! when it brought this app back to the foreground and routes it: host
//! requests go to the [`InboundRequestHandler`], responses to the exchange
//! tracker.
//!
//! # Example
//!
//! ```rust,ignore
//! use hostbridge::{AuthRequest, BridgeConfig, CorrelationId, Dispatcher, Request};
//!
//! let config = BridgeConfig::builder("wx1234").build()?;
//! let mut dispatcher = Dispatcher::from_config(&config, launcher)?;
//! dispatcher.start()?;
//!
//! let request = Request::new(
//!     CorrelationId::new("o-user")?,
//!     AuthRequest::new("snsapi_userinfo", "nonce-1")?,
//! )?;
//! dispatcher.submit_with(request, |outcome| println!("{outcome:?}"))?;
//!
//! // later, when the host re-launches the app:
//! dispatcher.deliver_inbound_payload(&payload)?;
//! ```

mod registration;

use crate::codec::{Codec, TransportPayload};
use crate::config::BridgeConfig;
use crate::error::{Error, LaunchError, Result};
use crate::exchange::{
    ExchangeListener, ExchangeTracker, MemoryStore, PendingStore, Resolution, Ticket,
};
use crate::model::{Message, Origin, Request, Response, Variant};

pub use registration::{Registration, SupportedContent};

/// Outbound side of the platform integration
pub trait HostLauncher {
    /// Called once by [`Dispatcher::start`]
    fn register(&mut self, registration: &Registration) -> Result<(), LaunchError> {
        let _ = registration;
        Ok(())
    }

    /// Bring the host app to the foreground with `payload`
    ///
    /// Returns once control has been handed to the OS; there is no
    /// acknowledgement from the host.
    fn launch(&mut self, payload: TransportPayload) -> Result<(), LaunchError>;
}

/// Receives requests the host sends to this app
///
/// The handler answers later through [`Dispatcher::send_response`].
pub trait InboundRequestHandler: Send {
    fn on_request(&mut self, request: Request);
}

impl<F> InboundRequestHandler for F
where
    F: FnMut(Request) + Send,
{
    fn on_request(&mut self, request: Request) {
        self(request)
    }
}

/// What [`Dispatcher::deliver_inbound_payload`] did with a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundDisposition {
    /// A host request was passed to the request handler
    RequestDispatched(Variant),
    /// A host request arrived with no request handler registered
    RequestUnhandled(Variant),
    /// A response resolved a pending exchange
    Resolved(Ticket),
    /// A response resolved a pending exchange; waiting for a listener
    Buffered(Ticket),
    /// A response matched nothing and was discarded
    Dropped,
}

/// Single entry point for submitting requests and delivering inbound payloads
pub struct Dispatcher<L: HostLauncher, S: PendingStore = MemoryStore> {
    codec: Codec,
    tracker: ExchangeTracker<S>,
    launcher: L,
    registration: Registration,
    request_handler: Option<Box<dyn InboundRequestHandler>>,
    started: bool,
}

impl<L: HostLauncher> Dispatcher<L, Box<dyn PendingStore>> {
    /// Build a dispatcher from configuration
    ///
    /// Uses a [`FileStore`](crate::FileStore) when `store_path` is set and
    /// an in-memory store otherwise.
    pub fn from_config(config: &BridgeConfig, launcher: L) -> Result<Self> {
        let tracker = ExchangeTracker::open(config.open_store(), *config.policy())?;
        Ok(Self::with_parts(
            config.codec(),
            tracker,
            launcher,
            config.registration()?,
        ))
    }
}

impl<L: HostLauncher, S: PendingStore> Dispatcher<L, S> {
    pub fn with_parts(
        codec: Codec,
        tracker: ExchangeTracker<S>,
        launcher: L,
        registration: Registration,
    ) -> Self {
        Self {
            codec,
            tracker,
            launcher,
            registration,
            request_handler: None,
            started: false,
        }
    }

    /// Hand the registration to the launcher; later calls are no-ops
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        self.launcher.register(&self.registration)?;
        self.started = true;
        tracing::info!(
            app_id = self.registration.app_id(),
            supported_content = ?self.registration.supported_content(),
            "dispatcher started"
        );
        Ok(())
    }

    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    pub fn tracker(&self) -> &ExchangeTracker<S> {
        &self.tracker
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    pub fn launcher_mut(&mut self) -> &mut L {
        &mut self.launcher
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    /// Replace the exchange listener
    pub fn set_listener(&mut self, listener: impl ExchangeListener + 'static) {
        self.tracker.set_listener(listener);
    }

    /// Remove the exchange listener, abandoning pending exchanges
    pub fn clear_listener(&mut self) -> Result<()> {
        self.tracker.clear_listener()?;
        Ok(())
    }

    /// Replace the handler for host-originated requests
    pub fn set_request_handler(&mut self, handler: impl InboundRequestHandler + 'static) {
        self.request_handler = Some(Box::new(handler));
    }

    pub fn clear_request_handler(&mut self) {
        self.request_handler = None;
    }

    /// Send a request to the host
    ///
    /// The request is validated and encoded, then persisted, then launched.
    /// A failed launch is returned here and also reported to the listener.
    pub fn submit(&mut self, request: Request) -> Result<Ticket> {
        let variant = request.variant();
        if variant.origin() != Origin::Client {
            tracing::warn!(variant = %variant, "refusing to submit a host-originated request");
            return Err(Error::Misdirected { variant });
        }

        let correlation_id = request.correlation_id().clone();
        let payload = self.codec.encode(&Message::Request(request))?;
        let ticket = self.tracker.issue(&correlation_id, variant)?;

        match self.launcher.launch(payload) {
            Ok(()) => {
                self.tracker.mark_awaiting(ticket)?;
                Ok(ticket)
            }
            Err(error) => {
                self.tracker.fail_launch(ticket, error.clone())?;
                Err(error.into())
            }
        }
    }

    /// Register `listener` and submit `request`
    pub fn submit_with(
        &mut self,
        request: Request,
        listener: impl ExchangeListener + 'static,
    ) -> Result<Ticket> {
        self.set_listener(listener);
        self.submit(request)
    }

    /// Answer a host-originated request; opens no exchange
    pub fn send_response(&mut self, response: Response) -> Result<()> {
        let variant = response.variant();
        if variant.origin() != Origin::Host {
            tracing::warn!(variant = %variant, "refusing to answer a client-originated variant");
            return Err(Error::Misdirected { variant });
        }

        let correlation_id = response.correlation_id().clone();
        let payload = self.codec.encode(&Message::Response(response))?;
        self.launcher.launch(payload)?;
        tracing::debug!(
            variant = %variant,
            correlation_id = %correlation_id,
            "response sent to host"
        );
        Ok(())
    }

    /// Cancel a pending exchange, reporting it as timed out
    pub fn cancel(&mut self, ticket: Ticket) -> Result<bool> {
        Ok(self.tracker.cancel(ticket)?)
    }

    /// Time out exchanges past the configured response deadline
    pub fn expire_overdue(&mut self) -> Result<Vec<Ticket>> {
        Ok(self.tracker.expire_overdue()?)
    }

    /// Decode and route a payload the host delivered
    ///
    /// Must run on the task that owns the dispatcher.
    pub fn deliver_inbound_payload(&mut self, raw: &[u8]) -> Result<InboundDisposition> {
        match self.codec.decode(raw)? {
            Message::Request(request) => self.route_request(request),
            Message::Response(response) => self.route_response(response),
        }
    }

    fn route_request(&mut self, request: Request) -> Result<InboundDisposition> {
        let variant = request.variant();
        if variant.origin() != Origin::Host {
            tracing::warn!(
                variant = %variant,
                correlation_id = %request.correlation_id(),
                "dropping inbound request of a client-originated variant"
            );
            return Err(Error::Misdirected { variant });
        }

        match self.request_handler.as_mut() {
            Some(handler) => {
                tracing::debug!(
                    variant = %variant,
                    correlation_id = %request.correlation_id(),
                    "dispatching host request"
                );
                handler.on_request(request);
                Ok(InboundDisposition::RequestDispatched(variant))
            }
            None => {
                tracing::warn!(variant = %variant, "no request handler registered");
                Ok(InboundDisposition::RequestUnhandled(variant))
            }
        }
    }

    fn route_response(&mut self, response: Response) -> Result<InboundDisposition> {
        let variant = response.variant();
        if variant.origin() != Origin::Client {
            tracing::warn!(
                variant = %variant,
                correlation_id = %response.correlation_id(),
                "dropping inbound response of a host-originated variant"
            );
            return Err(Error::Misdirected { variant });
        }

        let disposition = match self.tracker.resolve(response)? {
            Resolution::Delivered(ticket) => InboundDisposition::Resolved(ticket),
            Resolution::Buffered(ticket) => InboundDisposition::Buffered(ticket),
            Resolution::Dropped => InboundDisposition::Dropped,
        };
        Ok(disposition)
    }
}

impl<L: HostLauncher, S: PendingStore> std::fmt::Debug for Dispatcher<L, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("codec", &self.codec)
            .field("tracker", &self.tracker)
            .field("registration", &self.registration)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::codec::CodecLimits;
    use crate::exchange::{ExchangeOutcome, ExchangePolicy, ExchangeState};
    use crate::model::*;

    #[derive(Default)]
    struct RecordingLauncher {
        registrations: usize,
        payloads: Vec<TransportPayload>,
        fail_with: Option<LaunchError>,
    }

    impl HostLauncher for RecordingLauncher {
        fn register(&mut self, _registration: &Registration) -> Result<(), LaunchError> {
            self.registrations += 1;
            Ok(())
        }

        fn launch(&mut self, payload: TransportPayload) -> Result<(), LaunchError> {
            if let Some(error) = &self.fail_with {
                return Err(error.clone());
            }
            self.payloads.push(payload);
            Ok(())
        }
    }

    fn dispatcher() -> Dispatcher<RecordingLauncher> {
        let tracker = ExchangeTracker::open(MemoryStore::new(), ExchangePolicy::default()).unwrap();
        Dispatcher::with_parts(
            Codec::new(CodecLimits::default()),
            tracker,
            RecordingLauncher::default(),
            Registration::new("wx123", SupportedContent::TEXT).unwrap(),
        )
    }

    fn id() -> CorrelationId {
        CorrelationId::new("o-user").unwrap()
    }

    fn encode(message: impl Into<Message>) -> Vec<u8> {
        Codec::default()
            .encode(&message.into())
            .unwrap()
            .into_bytes()
    }

    #[test]
    fn test_start_registers_once() {
        let mut dispatcher = dispatcher();
        dispatcher.start().unwrap();
        dispatcher.start().unwrap();
        assert_eq!(dispatcher.launcher().registrations, 1);
    }

    #[test]
    fn test_submit_launches_and_awaits() {
        let mut dispatcher = dispatcher();
        let request = Request::new(id(), AuthRequest::new("snsapi_userinfo", "n").unwrap()).unwrap();

        let ticket = dispatcher.submit(request.clone()).unwrap();

        assert_eq!(dispatcher.launcher().payloads.len(), 1);
        assert_eq!(
            dispatcher.tracker().state(ticket),
            ExchangeState::AwaitingResponse
        );
        let sent = dispatcher
            .codec()
            .decode(dispatcher.launcher().payloads[0].as_bytes())
            .unwrap();
        assert_eq!(sent, Message::Request(request));
    }

    #[test]
    fn test_launch_failure_is_reported_twice() {
        let mut dispatcher = dispatcher();
        dispatcher.launcher_mut().fail_with = Some(LaunchError::HostNotInstalled);

        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let sink = outcomes.clone();
        let request = Request::new(id(), AuthRequest::new("s", "n").unwrap()).unwrap();
        let err = dispatcher
            .submit_with(request, move |outcome: ExchangeOutcome| {
                sink.lock().unwrap().push(outcome)
            })
            .unwrap_err();

        assert!(matches!(
            err,
            Error::LaunchFailure(LaunchError::HostNotInstalled)
        ));
        assert!(dispatcher.tracker().pending().is_empty());
        assert!(matches!(
            outcomes.lock().unwrap()[0],
            ExchangeOutcome::LaunchFailed { .. }
        ));
    }

    #[test]
    fn test_host_variants_cannot_be_submitted() {
        let mut dispatcher = dispatcher();
        let request = Request::new(id(), GetMessageRequest::new(Locale::default())).unwrap();
        assert!(matches!(
            dispatcher.submit(request),
            Err(Error::Misdirected {
                variant: Variant::GetMessage
            })
        ));
        assert!(dispatcher.launcher().payloads.is_empty());
    }

    #[test]
    fn test_inbound_request_reaches_handler() {
        let mut dispatcher = dispatcher();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        dispatcher.set_request_handler(move |request: Request| sink.lock().unwrap().push(request));

        let request = Request::new(id(), GetMessageRequest::new(Locale::default())).unwrap();
        let disposition = dispatcher
            .deliver_inbound_payload(&encode(request.clone()))
            .unwrap();

        assert_eq!(
            disposition,
            InboundDisposition::RequestDispatched(Variant::GetMessage)
        );
        assert_eq!(*received.lock().unwrap(), vec![request]);
    }

    #[test]
    fn test_inbound_request_without_handler() {
        let mut dispatcher = dispatcher();
        let request = Request::new(id(), LaunchFromHostRequest::new(None, Locale::default())).unwrap();
        assert_eq!(
            dispatcher.deliver_inbound_payload(&encode(request)).unwrap(),
            InboundDisposition::RequestUnhandled(Variant::LaunchFromHost)
        );
    }

    #[test]
    fn test_send_response_opens_no_exchange() {
        let mut dispatcher = dispatcher();
        let response = Response::success(
            id(),
            GetMessageResponse::new(Some(MessageContent::from_parts(Some("hi".into()), None).unwrap()))
                .unwrap(),
        )
        .unwrap();

        dispatcher.send_response(response).unwrap();
        assert_eq!(dispatcher.launcher().payloads.len(), 1);
        assert!(dispatcher.tracker().pending().is_empty());
    }

    #[test]
    fn test_send_response_rejects_client_variants() {
        let mut dispatcher = dispatcher();
        let response =
            Response::failure(id(), Variant::Auth, ErrorCode::AuthDenied, "denied").unwrap();
        assert!(matches!(
            dispatcher.send_response(response),
            Err(Error::Misdirected { .. })
        ));
    }

    #[test]
    fn test_unmatched_response_is_dropped() {
        let mut dispatcher = dispatcher();
        let response = Response::failure(id(), Variant::OpenWebview, ErrorCode::CommonError, "")
            .unwrap();
        assert_eq!(
            dispatcher.deliver_inbound_payload(&encode(response)).unwrap(),
            InboundDisposition::Dropped
        );
    }
}
