//! End-to-end exchanges against a simulated host.
//!
//! The host side only sees transport payloads: it decodes what the client
//! launched it with and encodes its answer, the way a real host app would.

use std::sync::{Arc, Mutex};

use hostbridge::{
    AuthRequest, AuthResponse, BridgeConfig, Codec, CorrelationId, Dispatcher, Error,
    ExchangeOutcome, ExchangePolicy, ExchangeState, ExchangeTracker, HostLauncher,
    InboundDisposition, LaunchError, Locale, MediaMessage, MemoryStore, Message, Registration,
    Request, RequestBody, Response, ResponseBody, Scene, SendMessageRequest, SupportedContent,
    TextObject, TransportPayload, ValidationError, Variant, limits,
};

/// Launcher that hands every payload to the simulated host's inbox
#[derive(Clone, Default)]
struct SimulatedHost {
    inbox: Arc<Mutex<Vec<TransportPayload>>>,
}

impl SimulatedHost {
    fn take(&self) -> Vec<TransportPayload> {
        std::mem::take(&mut *self.inbox.lock().unwrap())
    }

    fn launches(&self) -> usize {
        self.inbox.lock().unwrap().len()
    }
}

impl HostLauncher for SimulatedHost {
    fn launch(&mut self, payload: TransportPayload) -> Result<(), LaunchError> {
        self.inbox.lock().unwrap().push(payload);
        Ok(())
    }
}

type Outcomes = Arc<Mutex<Vec<ExchangeOutcome>>>;

fn dispatcher(host: &SimulatedHost) -> (Dispatcher<SimulatedHost>, Outcomes) {
    let tracker = ExchangeTracker::open(MemoryStore::new(), ExchangePolicy::default()).unwrap();
    let mut dispatcher = Dispatcher::with_parts(
        Codec::default(),
        tracker,
        host.clone(),
        Registration::new("wx-test", SupportedContent::TEXT).unwrap(),
    );
    dispatcher.start().unwrap();

    let outcomes = Outcomes::default();
    let sink = outcomes.clone();
    dispatcher.set_listener(move |outcome: ExchangeOutcome| sink.lock().unwrap().push(outcome));
    (dispatcher, outcomes)
}

fn auth_request(correlation_id: &str) -> Request {
    Request::new(
        CorrelationId::new(correlation_id).unwrap(),
        AuthRequest::new("snsapi_userinfo", "nonce-1").unwrap(),
    )
    .unwrap()
}

/// Decode what the client sent and answer an Auth request with `code`
fn host_answers_auth(host: &SimulatedHost, code: &str) -> Vec<u8> {
    let codec = Codec::default();
    let payloads = host.take();
    assert_eq!(payloads.len(), 1);

    let Message::Request(request) = codec.decode(payloads[0].as_bytes()).unwrap() else {
        panic!("host expected a request");
    };
    let RequestBody::Auth(auth) = request.body() else {
        panic!("host expected an auth request");
    };

    let response = Response::success(
        request.correlation_id().clone(),
        AuthResponse::new(
            Some(code.to_string()),
            Some(auth.state().to_string()),
            Locale::new("en", "US").unwrap(),
        )
        .unwrap(),
    )
    .unwrap();
    codec.encode(&response.into()).unwrap().into_bytes()
}

#[test]
fn auth_exchange_resolves_with_code() {
    let host = SimulatedHost::default();
    let (mut dispatcher, outcomes) = dispatcher(&host);

    let ticket = dispatcher.submit(auth_request("o-user-1")).unwrap();
    assert_eq!(
        dispatcher.tracker().state(ticket),
        ExchangeState::AwaitingResponse
    );

    let reply = host_answers_auth(&host, "abc");
    assert_eq!(
        dispatcher.deliver_inbound_payload(&reply).unwrap(),
        InboundDisposition::Resolved(ticket)
    );

    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    let response = outcomes[0].response().unwrap();
    let ResponseBody::Auth(auth) = response.body() else {
        panic!("expected an auth response");
    };
    assert_eq!(auth.code(), Some("abc"));
    assert_eq!(auth.state(), Some("nonce-1"));
    assert_eq!(response.correlation_id().as_str(), "o-user-1");
}

#[test]
fn second_matching_response_is_a_no_op() {
    let host = SimulatedHost::default();
    let (mut dispatcher, outcomes) = dispatcher(&host);

    dispatcher.submit(auth_request("o-user-1")).unwrap();
    let reply = host_answers_auth(&host, "abc");

    dispatcher.deliver_inbound_payload(&reply).unwrap();
    assert_eq!(
        dispatcher.deliver_inbound_payload(&reply).unwrap(),
        InboundDisposition::Dropped
    );
    assert!(dispatcher.tracker().pending().is_empty());
    assert_eq!(outcomes.lock().unwrap().len(), 1);
}

#[test]
fn response_without_pending_exchange_is_dropped() {
    let host = SimulatedHost::default();
    let (mut dispatcher, outcomes) = dispatcher(&host);

    let stray = Response::success(
        CorrelationId::new("o-user-1").unwrap(),
        AuthResponse::new(Some("abc".into()), None, Locale::default()).unwrap(),
    )
    .unwrap();
    let payload = Codec::default().encode(&stray.into()).unwrap();

    assert_eq!(
        dispatcher.deliver_inbound_payload(payload.as_bytes()).unwrap(),
        InboundDisposition::Dropped
    );
    assert!(outcomes.lock().unwrap().is_empty());
}

#[test]
fn response_for_another_account_is_dropped() {
    let host = SimulatedHost::default();
    let (mut dispatcher, outcomes) = dispatcher(&host);

    dispatcher.submit(auth_request("o-user-1")).unwrap();
    host.take();

    let foreign = Response::success(
        CorrelationId::new("o-user-2").unwrap(),
        AuthResponse::new(Some("abc".into()), None, Locale::default()).unwrap(),
    )
    .unwrap();
    let payload = Codec::default().encode(&foreign.into()).unwrap();

    assert_eq!(
        dispatcher.deliver_inbound_payload(payload.as_bytes()).unwrap(),
        InboundDisposition::Dropped
    );
    assert_eq!(dispatcher.tracker().pending().len(), 1);
    assert!(outcomes.lock().unwrap().is_empty());
}

#[test]
fn unknown_variant_tag_is_reported_not_fatal() {
    let host = SimulatedHost::default();
    let (mut dispatcher, _) = dispatcher(&host);

    let mut payload = vec![hostbridge::PROTOCOL_VERSION, 1, 13];
    payload.extend_from_slice(b"future_launch");
    payload.push(0x80);

    let err = dispatcher.deliver_inbound_payload(&payload).unwrap_err();
    assert!(matches!(err, Error::UnsupportedVariant(tag) if tag == "future_launch"));
}

#[test]
fn specified_target_without_target_fails_before_launch() {
    let host = SimulatedHost::default();
    let (_dispatcher, outcomes) = dispatcher(&host);

    let err = SendMessageRequest::builder()
        .text("hello")
        .scene(Scene::SpecifiedTarget)
        .build()
        .unwrap_err();

    assert_eq!(err, ValidationError::Missing { field: "target" });
    assert_eq!(host.launches(), 0);
    assert!(outcomes.lock().unwrap().is_empty());
}

#[test]
fn send_message_needs_exactly_one_content() {
    let media = MediaMessage::builder()
        .title("hello")
        .object(TextObject::new("hello").unwrap())
        .build()
        .unwrap();

    let both = SendMessageRequest::builder()
        .text("hello")
        .media(media)
        .build()
        .unwrap_err();
    let neither = SendMessageRequest::builder().build().unwrap_err();

    assert!(matches!(both, ValidationError::NotExactlyOne { .. }));
    assert!(matches!(neither, ValidationError::NotExactlyOne { .. }));
}

#[test]
fn string_ceilings_are_inclusive() {
    assert!(AuthRequest::new("s".repeat(limits::AUTH_SCOPE), "n").is_ok());
    let err = AuthRequest::new("s".repeat(limits::AUTH_SCOPE + 1), "n").unwrap_err();
    assert_eq!(
        err,
        ValidationError::TooLong {
            field: "scope",
            limit: limits::AUTH_SCOPE,
            actual: limits::AUTH_SCOPE + 1,
        }
    );

    let at_limit = MediaMessage::builder()
        .title("t".repeat(limits::TITLE))
        .object(TextObject::new("x").unwrap())
        .build();
    assert!(at_limit.is_ok());

    let over = MediaMessage::builder()
        .title("t".repeat(limits::TITLE + 1))
        .object(TextObject::new("x").unwrap())
        .build()
        .unwrap_err();
    assert_eq!(over.field(), "media.title");
}

#[test]
fn cancelled_exchange_ignores_late_response() {
    let host = SimulatedHost::default();
    let (mut dispatcher, outcomes) = dispatcher(&host);

    let ticket = dispatcher.submit(auth_request("o-user-1")).unwrap();
    let reply = host_answers_auth(&host, "late");

    assert!(dispatcher.cancel(ticket).unwrap());
    assert_eq!(
        dispatcher.deliver_inbound_payload(&reply).unwrap(),
        InboundDisposition::Dropped
    );

    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].state(), ExchangeState::TimedOut);
}

#[test]
fn host_request_is_answered_without_opening_an_exchange() {
    let host = SimulatedHost::default();
    let (mut dispatcher, _) = dispatcher(&host);

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();
    dispatcher.set_request_handler(move |request: Request| sink.lock().unwrap().push(request));

    let ask = Request::new(
        CorrelationId::new("o-user-1").unwrap(),
        hostbridge::GetMessageRequest::new(Locale::new("zh", "CN").unwrap()),
    )
    .unwrap();
    let payload = Codec::default().encode(&ask.into()).unwrap();
    assert_eq!(
        dispatcher.deliver_inbound_payload(payload.as_bytes()).unwrap(),
        InboundDisposition::RequestDispatched(Variant::GetMessage)
    );

    let request = received.lock().unwrap().pop().unwrap();
    let content = hostbridge::MessageContent::from_parts(Some("shared text".into()), None).unwrap();
    let answer = Response::success(
        request.correlation_id().clone(),
        hostbridge::GetMessageResponse::new(Some(content)).unwrap(),
    )
    .unwrap();
    dispatcher.send_response(answer.clone()).unwrap();

    assert!(dispatcher.tracker().pending().is_empty());
    let sent = host.take();
    assert_eq!(
        Codec::default().decode(sent[0].as_bytes()).unwrap(),
        Message::Response(answer)
    );
}

#[test]
fn pending_exchange_survives_restart_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let config = BridgeConfig::builder("wx-test")
        .store_path(dir.path().join("pending.json"))
        .build()
        .unwrap();
    let host = SimulatedHost::default();

    {
        let mut first = Dispatcher::from_config(&config, host.clone()).unwrap();
        first.start().unwrap();
        first.submit(auth_request("o-user-1")).unwrap();
        // process evicted while the host is in front
    }

    let reply = host_answers_auth(&host, "abc");
    let mut second = Dispatcher::from_config(&config, host.clone()).unwrap();
    assert_eq!(second.tracker().pending().len(), 1);

    let disposition = second.deliver_inbound_payload(&reply).unwrap();
    assert!(matches!(disposition, InboundDisposition::Buffered(_)));

    let outcomes = Outcomes::default();
    let sink = outcomes.clone();
    second.set_listener(move |outcome: ExchangeOutcome| sink.lock().unwrap().push(outcome));

    let outcomes = outcomes.lock().unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].variant(), Variant::Auth);
    assert!(second.tracker().pending().is_empty());
}
