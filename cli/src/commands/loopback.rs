//! A full auth exchange against a host simulated on another task.
//!
//! The two sides share nothing but channels of transport payloads, the same
//! way the real apps share nothing but launch URLs.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures_lite::FutureExt;
use futures_lite::future;
use serde_json::json;
use smol::Timer;
use smol::channel::{self, Receiver, Sender};

use hostbridge::{
    AuthRequest, AuthResponse, BridgeConfig, Codec, CorrelationId, Dispatcher, ErrorCode,
    ExchangeOutcome, HostLauncher, LaunchError, Locale, Message, Request, RequestBody, Response,
    TransportPayload, Variant,
};

use crate::cli::LoopbackArgs;

/// Launcher that hands payloads to the simulated host
struct ChannelLauncher {
    to_host: Sender<TransportPayload>,
}

impl HostLauncher for ChannelLauncher {
    fn launch(&mut self, payload: TransportPayload) -> Result<(), LaunchError> {
        tracing::debug!(bytes = payload.len(), "launching simulated host");
        self.to_host
            .try_send(payload)
            .map_err(|_| LaunchError::HostNotInstalled)
    }
}

/// How the simulated host answers
#[derive(Clone, Copy)]
enum HostBehavior {
    Approve,
    Deny,
    Silent,
}

struct HostScript {
    behavior: HostBehavior,
    code: String,
    delay: Duration,
}

enum Inbound {
    Payload(TransportPayload),
    HungUp,
    DeadlineReached,
}

pub async fn execute(args: LoopbackArgs, config: BridgeConfig) -> Result<()> {
    let behavior = match (args.deny, args.no_reply) {
        (true, true) => bail!("--deny and --no-reply are mutually exclusive"),
        (true, false) => HostBehavior::Deny,
        (false, true) => HostBehavior::Silent,
        (false, false) => HostBehavior::Approve,
    };

    let (to_host, host_inbox) = channel::unbounded();
    let (host_outbox, from_host) = channel::unbounded();
    let (outcome_tx, outcome_rx) = channel::unbounded::<ExchangeOutcome>();

    let script = HostScript {
        behavior,
        code: args.code.clone(),
        delay: Duration::from_millis(args.host_delay_ms),
    };
    let host = smol::spawn(simulated_host(config.codec(), script, host_inbox, host_outbox));

    let mut dispatcher = Dispatcher::from_config(&config, ChannelLauncher { to_host })
        .context("failed to open dispatcher")?;
    dispatcher.start()?;

    let request = Request::new(
        CorrelationId::random(),
        AuthRequest::new(&args.scope, CorrelationId::random().as_str())?,
    )?;
    let ticket = dispatcher.submit_with(request, move |outcome: ExchangeOutcome| {
        let _ = outcome_tx.try_send(outcome);
    })?;
    tracing::info!(ticket = %ticket, "auth request submitted");

    let deadline = args.deadline_ms.map(Duration::from_millis);
    let inbound = async {
        match from_host.recv().await {
            Ok(payload) => Inbound::Payload(payload),
            Err(_) => Inbound::HungUp,
        }
    }
    .or(async {
        match deadline {
            Some(deadline) => {
                Timer::after(deadline).await;
                Inbound::DeadlineReached
            }
            None => future::pending().await,
        }
    })
    .await;

    match inbound {
        Inbound::Payload(payload) => {
            let disposition = dispatcher.deliver_inbound_payload(payload.as_bytes())?;
            tracing::debug!(?disposition, "host payload delivered");
        }
        Inbound::DeadlineReached => {
            tracing::warn!(ticket = %ticket, "no response before deadline, cancelling");
            dispatcher.cancel(ticket)?;
        }
        Inbound::HungUp => {
            tracing::warn!("host went away without answering");
            dispatcher.clear_listener()?;
        }
    }

    // Nothing else is awaited from the host once the client side settled
    drop(host);

    let outcome = outcome_rx
        .try_recv()
        .context("exchange finished without reporting an outcome")?;
    println!("{}", serde_json::to_string_pretty(&describe(&outcome))?);
    Ok(())
}

async fn simulated_host(
    codec: Codec,
    script: HostScript,
    inbox: Receiver<TransportPayload>,
    outbox: Sender<TransportPayload>,
) {
    let Ok(payload) = inbox.recv().await else {
        return;
    };
    let reply = match answer(&codec, &script, payload.as_bytes()) {
        Ok(Some(reply)) => reply,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, "simulated host failed to answer");
            return;
        }
    };

    Timer::after(script.delay).await;
    let _ = outbox.send(reply).await;
}

/// Build the host's reply; `None` when it stays silent
fn answer(codec: &Codec, script: &HostScript, raw: &[u8]) -> Result<Option<TransportPayload>> {
    let Message::Request(request) = codec.decode(raw)? else {
        bail!("host expected a request");
    };
    let RequestBody::Auth(auth) = request.body() else {
        bail!("host only answers auth requests, got {}", request.variant());
    };
    tracing::debug!(scope = auth.scope(), "simulated host received auth request");

    let correlation_id = request.correlation_id().clone();
    let response = match script.behavior {
        HostBehavior::Silent => return Ok(None),
        HostBehavior::Deny => Response::failure(
            correlation_id,
            Variant::Auth,
            ErrorCode::AuthDenied,
            "user denied authorization",
        )?,
        HostBehavior::Approve => Response::success(
            correlation_id,
            AuthResponse::new(
                Some(script.code.clone()),
                Some(auth.state().to_string()),
                Locale::new("en", "US")?,
            )?,
        )?,
    };
    Ok(Some(codec.encode(&response.into())?))
}

fn describe(outcome: &ExchangeOutcome) -> serde_json::Value {
    let state = format!("{:?}", outcome.state());
    match outcome {
        ExchangeOutcome::Resolved { ticket, response } => json!({
            "ticket": ticket.id(),
            "state": state,
            "error_code": i32::from(response.error_code()),
            "error_message": response.error_message(),
            "response": response,
        }),
        ExchangeOutcome::LaunchFailed { ticket, error, .. } => json!({
            "ticket": ticket.id(),
            "state": state,
            "error": error.to_string(),
        }),
        ExchangeOutcome::TimedOut { ticket, .. } | ExchangeOutcome::Abandoned { ticket, .. } => {
            json!({
                "ticket": ticket.id(),
                "state": state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(behavior: HostBehavior) -> HostScript {
        HostScript {
            behavior,
            code: "abc".into(),
            delay: Duration::ZERO,
        }
    }

    fn auth_payload(codec: &Codec) -> TransportPayload {
        let request = Request::new(
            CorrelationId::new("o-user").unwrap(),
            AuthRequest::new("snsapi_userinfo", "nonce").unwrap(),
        )
        .unwrap();
        codec.encode(&request.into()).unwrap()
    }

    #[test]
    fn test_host_approves_with_code_and_state() {
        let codec = Codec::default();
        let payload = auth_payload(&codec);
        let reply = answer(&codec, &script(HostBehavior::Approve), payload.as_bytes())
            .unwrap()
            .unwrap();

        let Message::Response(response) = codec.decode(reply.as_bytes()).unwrap() else {
            panic!("expected a response");
        };
        let hostbridge::ResponseBody::Auth(auth) = response.body() else {
            panic!("expected an auth response");
        };
        assert_eq!(auth.code(), Some("abc"));
        assert_eq!(auth.state(), Some("nonce"));
    }

    #[test]
    fn test_host_denies() {
        let codec = Codec::default();
        let payload = auth_payload(&codec);
        let reply = answer(&codec, &script(HostBehavior::Deny), payload.as_bytes())
            .unwrap()
            .unwrap();

        let Message::Response(response) = codec.decode(reply.as_bytes()).unwrap() else {
            panic!("expected a response");
        };
        assert_eq!(response.error_code(), ErrorCode::AuthDenied);
    }

    #[test]
    fn test_silent_host_has_no_reply() {
        let codec = Codec::default();
        let payload = auth_payload(&codec);
        let reply = answer(&codec, &script(HostBehavior::Silent), payload.as_bytes()).unwrap();
        assert!(reply.is_none());
    }

    #[test]
    fn test_loopback_resolves() {
        let config = BridgeConfig::builder("wx-loopback").build().unwrap();
        let args = LoopbackArgs {
            scope: "snsapi_userinfo".into(),
            code: "abc".into(),
            deny: false,
            no_reply: false,
            host_delay_ms: 0,
            deadline_ms: Some(5_000),
            common: crate::cli::CommonArgs {
                app_id: None,
                store: None,
                max_payload_bytes: None,
                grace_window_secs: None,
            },
        };
        smol::block_on(execute(args, config)).unwrap();
    }
}
