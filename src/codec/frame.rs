//! Wire frame layout
//!
//! ```text
//! [1 byte: protocol version]
//! [1 byte: kind (0 = request, 1 = response)]
//! [1 byte: variant tag length (u8)]
//! [tag bytes (UTF-8)]
//! [body bytes (MessagePack, named fields)]
//! ```
//!
//! Request bodies are `{correlation_id, body}`, response bodies
//! `{correlation_id, error_code, error_message, body}`.

use serde::{Deserialize, Serialize};

use crate::error::{DecodingError, EncodingError, Error, Result};
use crate::model::*;

pub const PROTOCOL_VERSION: u8 = 1;

const KIND_REQUEST: u8 = 0;
const KIND_RESPONSE: u8 = 1;

#[derive(Serialize, Deserialize)]
struct RequestFrame<B> {
    correlation_id: CorrelationId,
    body: B,
}

#[derive(Serialize, Deserialize)]
struct ResponseFrame<B> {
    correlation_id: CorrelationId,
    error_code: ErrorCode,
    error_message: String,
    body: B,
}

/// Frame header split off a raw payload, body still undecoded
#[derive(Debug)]
pub(crate) struct RawFrame<'a> {
    pub kind: MessageKind,
    pub tag: &'a str,
    pub body: &'a [u8],
}

impl<'a> RawFrame<'a> {
    pub(crate) fn parse(data: &'a [u8]) -> Result<Self, DecodingError> {
        let [version, kind, tag_len, rest @ ..] = data else {
            return Err(DecodingError::Truncated("header"));
        };

        if *version != PROTOCOL_VERSION {
            return Err(DecodingError::UnsupportedVersion(*version));
        }

        let kind = match *kind {
            KIND_REQUEST => MessageKind::Request,
            KIND_RESPONSE => MessageKind::Response,
            other => return Err(DecodingError::InvalidKind(other)),
        };

        let tag_len = *tag_len as usize;
        if rest.len() < tag_len {
            return Err(DecodingError::Truncated("variant tag"));
        }

        let tag = std::str::from_utf8(&rest[..tag_len])
            .map_err(|e| DecodingError::InvalidTag(format!("invalid tag UTF-8: {e}")))?;

        Ok(Self {
            kind,
            tag,
            body: &rest[tag_len..],
        })
    }
}

/// Serialize a message into a complete frame
pub(crate) fn write(message: &Message) -> Result<Vec<u8>, EncodingError> {
    let (kind, body) = match message {
        Message::Request(request) => (
            KIND_REQUEST,
            rmp_serde::to_vec_named(&RequestFrame {
                correlation_id: request.correlation_id().clone(),
                body: request.body(),
            })?,
        ),
        Message::Response(response) => (
            KIND_RESPONSE,
            rmp_serde::to_vec_named(&ResponseFrame {
                correlation_id: response.correlation_id().clone(),
                error_code: response.error_code(),
                error_message: response.error_message().to_string(),
                body: response.body(),
            })?,
        ),
    };

    let tag = message.variant().tag().as_bytes();
    let mut buf = Vec::with_capacity(3 + tag.len() + body.len());
    buf.push(PROTOCOL_VERSION);
    buf.push(kind);
    // Tags are short ASCII identifiers, always below 256 bytes
    buf.push(tag.len() as u8);
    buf.extend_from_slice(tag);
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Deserialize the body of a parsed frame into an unvalidated message
pub(crate) fn read(frame: &RawFrame<'_>) -> Result<Message> {
    let variant =
        Variant::from_tag(frame.tag).ok_or_else(|| Error::UnsupportedVariant(frame.tag.into()))?;

    let message = match frame.kind {
        MessageKind::Request => Message::Request(read_request(variant, frame.body)?),
        MessageKind::Response => Message::Response(read_response(variant, frame.body)?),
    };
    Ok(message)
}

fn request_frame<B>(body: &[u8]) -> Result<Request, DecodingError>
where
    B: for<'de> Deserialize<'de> + Into<RequestBody>,
{
    let frame: RequestFrame<B> = rmp_serde::from_slice(body)?;
    Ok(Request::from_parts_unchecked(
        frame.correlation_id,
        frame.body.into(),
    ))
}

fn response_frame<B>(body: &[u8]) -> Result<Response, DecodingError>
where
    B: for<'de> Deserialize<'de> + Into<ResponseBody>,
{
    let frame: ResponseFrame<B> = rmp_serde::from_slice(body)?;
    Ok(Response::from_parts_unchecked(
        frame.correlation_id,
        frame.error_code,
        frame.error_message,
        frame.body.into(),
    ))
}

fn read_request(variant: Variant, body: &[u8]) -> Result<Request, DecodingError> {
    match variant {
        Variant::Auth => request_frame::<AuthRequest>(body),
        Variant::SendMessage => request_frame::<SendMessageRequest>(body),
        Variant::OpenTempSession => request_frame::<OpenTempSessionRequest>(body),
        Variant::OpenWebview => request_frame::<OpenWebviewRequest>(body),
        Variant::OpenBusinessWebview => request_frame::<OpenBusinessWebviewRequest>(body),
        Variant::OpenRankList => request_frame::<OpenRankListRequest>(body),
        Variant::JumpToBizProfile => request_frame::<JumpToBizProfileRequest>(body),
        Variant::JumpToBizWebview => request_frame::<JumpToBizWebviewRequest>(body),
        Variant::AddCardToPackage => request_frame::<AddCardToPackageRequest>(body),
        Variant::ChooseCard => request_frame::<ChooseCardRequest>(body),
        Variant::ChooseInvoice => request_frame::<ChooseInvoiceRequest>(body),
        Variant::SubscribeMessage => request_frame::<SubscribeMessageRequest>(body),
        Variant::SubscribeMiniProgram => request_frame::<SubscribeMiniProgramRequest>(body),
        Variant::InvoiceAuthInsert => request_frame::<InvoiceAuthInsertRequest>(body),
        Variant::LaunchMiniProgram => request_frame::<LaunchMiniProgramRequest>(body),
        Variant::OpenBusinessView => request_frame::<OpenBusinessViewRequest>(body),
        Variant::GetMessage => request_frame::<GetMessageRequest>(body),
        Variant::ShowMessage => request_frame::<ShowMessageRequest>(body),
        Variant::LaunchFromHost => request_frame::<LaunchFromHostRequest>(body),
    }
}

fn read_response(variant: Variant, body: &[u8]) -> Result<Response, DecodingError> {
    match variant {
        Variant::Auth => response_frame::<AuthResponse>(body),
        Variant::SendMessage => response_frame::<SendMessageResponse>(body),
        Variant::OpenTempSession => response_frame::<OpenTempSessionResponse>(body),
        Variant::OpenWebview => response_frame::<OpenWebviewResponse>(body),
        Variant::OpenBusinessWebview => response_frame::<OpenBusinessWebviewResponse>(body),
        Variant::OpenRankList => response_frame::<OpenRankListResponse>(body),
        Variant::JumpToBizProfile => response_frame::<JumpToBizProfileResponse>(body),
        Variant::JumpToBizWebview => response_frame::<JumpToBizWebviewResponse>(body),
        Variant::AddCardToPackage => response_frame::<AddCardToPackageResponse>(body),
        Variant::ChooseCard => response_frame::<ChooseCardResponse>(body),
        Variant::ChooseInvoice => response_frame::<ChooseInvoiceResponse>(body),
        Variant::SubscribeMessage => response_frame::<SubscribeMessageResponse>(body),
        Variant::SubscribeMiniProgram => response_frame::<SubscribeMiniProgramResponse>(body),
        Variant::InvoiceAuthInsert => response_frame::<InvoiceAuthInsertResponse>(body),
        Variant::LaunchMiniProgram => response_frame::<LaunchMiniProgramResponse>(body),
        Variant::OpenBusinessView => response_frame::<OpenBusinessViewResponse>(body),
        Variant::GetMessage => response_frame::<GetMessageResponse>(body),
        Variant::ShowMessage => response_frame::<ShowMessageResponse>(body),
        Variant::LaunchFromHost => Err(DecodingError::KindMismatch {
            variant,
            kind: MessageKind::Response.as_str(),
        }),
    }
}
