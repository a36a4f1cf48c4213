//! Protocol data model
//!
//! Every message is either a [`Request`] or a [`Response`]. Both carry a
//! [`CorrelationId`] and one body from a closed set of variants; the
//! [`Variant`] enum names that set and pairs each request with its response.
//!
//! All types validate their field ceilings when constructed and expose only
//! read access afterwards.

pub(crate) mod blob;
pub mod limits;
mod media;
mod request;
mod response;

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::blob::BlobSlot;

pub use media::{
    AppExtendObject, EmoticonObject, FileObject, ImageObject, LocationObject, MediaMessage,
    MediaMessageBuilder, MediaObject, MiniProgramObject, MiniProgramObjectBuilder,
    MiniProgramType, MusicObject, TextObject, VideoObject, WebpageObject,
};
pub use request::{
    AddCardToPackageRequest, AuthRequest, CardItem, CardState, ChooseCardRequest,
    ChooseCardRequestBuilder, ChooseInvoiceRequest, ChooseInvoiceRequestBuilder,
    GetMessageRequest, InvoiceAuthInsertRequest, InvoiceItem, JumpToBizProfileRequest,
    JumpToBizWebviewRequest, LaunchFromHostRequest, LaunchMiniProgramRequest,
    LaunchMiniProgramRequestBuilder, Locale, OpenBusinessViewRequest,
    OpenBusinessWebviewRequest, OpenRankListRequest, OpenTempSessionRequest, OpenWebviewRequest,
    ProfileType, Request, RequestBody, Scene, SendMessageRequest, SendMessageRequestBuilder,
    ShowMessageRequest, SubscribeMessageRequest, SubscribeMiniProgramRequest, WebviewType,
};
pub use response::{
    AddCardToPackageResponse, AuthResponse, ChooseCardResponse, ChooseInvoiceResponse,
    ErrorCode, GetMessageResponse, InvoiceAuthInsertResponse, JumpToBizProfileResponse,
    JumpToBizWebviewResponse, LaunchMiniProgramResponse, OpenBusinessViewResponse,
    OpenBusinessWebviewResponse, OpenRankListResponse, OpenTempSessionResponse,
    OpenWebviewResponse, Response, ResponseBody, SendMessageResponse, ShowMessageResponse,
    SubscribeMessageResponse, SubscribeMiniProgramResponse,
};

/// Field-level validation shared by every payload type
pub(crate) trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Which side issues the request of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// This app asks the host; the host answers
    Client,
    /// The host asks this app; this app answers through `send_response`
    Host,
}

/// Whether a message is a request or a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Request,
    Response,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }
}

/// One member of the request/response catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variant {
    Auth,
    SendMessage,
    OpenTempSession,
    OpenWebview,
    OpenBusinessWebview,
    OpenRankList,
    JumpToBizProfile,
    JumpToBizWebview,
    AddCardToPackage,
    ChooseCard,
    ChooseInvoice,
    SubscribeMessage,
    SubscribeMiniProgram,
    InvoiceAuthInsert,
    LaunchMiniProgram,
    OpenBusinessView,
    GetMessage,
    ShowMessage,
    LaunchFromHost,
}

impl Variant {
    pub const ALL: [Variant; 19] = [
        Self::Auth,
        Self::SendMessage,
        Self::OpenTempSession,
        Self::OpenWebview,
        Self::OpenBusinessWebview,
        Self::OpenRankList,
        Self::JumpToBizProfile,
        Self::JumpToBizWebview,
        Self::AddCardToPackage,
        Self::ChooseCard,
        Self::ChooseInvoice,
        Self::SubscribeMessage,
        Self::SubscribeMiniProgram,
        Self::InvoiceAuthInsert,
        Self::LaunchMiniProgram,
        Self::OpenBusinessView,
        Self::GetMessage,
        Self::ShowMessage,
        Self::LaunchFromHost,
    ];

    /// Stable wire tag
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::SendMessage => "send_message",
            Self::OpenTempSession => "open_temp_session",
            Self::OpenWebview => "open_webview",
            Self::OpenBusinessWebview => "open_business_webview",
            Self::OpenRankList => "open_rank_list",
            Self::JumpToBizProfile => "jump_to_biz_profile",
            Self::JumpToBizWebview => "jump_to_biz_webview",
            Self::AddCardToPackage => "add_card_to_package",
            Self::ChooseCard => "choose_card",
            Self::ChooseInvoice => "choose_invoice",
            Self::SubscribeMessage => "subscribe_message",
            Self::SubscribeMiniProgram => "subscribe_mini_program",
            Self::InvoiceAuthInsert => "invoice_auth_insert",
            Self::LaunchMiniProgram => "launch_mini_program",
            Self::OpenBusinessView => "open_business_view",
            Self::GetMessage => "get_message",
            Self::ShowMessage => "show_message",
            Self::LaunchFromHost => "launch_from_host",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|variant| variant.tag() == tag)
    }

    pub fn origin(&self) -> Origin {
        match self {
            Self::GetMessage | Self::ShowMessage | Self::LaunchFromHost => Origin::Host,
            _ => Origin::Client,
        }
    }

    /// `false` for notifications that are never answered
    pub fn expects_response(&self) -> bool {
        !matches!(self, Self::LaunchFromHost)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl Serialize for Variant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for Variant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Self::from_tag(&tag)
            .ok_or_else(|| de::Error::custom(format!("unknown variant tag {tag:?}")))
    }
}

/// Account-session identity echoed verbatim by the host
///
/// The client must compare it against what it sent before trusting the
/// account context of a response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
        let id = Self(id.into());
        id.validate()?;
        Ok(id)
    }

    /// Generate a random 128-bit id, hex encoded
    pub fn random() -> Self {
        use rand::Rng;

        let bytes: [u8; 16] = rand::thread_rng().r#gen();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for CorrelationId {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("correlation_id", &self.0, limits::CORRELATION_ID)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Text or media, never both
///
/// On the wire this is a boolean discriminator plus two optional fields; the
/// decoder rejects frames where the discriminator and the populated field
/// disagree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ContentWire")]
pub enum MessageContent {
    Text(String),
    Media(MediaMessage),
}

impl MessageContent {
    /// Build from the two optional halves, failing unless exactly one is set
    pub fn from_parts(
        text: Option<String>,
        media: Option<MediaMessage>,
    ) -> Result<Self, ValidationError> {
        let content = match (text, media) {
            (Some(text), None) => Self::Text(text),
            (None, Some(media)) => Self::Media(media),
            _ => {
                return Err(ValidationError::NotExactlyOne {
                    first: "text",
                    second: "media_message",
                });
            }
        };
        content.validate()?;
        Ok(content)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Media(_) => None,
        }
    }

    pub fn media(&self) -> Option<&MediaMessage> {
        match self {
            Self::Text(_) => None,
            Self::Media(media) => Some(media),
        }
    }

    pub(crate) fn blobs_mut<'a>(&'a mut self, out: &mut Vec<BlobSlot<'a>>) {
        if let Self::Media(media) = self {
            media.blobs_mut(out);
        }
    }
}

impl Validate for MessageContent {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Text(text) => limits::required("text", text, limits::TEXT),
            Self::Media(media) => media.validate(),
        }
    }
}

impl Serialize for MessageContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("MessageContent", 3)?;
        state.serialize_field("is_text", &self.is_text())?;
        state.serialize_field("text", &self.text())?;
        state.serialize_field("media", &self.media())?;
        state.end()
    }
}

#[derive(Deserialize)]
struct ContentWire {
    is_text: bool,
    text: Option<String>,
    media: Option<MediaMessage>,
}

impl TryFrom<ContentWire> for MessageContent {
    type Error = ValidationError;

    fn try_from(wire: ContentWire) -> Result<Self, Self::Error> {
        let content = Self::from_parts(wire.text, wire.media)?;
        if content.is_text() != wire.is_text {
            return Err(ValidationError::NotExactlyOne {
                first: "text",
                second: "media_message",
            });
        }
        Ok(content)
    }
}

/// Root of all protocol data
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Message {
    Request(Request),
    Response(Response),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Request(_) => MessageKind::Request,
            Self::Response(_) => MessageKind::Response,
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            Self::Request(request) => request.variant(),
            Self::Response(response) => response.variant(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        match self {
            Self::Request(request) => request.correlation_id(),
            Self::Response(response) => response.correlation_id(),
        }
    }

    pub(crate) fn blobs_mut(&mut self) -> Vec<BlobSlot<'_>> {
        let mut out = Vec::new();
        match self {
            Self::Request(request) => request.blobs_mut(&mut out),
            Self::Response(response) => response.blobs_mut(&mut out),
        }
        out
    }
}

impl Validate for Message {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Request(request) => request.validate(),
            Self::Response(response) => response.validate(),
        }
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_tags_roundtrip() {
        for variant in Variant::ALL {
            assert_eq!(Variant::from_tag(variant.tag()), Some(variant));
        }
        assert_eq!(Variant::from_tag("teleport"), None);
    }

    #[test]
    fn test_variant_origin() {
        assert_eq!(Variant::Auth.origin(), Origin::Client);
        assert_eq!(Variant::GetMessage.origin(), Origin::Host);
        assert!(!Variant::LaunchFromHost.expects_response());
        assert!(Variant::ShowMessage.expects_response());
    }

    #[test]
    fn test_random_correlation_ids_differ() {
        let a = CorrelationId::random();
        let b = CorrelationId::random();
        assert_eq!(a.as_str().len(), 32);
        assert_ne!(a, b);
    }

    #[test]
    fn test_correlation_id_rejects_empty() {
        assert!(CorrelationId::new("").is_err());
        assert!(CorrelationId::new("o-user-1").is_ok());
    }

    #[test]
    fn test_content_needs_exactly_one_half() {
        let media = MediaMessage::builder()
            .object(TextObject::new("hi").unwrap())
            .build()
            .unwrap();

        assert!(matches!(
            MessageContent::from_parts(Some("hi".into()), Some(media.clone())),
            Err(ValidationError::NotExactlyOne { .. })
        ));
        assert!(matches!(
            MessageContent::from_parts(None, None),
            Err(ValidationError::NotExactlyOne { .. })
        ));
        assert!(MessageContent::from_parts(None, Some(media)).is_ok());
    }
}
