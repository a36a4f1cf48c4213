use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::blob::BlobSlot;
use crate::model::limits;
use crate::model::request::{Locale, validate_cards};
use crate::model::{CardItem, CorrelationId, InvoiceItem, MessageContent, Validate, Variant};

/// Outcome code carried by every response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ErrorCode {
    #[default]
    Success,
    CommonError,
    UserCancelled,
    SendFailed,
    AuthDenied,
    Unsupported,
}

impl ErrorCode {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        match code {
            ErrorCode::Success => 0,
            ErrorCode::CommonError => -1,
            ErrorCode::UserCancelled => -2,
            ErrorCode::SendFailed => -3,
            ErrorCode::AuthDenied => -4,
            ErrorCode::Unsupported => -5,
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Success),
            -1 => Ok(Self::CommonError),
            -2 => Ok(Self::UserCancelled),
            -3 => Ok(Self::SendFailed),
            -4 => Ok(Self::AuthDenied),
            -5 => Ok(Self::Unsupported),
            other => Err(ValidationError::UnknownCode {
                field: "error_code",
                value: other.into(),
            }),
        }
    }
}

/// Result of an [`AuthRequest`](crate::AuthRequest)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthResponse {
    code: Option<String>,
    state: Option<String>,
    locale: Locale,
}

impl AuthResponse {
    pub fn new(
        code: Option<String>,
        state: Option<String>,
        locale: Locale,
    ) -> Result<Self, ValidationError> {
        let response = Self {
            code,
            state,
            locale,
        };
        response.validate()?;
        Ok(response)
    }

    /// Authorization code to exchange server-side
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Nonce echoed from the request
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }
}

impl Validate for AuthResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::optional("code", self.code.as_deref(), limits::IDENTIFIER)?;
        limits::optional("state", self.state.as_deref(), limits::AUTH_STATE)?;
        self.locale.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SendMessageResponse {
    locale: Locale,
}

impl SendMessageResponse {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }
}

impl Validate for SendMessageResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        self.locale.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenTempSessionResponse {}

impl Validate for OpenTempSessionResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenWebviewResponse {}

impl Validate for OpenWebviewResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenBusinessWebviewResponse {
    result: String,
    business_type: u32,
}

impl OpenBusinessWebviewResponse {
    pub fn new(result: impl Into<String>, business_type: u32) -> Result<Self, ValidationError> {
        let response = Self {
            result: result.into(),
            business_type,
        };
        response.validate()?;
        Ok(response)
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn business_type(&self) -> u32 {
        self.business_type
    }
}

impl Validate for OpenBusinessWebviewResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len("result", &self.result, limits::BUSINESS_RESULT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenRankListResponse {}

impl Validate for OpenRankListResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JumpToBizProfileResponse {}

impl Validate for JumpToBizProfileResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JumpToBizWebviewResponse {}

impl Validate for JumpToBizWebviewResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AddCardToPackageResponse {
    cards: Vec<CardItem>,
}

impl AddCardToPackageResponse {
    pub fn new(cards: Vec<CardItem>) -> Result<Self, ValidationError> {
        let response = Self { cards };
        response.validate()?;
        Ok(response)
    }

    pub fn cards(&self) -> &[CardItem] {
        &self.cards
    }
}

impl Validate for AddCardToPackageResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_cards("cards", &self.cards)
    }
}

/// Cards the user picked
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChooseCardResponse {
    cards: Vec<CardItem>,
}

impl ChooseCardResponse {
    pub fn new(cards: Vec<CardItem>) -> Result<Self, ValidationError> {
        let response = Self { cards };
        response.validate()?;
        Ok(response)
    }

    pub fn cards(&self) -> &[CardItem] {
        &self.cards
    }
}

impl Validate for ChooseCardResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_cards("cards", &self.cards)
    }
}

/// Invoices the user picked
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChooseInvoiceResponse {
    invoices: Vec<InvoiceItem>,
}

impl ChooseInvoiceResponse {
    pub fn new(invoices: Vec<InvoiceItem>) -> Result<Self, ValidationError> {
        let response = Self { invoices };
        response.validate()?;
        Ok(response)
    }

    pub fn invoices(&self) -> &[InvoiceItem] {
        &self.invoices
    }
}

impl Validate for ChooseInvoiceResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_cards("invoices", &self.invoices)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscribeMessageResponse {
    template_id: String,
    scene: u32,
    action: String,
    reserved: String,
    open_id: Option<String>,
}

impl SubscribeMessageResponse {
    pub fn new(
        template_id: impl Into<String>,
        scene: u32,
        action: impl Into<String>,
        reserved: impl Into<String>,
        open_id: Option<String>,
    ) -> Result<Self, ValidationError> {
        let response = Self {
            template_id: template_id.into(),
            scene,
            action: action.into(),
            reserved: reserved.into(),
            open_id,
        };
        response.validate()?;
        Ok(response)
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn scene(&self) -> u32 {
        self.scene
    }

    /// `confirm` or `cancel`
    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn reserved(&self) -> &str {
        &self.reserved
    }

    pub fn open_id(&self) -> Option<&str> {
        self.open_id.as_deref()
    }
}

impl Validate for SubscribeMessageResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len("template_id", &self.template_id, limits::IDENTIFIER)?;
        limits::max_len("action", &self.action, limits::IDENTIFIER)?;
        limits::max_len("reserved", &self.reserved, limits::IDENTIFIER)?;
        limits::optional("open_id", self.open_id.as_deref(), limits::IDENTIFIER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscribeMiniProgramResponse {
    open_id: String,
    union_id: String,
    nick_name: String,
}

impl SubscribeMiniProgramResponse {
    pub fn new(
        open_id: impl Into<String>,
        union_id: impl Into<String>,
        nick_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let response = Self {
            open_id: open_id.into(),
            union_id: union_id.into(),
            nick_name: nick_name.into(),
        };
        response.validate()?;
        Ok(response)
    }

    pub fn open_id(&self) -> &str {
        &self.open_id
    }

    pub fn union_id(&self) -> &str {
        &self.union_id
    }

    pub fn nick_name(&self) -> &str {
        &self.nick_name
    }
}

impl Validate for SubscribeMiniProgramResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len("open_id", &self.open_id, limits::IDENTIFIER)?;
        limits::max_len("union_id", &self.union_id, limits::IDENTIFIER)?;
        limits::max_len("nick_name", &self.nick_name, limits::IDENTIFIER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceAuthInsertResponse {
    order_id: String,
}

impl InvoiceAuthInsertResponse {
    pub fn new(order_id: impl Into<String>) -> Result<Self, ValidationError> {
        let response = Self {
            order_id: order_id.into(),
        };
        response.validate()?;
        Ok(response)
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }
}

impl Validate for InvoiceAuthInsertResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len("order_id", &self.order_id, limits::IDENTIFIER)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LaunchMiniProgramResponse {
    ext_msg: Option<String>,
}

impl LaunchMiniProgramResponse {
    pub fn new(ext_msg: Option<String>) -> Result<Self, ValidationError> {
        let response = Self { ext_msg };
        response.validate()?;
        Ok(response)
    }

    /// Extra data the mini program handed back
    pub fn ext_msg(&self) -> Option<&str> {
        self.ext_msg.as_deref()
    }
}

impl Validate for LaunchMiniProgramResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::optional("ext_msg", self.ext_msg.as_deref(), limits::JSON_EXTRA)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenBusinessViewResponse {
    business_type: String,
    ext_msg: Option<String>,
}

impl OpenBusinessViewResponse {
    pub fn new(
        business_type: impl Into<String>,
        ext_msg: Option<String>,
    ) -> Result<Self, ValidationError> {
        let response = Self {
            business_type: business_type.into(),
            ext_msg,
        };
        response.validate()?;
        Ok(response)
    }

    pub fn business_type(&self) -> &str {
        &self.business_type
    }

    pub fn ext_msg(&self) -> Option<&str> {
        self.ext_msg.as_deref()
    }
}

impl Validate for OpenBusinessViewResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len("business_type", &self.business_type, limits::IDENTIFIER)?;
        limits::optional("ext_msg", self.ext_msg.as_deref(), limits::JSON_EXTRA)
    }
}

/// Content this app hands to the host after a `GetMessage` request
///
/// Empty when the app declines.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetMessageResponse {
    content: Option<MessageContent>,
}

impl GetMessageResponse {
    pub fn new(content: Option<MessageContent>) -> Result<Self, ValidationError> {
        let response = Self { content };
        response.validate()?;
        Ok(response)
    }

    pub fn content(&self) -> Option<&MessageContent> {
        self.content.as_ref()
    }
}

impl Validate for GetMessageResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        match &self.content {
            Some(content) => content.validate(),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShowMessageResponse {}

impl Validate for ShowMessageResponse {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Response payload; `LaunchFromHost` has no response form
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Auth(AuthResponse),
    SendMessage(SendMessageResponse),
    OpenTempSession(OpenTempSessionResponse),
    OpenWebview(OpenWebviewResponse),
    OpenBusinessWebview(OpenBusinessWebviewResponse),
    OpenRankList(OpenRankListResponse),
    JumpToBizProfile(JumpToBizProfileResponse),
    JumpToBizWebview(JumpToBizWebviewResponse),
    AddCardToPackage(AddCardToPackageResponse),
    ChooseCard(ChooseCardResponse),
    ChooseInvoice(ChooseInvoiceResponse),
    SubscribeMessage(SubscribeMessageResponse),
    SubscribeMiniProgram(SubscribeMiniProgramResponse),
    InvoiceAuthInsert(InvoiceAuthInsertResponse),
    LaunchMiniProgram(LaunchMiniProgramResponse),
    OpenBusinessView(OpenBusinessViewResponse),
    GetMessage(GetMessageResponse),
    ShowMessage(ShowMessageResponse),
}

macro_rules! response_variants {
    ($($variant:ident($body:ident)),* $(,)?) => {
        impl ResponseBody {
            pub fn variant(&self) -> Variant {
                match self {
                    $(Self::$variant(_) => Variant::$variant,)*
                }
            }

            /// Default body for `variant`, used by failure responses
            pub fn empty(variant: Variant) -> Option<Self> {
                match variant {
                    $(Variant::$variant => Some(Self::$variant($body::default())),)*
                    Variant::LaunchFromHost => None,
                }
            }
        }

        impl Validate for ResponseBody {
            fn validate(&self) -> Result<(), ValidationError> {
                match self {
                    $(Self::$variant(body) => body.validate(),)*
                }
            }
        }

        $(
            impl From<$body> for ResponseBody {
                fn from(body: $body) -> Self {
                    Self::$variant(body)
                }
            }
        )*
    };
}

response_variants! {
    Auth(AuthResponse),
    SendMessage(SendMessageResponse),
    OpenTempSession(OpenTempSessionResponse),
    OpenWebview(OpenWebviewResponse),
    OpenBusinessWebview(OpenBusinessWebviewResponse),
    OpenRankList(OpenRankListResponse),
    JumpToBizProfile(JumpToBizProfileResponse),
    JumpToBizWebview(JumpToBizWebviewResponse),
    AddCardToPackage(AddCardToPackageResponse),
    ChooseCard(ChooseCardResponse),
    ChooseInvoice(ChooseInvoiceResponse),
    SubscribeMessage(SubscribeMessageResponse),
    SubscribeMiniProgram(SubscribeMiniProgramResponse),
    InvoiceAuthInsert(InvoiceAuthInsertResponse),
    LaunchMiniProgram(LaunchMiniProgramResponse),
    OpenBusinessView(OpenBusinessViewResponse),
    GetMessage(GetMessageResponse),
    ShowMessage(ShowMessageResponse),
}

impl ResponseBody {
    fn blobs_mut<'a>(&'a mut self, out: &mut Vec<BlobSlot<'a>>) {
        if let Self::GetMessage(body) = self
            && let Some(content) = body.content.as_mut()
        {
            content.blobs_mut(out);
        }
    }
}

/// A validated response, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    correlation_id: CorrelationId,
    error_code: ErrorCode,
    error_message: String,
    body: ResponseBody,
}

impl Response {
    pub fn new(
        correlation_id: CorrelationId,
        error_code: ErrorCode,
        error_message: impl Into<String>,
        body: impl Into<ResponseBody>,
    ) -> Result<Self, ValidationError> {
        let response = Self {
            correlation_id,
            error_code,
            error_message: error_message.into(),
            body: body.into(),
        };
        response.validate()?;
        Ok(response)
    }

    /// Successful response with an empty error message
    pub fn success(
        correlation_id: CorrelationId,
        body: impl Into<ResponseBody>,
    ) -> Result<Self, ValidationError> {
        Self::new(correlation_id, ErrorCode::Success, "", body)
    }

    /// Failed response carrying the default body of `variant`
    pub fn failure(
        correlation_id: CorrelationId,
        variant: Variant,
        error_code: ErrorCode,
        error_message: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let body = ResponseBody::empty(variant).ok_or(ValidationError::NotAllowed {
            field: "variant",
            condition: "for variants that expect a response",
        })?;
        Self::new(correlation_id, error_code, error_message, body)
    }

    pub(crate) fn from_parts_unchecked(
        correlation_id: CorrelationId,
        error_code: ErrorCode,
        error_message: String,
        body: ResponseBody,
    ) -> Self {
        Self {
            correlation_id,
            error_code,
            error_message,
            body,
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn is_success(&self) -> bool {
        self.error_code.is_success()
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    pub fn variant(&self) -> Variant {
        self.body.variant()
    }

    pub(crate) fn blobs_mut<'a>(&'a mut self, out: &mut Vec<BlobSlot<'a>>) {
        self.body.blobs_mut(out);
    }
}

impl Validate for Response {
    fn validate(&self) -> Result<(), ValidationError> {
        self.correlation_id.validate()?;
        limits::max_len("error_message", &self.error_message, limits::ERROR_MESSAGE)?;
        self.body.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> CorrelationId {
        CorrelationId::new("o-user").unwrap()
    }

    #[test]
    fn test_error_code_values() {
        for (code, value) in [
            (ErrorCode::Success, 0),
            (ErrorCode::CommonError, -1),
            (ErrorCode::UserCancelled, -2),
            (ErrorCode::SendFailed, -3),
            (ErrorCode::AuthDenied, -4),
            (ErrorCode::Unsupported, -5),
        ] {
            assert_eq!(i32::from(code), value);
            assert_eq!(ErrorCode::try_from(value), Ok(code));
        }
        assert!(ErrorCode::try_from(-6).is_err());
    }

    #[test]
    fn test_failure_uses_empty_body() {
        let response =
            Response::failure(id(), Variant::Auth, ErrorCode::UserCancelled, "cancelled").unwrap();
        assert_eq!(response.variant(), Variant::Auth);
        assert!(!response.is_success());
        assert_eq!(response.error_message(), "cancelled");
    }

    #[test]
    fn test_launch_from_host_has_no_response() {
        assert!(ResponseBody::empty(Variant::LaunchFromHost).is_none());
        assert!(
            Response::failure(id(), Variant::LaunchFromHost, ErrorCode::CommonError, "").is_err()
        );
    }

    #[test]
    fn test_every_answerable_variant_has_empty_body() {
        for variant in Variant::ALL {
            let body = ResponseBody::empty(variant);
            assert_eq!(body.is_some(), variant.expects_response());
            if let Some(body) = body {
                assert_eq!(body.variant(), variant);
            }
        }
    }

    #[test]
    fn test_error_message_ceiling() {
        let err = Response::failure(
            id(),
            Variant::OpenWebview,
            ErrorCode::CommonError,
            "e".repeat(limits::ERROR_MESSAGE + 1),
        )
        .unwrap_err();
        assert_eq!(err.field(), "error_message");
    }

    #[test]
    fn test_business_result_ceiling() {
        assert!(OpenBusinessWebviewResponse::new("r".repeat(limits::BUSINESS_RESULT), 1).is_ok());
        assert!(
            OpenBusinessWebviewResponse::new("r".repeat(limits::BUSINESS_RESULT + 1), 1).is_err()
        );
    }
}
