use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::blob::BlobSlot;
use crate::model::limits;
use crate::model::{CorrelationId, MediaMessage, MessageContent, MiniProgramType, Validate, Variant};

/// Where a shared message lands in the host app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Scene {
    /// A chat session picked by the user
    #[default]
    Session,
    Timeline,
    Favorite,
    /// A specific contact; requires a target id
    SpecifiedTarget,
}

impl From<Scene> for u8 {
    fn from(scene: Scene) -> Self {
        match scene {
            Scene::Session => 0,
            Scene::Timeline => 1,
            Scene::Favorite => 2,
            Scene::SpecifiedTarget => 3,
        }
    }
}

impl TryFrom<u8> for Scene {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Session),
            1 => Ok(Self::Timeline),
            2 => Ok(Self::Favorite),
            3 => Ok(Self::SpecifiedTarget),
            other => Err(ValidationError::UnknownCode {
                field: "scene",
                value: other.into(),
            }),
        }
    }
}

/// Kind of official account profile to open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ProfileType {
    #[default]
    Normal,
    Device,
}

impl From<ProfileType> for u8 {
    fn from(value: ProfileType) -> Self {
        match value {
            ProfileType::Normal => 0,
            ProfileType::Device => 1,
        }
    }
}

impl TryFrom<u8> for ProfileType {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Device),
            other => Err(ValidationError::UnknownCode {
                field: "profile_type",
                value: other.into(),
            }),
        }
    }
}

/// Kind of profile web page to open; only ad pages exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WebviewType {
    #[default]
    Ad,
}

impl From<WebviewType> for u8 {
    fn from(_: WebviewType) -> Self {
        0
    }
}

impl TryFrom<u8> for WebviewType {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Ad),
            other => Err(ValidationError::UnknownCode {
                field: "web_type",
                value: other.into(),
            }),
        }
    }
}

/// Whether a card is already in the user's card package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CardState {
    #[default]
    NotAdded,
    Added,
}

impl From<CardState> for u32 {
    fn from(value: CardState) -> Self {
        match value {
            CardState::NotAdded => 0,
            CardState::Added => 1,
        }
    }
}

impl TryFrom<u32> for CardState {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NotAdded),
            1 => Ok(Self::Added),
            other => Err(ValidationError::UnknownCode {
                field: "card_state",
                value: other.into(),
            }),
        }
    }
}

/// Language and country of the host UI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Locale {
    lang: String,
    country: String,
}

impl Locale {
    pub fn new(lang: impl Into<String>, country: impl Into<String>) -> Result<Self, ValidationError> {
        let locale = Self {
            lang: lang.into(),
            country: country.into(),
        };
        locale.validate()?;
        Ok(locale)
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn country(&self) -> &str {
        &self.country
    }
}

impl Validate for Locale {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len("lang", &self.lang, limits::LOCALE)?;
        limits::max_len("country", &self.country, limits::LOCALE)
    }
}

/// A card (or invoice) entry
///
/// Requests only fill `card_id` and `ext_msg`; the host fills the rest when
/// answering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardItem {
    card_id: String,
    ext_msg: Option<String>,
    state: CardState,
    encrypt_code: String,
    app_id: String,
}

/// Invoices share the card entry layout
pub type InvoiceItem = CardItem;

impl CardItem {
    pub fn new(card_id: impl Into<String>, ext_msg: Option<String>) -> Result<Self, ValidationError> {
        let item = Self {
            card_id: card_id.into(),
            ext_msg,
            ..Self::default()
        };
        item.validate()?;
        Ok(item)
    }

    /// Entry as returned by the host
    pub fn returned(
        card_id: impl Into<String>,
        ext_msg: Option<String>,
        state: CardState,
        encrypt_code: impl Into<String>,
        app_id: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            card_id: card_id.into(),
            ext_msg,
            state,
            encrypt_code: encrypt_code.into(),
            app_id: app_id.into(),
        };
        item.validate()?;
        Ok(item)
    }

    pub fn card_id(&self) -> &str {
        &self.card_id
    }

    pub fn ext_msg(&self) -> Option<&str> {
        self.ext_msg.as_deref()
    }

    pub fn state(&self) -> CardState {
        self.state
    }

    pub fn encrypt_code(&self) -> &str {
        &self.encrypt_code
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }
}

impl Validate for CardItem {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("card.card_id", &self.card_id, limits::IDENTIFIER)?;
        limits::optional("card.ext_msg", self.ext_msg.as_deref(), limits::CARD_EXT_MSG)?;
        limits::max_len("card.encrypt_code", &self.encrypt_code, limits::IDENTIFIER)?;
        limits::max_len("card.app_id", &self.app_id, limits::IDENTIFIER)
    }
}

pub(crate) fn validate_cards(field: &'static str, cards: &[CardItem]) -> Result<(), ValidationError> {
    limits::max_items(field, cards.len(), limits::CARD_COUNT)?;
    cards.iter().try_for_each(|card| card.validate())
}

/// Ask the host to authorize this app for `scope`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    scope: String,
    state: String,
}

impl AuthRequest {
    pub fn new(scope: impl Into<String>, state: impl Into<String>) -> Result<Self, ValidationError> {
        let request = Self {
            scope: scope.into(),
            state: state.into(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Opaque client nonce, echoed back in the response
    pub fn state(&self) -> &str {
        &self.state
    }
}

impl Validate for AuthRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len("scope", &self.scope, limits::AUTH_SCOPE)?;
        limits::max_len("state", &self.state, limits::AUTH_STATE)
    }
}

/// Share text or a media message through the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    content: MessageContent,
    scene: Scene,
    target: Option<String>,
}

impl SendMessageRequest {
    pub fn builder() -> SendMessageRequestBuilder {
        SendMessageRequestBuilder::default()
    }

    pub fn content(&self) -> &MessageContent {
        &self.content
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    /// Target id, present only for [`Scene::SpecifiedTarget`]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

impl Validate for SendMessageRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        self.content.validate()?;
        match (self.scene, self.target.as_deref()) {
            (Scene::SpecifiedTarget, Some(target)) => {
                limits::required("target", target, limits::TARGET_ID)
            }
            (Scene::SpecifiedTarget, None) => Err(ValidationError::Missing { field: "target" }),
            (_, Some(_)) => Err(ValidationError::NotAllowed {
                field: "target",
                condition: "for the specified-target scene",
            }),
            (_, None) => Ok(()),
        }
    }
}

/// Builder for SendMessageRequest
///
/// Set exactly one of [`text`](Self::text) or [`media`](Self::media).
#[derive(Debug, Default)]
pub struct SendMessageRequestBuilder {
    text: Option<String>,
    media: Option<MediaMessage>,
    scene: Scene,
    target: Option<String>,
}

impl SendMessageRequestBuilder {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn media(mut self, media: MediaMessage) -> Self {
        self.media = Some(media);
        self
    }

    pub fn scene(mut self, scene: Scene) -> Self {
        self.scene = scene;
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn build(self) -> Result<SendMessageRequest, ValidationError> {
        let request = SendMessageRequest {
            content: MessageContent::from_parts(self.text, self.media)?,
            scene: self.scene,
            target: self.target,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Open a temporary chat with `username`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenTempSessionRequest {
    username: String,
    session_from: String,
}

impl OpenTempSessionRequest {
    pub fn new(
        username: impl Into<String>,
        session_from: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            username: username.into(),
            session_from: session_from.into(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn session_from(&self) -> &str {
        &self.session_from
    }
}

impl Validate for OpenTempSessionRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("username", &self.username, limits::USERNAME)?;
        limits::max_len("session_from", &self.session_from, limits::SESSION_FROM)
    }
}

/// Open `url` in the host's browser
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWebviewRequest {
    url: String,
}

impl OpenWebviewRequest {
    pub fn new(url: impl Into<String>) -> Result<Self, ValidationError> {
        let request = Self { url: url.into() };
        request.validate()?;
        Ok(request)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Validate for OpenWebviewRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("url", &self.url, limits::WEBVIEW_URL)
    }
}

/// Open a business web page with query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBusinessWebviewRequest {
    business_type: u32,
    query: BTreeMap<String, String>,
}

impl OpenBusinessWebviewRequest {
    pub fn new(business_type: u32, query: BTreeMap<String, String>) -> Result<Self, ValidationError> {
        let request = Self {
            business_type,
            query,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn business_type(&self) -> u32 {
        self.business_type
    }

    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.query
    }
}

impl Validate for OpenBusinessWebviewRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        for (key, value) in &self.query {
            limits::required("query.key", key, limits::IDENTIFIER)?;
            limits::max_len("query.value", value, limits::IDENTIFIER)?;
        }
        Ok(())
    }
}

/// Open the hardware rank list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpenRankListRequest {}

impl OpenRankListRequest {
    pub fn new() -> Self {
        Self {}
    }
}

impl Validate for OpenRankListRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Jump to an official account profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpToBizProfileRequest {
    username: String,
    ext_msg: Option<String>,
    profile_type: ProfileType,
}

impl JumpToBizProfileRequest {
    pub fn new(
        username: impl Into<String>,
        ext_msg: Option<String>,
        profile_type: ProfileType,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            username: username.into(),
            ext_msg,
            profile_type,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn ext_msg(&self) -> Option<&str> {
        self.ext_msg.as_deref()
    }

    pub fn profile_type(&self) -> ProfileType {
        self.profile_type
    }
}

impl Validate for JumpToBizProfileRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("username", &self.username, limits::USERNAME)?;
        limits::optional("ext_msg", self.ext_msg.as_deref(), limits::EXT_MSG)
    }
}

/// Jump to the web version of an official account profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpToBizWebviewRequest {
    username: String,
    ext_msg: Option<String>,
    web_type: WebviewType,
}

impl JumpToBizWebviewRequest {
    pub fn new(
        username: impl Into<String>,
        ext_msg: Option<String>,
        web_type: WebviewType,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            username: username.into(),
            ext_msg,
            web_type,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn ext_msg(&self) -> Option<&str> {
        self.ext_msg.as_deref()
    }

    pub fn web_type(&self) -> WebviewType {
        self.web_type
    }
}

impl Validate for JumpToBizWebviewRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("username", &self.username, limits::USERNAME)?;
        limits::optional("ext_msg", self.ext_msg.as_deref(), limits::EXT_MSG)
    }
}

/// Add cards to the user's card package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCardToPackageRequest {
    cards: Vec<CardItem>,
}

impl AddCardToPackageRequest {
    pub fn new(cards: Vec<CardItem>) -> Result<Self, ValidationError> {
        let request = Self { cards };
        request.validate()?;
        Ok(request)
    }

    pub fn cards(&self) -> &[CardItem] {
        &self.cards
    }
}

impl Validate for AddCardToPackageRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.cards.is_empty() {
            return Err(ValidationError::Empty { field: "cards" });
        }
        validate_cards("cards", &self.cards)
    }
}

/// Let the user pick cards from the card package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChooseCardRequest {
    app_id: String,
    shop_id: u32,
    multi_select: bool,
    card_type: String,
    card_template_id: String,
    sign_type: String,
    card_sign: String,
    timestamp: u32,
    nonce: String,
}

impl ChooseCardRequest {
    pub fn builder(app_id: impl Into<String>) -> ChooseCardRequestBuilder {
        ChooseCardRequestBuilder {
            inner: Self {
                app_id: app_id.into(),
                shop_id: 0,
                multi_select: false,
                card_type: String::new(),
                card_template_id: String::new(),
                sign_type: String::new(),
                card_sign: String::new(),
                timestamp: 0,
                nonce: String::new(),
            },
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn shop_id(&self) -> u32 {
        self.shop_id
    }

    pub fn multi_select(&self) -> bool {
        self.multi_select
    }

    pub fn card_type(&self) -> &str {
        &self.card_type
    }

    pub fn card_template_id(&self) -> &str {
        &self.card_template_id
    }

    pub fn sign_type(&self) -> &str {
        &self.sign_type
    }

    pub fn card_sign(&self) -> &str {
        &self.card_sign
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

impl Validate for ChooseCardRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("app_id", &self.app_id, limits::IDENTIFIER)?;
        limits::max_len("card_type", &self.card_type, limits::IDENTIFIER)?;
        limits::max_len("card_template_id", &self.card_template_id, limits::IDENTIFIER)?;
        limits::max_len("sign_type", &self.sign_type, limits::IDENTIFIER)?;
        limits::max_len("card_sign", &self.card_sign, limits::IDENTIFIER)?;
        limits::max_len("nonce", &self.nonce, limits::IDENTIFIER)
    }
}

/// Builder for ChooseCardRequest
#[derive(Debug)]
pub struct ChooseCardRequestBuilder {
    inner: ChooseCardRequest,
}

impl ChooseCardRequestBuilder {
    pub fn shop_id(mut self, shop_id: u32) -> Self {
        self.inner.shop_id = shop_id;
        self
    }

    pub fn multi_select(mut self, enabled: bool) -> Self {
        self.inner.multi_select = enabled;
        self
    }

    pub fn card_type(mut self, card_type: impl Into<String>) -> Self {
        self.inner.card_type = card_type.into();
        self
    }

    pub fn card_template_id(mut self, id: impl Into<String>) -> Self {
        self.inner.card_template_id = id.into();
        self
    }

    pub fn signature(mut self, sign_type: impl Into<String>, card_sign: impl Into<String>) -> Self {
        self.inner.sign_type = sign_type.into();
        self.inner.card_sign = card_sign.into();
        self
    }

    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.inner.timestamp = timestamp;
        self
    }

    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.inner.nonce = nonce.into();
        self
    }

    pub fn build(self) -> Result<ChooseCardRequest, ValidationError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

/// Let the user pick invoices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChooseInvoiceRequest {
    app_id: String,
    shop_id: u32,
    sign_type: String,
    card_sign: String,
    timestamp: u32,
    nonce: String,
}

impl ChooseInvoiceRequest {
    pub fn builder(app_id: impl Into<String>) -> ChooseInvoiceRequestBuilder {
        ChooseInvoiceRequestBuilder {
            inner: Self {
                app_id: app_id.into(),
                shop_id: 0,
                sign_type: String::new(),
                card_sign: String::new(),
                timestamp: 0,
                nonce: String::new(),
            },
        }
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn shop_id(&self) -> u32 {
        self.shop_id
    }

    pub fn sign_type(&self) -> &str {
        &self.sign_type
    }

    pub fn card_sign(&self) -> &str {
        &self.card_sign
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

impl Validate for ChooseInvoiceRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("app_id", &self.app_id, limits::IDENTIFIER)?;
        limits::max_len("sign_type", &self.sign_type, limits::IDENTIFIER)?;
        limits::max_len("card_sign", &self.card_sign, limits::IDENTIFIER)?;
        limits::max_len("nonce", &self.nonce, limits::IDENTIFIER)
    }
}

/// Builder for ChooseInvoiceRequest
#[derive(Debug)]
pub struct ChooseInvoiceRequestBuilder {
    inner: ChooseInvoiceRequest,
}

impl ChooseInvoiceRequestBuilder {
    pub fn shop_id(mut self, shop_id: u32) -> Self {
        self.inner.shop_id = shop_id;
        self
    }

    pub fn signature(mut self, sign_type: impl Into<String>, card_sign: impl Into<String>) -> Self {
        self.inner.sign_type = sign_type.into();
        self.inner.card_sign = card_sign.into();
        self
    }

    pub fn timestamp(mut self, timestamp: u32) -> Self {
        self.inner.timestamp = timestamp;
        self
    }

    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.inner.nonce = nonce.into();
        self
    }

    pub fn build(self) -> Result<ChooseInvoiceRequest, ValidationError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

/// Ask the user to subscribe to a one-off template message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeMessageRequest {
    scene: u32,
    template_id: String,
    reserved: Option<String>,
}

impl SubscribeMessageRequest {
    pub fn new(
        scene: u32,
        template_id: impl Into<String>,
        reserved: Option<String>,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            scene,
            template_id: template_id.into(),
            reserved,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn scene(&self) -> u32 {
        self.scene
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn reserved(&self) -> Option<&str> {
        self.reserved.as_deref()
    }
}

impl Validate for SubscribeMessageRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("template_id", &self.template_id, limits::IDENTIFIER)?;
        limits::optional("reserved", self.reserved.as_deref(), limits::IDENTIFIER)
    }
}

/// Ask the user to subscribe to a mini program's messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeMiniProgramRequest {
    mini_program_app_id: String,
}

impl SubscribeMiniProgramRequest {
    pub fn new(mini_program_app_id: impl Into<String>) -> Result<Self, ValidationError> {
        let request = Self {
            mini_program_app_id: mini_program_app_id.into(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn mini_program_app_id(&self) -> &str {
        &self.mini_program_app_id
    }
}

impl Validate for SubscribeMiniProgramRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required(
            "mini_program_app_id",
            &self.mini_program_app_id,
            limits::IDENTIFIER,
        )
    }
}

/// Authorize inserting an invoice into the user's card package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceAuthInsertRequest {
    url: String,
}

impl InvoiceAuthInsertRequest {
    pub fn new(url: impl Into<String>) -> Result<Self, ValidationError> {
        let request = Self { url: url.into() };
        request.validate()?;
        Ok(request)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Validate for InvoiceAuthInsertRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("url", &self.url, limits::URL)
    }
}

/// Launch a mini program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchMiniProgramRequest {
    username: String,
    path: Option<String>,
    program_type: MiniProgramType,
    ext_msg: Option<String>,
}

impl LaunchMiniProgramRequest {
    pub fn builder(username: impl Into<String>) -> LaunchMiniProgramRequestBuilder {
        LaunchMiniProgramRequestBuilder {
            inner: Self {
                username: username.into(),
                path: None,
                program_type: MiniProgramType::Release,
                ext_msg: None,
            },
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn program_type(&self) -> MiniProgramType {
        self.program_type
    }

    /// JSON extra data handed to the mini program
    pub fn ext_msg(&self) -> Option<&str> {
        self.ext_msg.as_deref()
    }
}

impl Validate for LaunchMiniProgramRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("username", &self.username, limits::IDENTIFIER)?;
        limits::optional("path", self.path.as_deref(), limits::IDENTIFIER)?;
        limits::optional("ext_msg", self.ext_msg.as_deref(), limits::JSON_EXTRA)
    }
}

/// Builder for LaunchMiniProgramRequest
#[derive(Debug)]
pub struct LaunchMiniProgramRequestBuilder {
    inner: LaunchMiniProgramRequest,
}

impl LaunchMiniProgramRequestBuilder {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner.path = Some(path.into());
        self
    }

    pub fn program_type(mut self, program_type: MiniProgramType) -> Self {
        self.inner.program_type = program_type;
        self
    }

    pub fn ext_msg(mut self, ext_msg: impl Into<String>) -> Self {
        self.inner.ext_msg = Some(ext_msg.into());
        self
    }

    pub fn build(self) -> Result<LaunchMiniProgramRequest, ValidationError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

/// Open a business page in the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenBusinessViewRequest {
    business_type: String,
    query: Option<String>,
    ext_info: Option<String>,
}

impl OpenBusinessViewRequest {
    pub fn new(
        business_type: impl Into<String>,
        query: Option<String>,
        ext_info: Option<String>,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            business_type: business_type.into(),
            query,
            ext_info,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn business_type(&self) -> &str {
        &self.business_type
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn ext_info(&self) -> Option<&str> {
        self.ext_info.as_deref()
    }
}

impl Validate for OpenBusinessViewRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("business_type", &self.business_type, limits::IDENTIFIER)?;
        limits::optional("query", self.query.as_deref(), limits::JSON_EXTRA)?;
        limits::optional("ext_info", self.ext_info.as_deref(), limits::JSON_EXTRA)
    }
}

/// The host asks this app for content to share
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetMessageRequest {
    locale: Locale,
}

impl GetMessageRequest {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }
}

impl Validate for GetMessageRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        self.locale.validate()
    }
}

/// The host asks this app to display a media message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowMessageRequest {
    message: MediaMessage,
    locale: Locale,
}

impl ShowMessageRequest {
    pub fn new(message: MediaMessage, locale: Locale) -> Self {
        Self { message, locale }
    }

    pub fn message(&self) -> &MediaMessage {
        &self.message
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }
}

impl Validate for ShowMessageRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        self.message.validate()?;
        self.locale.validate()
    }
}

/// The host opened this app; never answered
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LaunchFromHostRequest {
    message: Option<MediaMessage>,
    locale: Locale,
}

impl LaunchFromHostRequest {
    pub fn new(message: Option<MediaMessage>, locale: Locale) -> Self {
        Self { message, locale }
    }

    pub fn message(&self) -> Option<&MediaMessage> {
        self.message.as_ref()
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }
}

impl Validate for LaunchFromHostRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(message) = &self.message {
            message.validate()?;
        }
        self.locale.validate()
    }
}

/// Request payload, one variant per [`Variant`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    Auth(AuthRequest),
    SendMessage(SendMessageRequest),
    OpenTempSession(OpenTempSessionRequest),
    OpenWebview(OpenWebviewRequest),
    OpenBusinessWebview(OpenBusinessWebviewRequest),
    OpenRankList(OpenRankListRequest),
    JumpToBizProfile(JumpToBizProfileRequest),
    JumpToBizWebview(JumpToBizWebviewRequest),
    AddCardToPackage(AddCardToPackageRequest),
    ChooseCard(ChooseCardRequest),
    ChooseInvoice(ChooseInvoiceRequest),
    SubscribeMessage(SubscribeMessageRequest),
    SubscribeMiniProgram(SubscribeMiniProgramRequest),
    InvoiceAuthInsert(InvoiceAuthInsertRequest),
    LaunchMiniProgram(LaunchMiniProgramRequest),
    OpenBusinessView(OpenBusinessViewRequest),
    GetMessage(GetMessageRequest),
    ShowMessage(ShowMessageRequest),
    LaunchFromHost(LaunchFromHostRequest),
}

macro_rules! request_variants {
    ($($variant:ident($body:ident)),* $(,)?) => {
        impl RequestBody {
            pub fn variant(&self) -> Variant {
                match self {
                    $(Self::$variant(_) => Variant::$variant,)*
                }
            }
        }

        impl Validate for RequestBody {
            fn validate(&self) -> Result<(), ValidationError> {
                match self {
                    $(Self::$variant(body) => body.validate(),)*
                }
            }
        }

        $(
            impl From<$body> for RequestBody {
                fn from(body: $body) -> Self {
                    Self::$variant(body)
                }
            }
        )*
    };
}

request_variants! {
    Auth(AuthRequest),
    SendMessage(SendMessageRequest),
    OpenTempSession(OpenTempSessionRequest),
    OpenWebview(OpenWebviewRequest),
    OpenBusinessWebview(OpenBusinessWebviewRequest),
    OpenRankList(OpenRankListRequest),
    JumpToBizProfile(JumpToBizProfileRequest),
    JumpToBizWebview(JumpToBizWebviewRequest),
    AddCardToPackage(AddCardToPackageRequest),
    ChooseCard(ChooseCardRequest),
    ChooseInvoice(ChooseInvoiceRequest),
    SubscribeMessage(SubscribeMessageRequest),
    SubscribeMiniProgram(SubscribeMiniProgramRequest),
    InvoiceAuthInsert(InvoiceAuthInsertRequest),
    LaunchMiniProgram(LaunchMiniProgramRequest),
    OpenBusinessView(OpenBusinessViewRequest),
    GetMessage(GetMessageRequest),
    ShowMessage(ShowMessageRequest),
    LaunchFromHost(LaunchFromHostRequest),
}

impl RequestBody {
    fn blobs_mut<'a>(&'a mut self, out: &mut Vec<BlobSlot<'a>>) {
        match self {
            Self::SendMessage(body) => body.content.blobs_mut(out),
            Self::ShowMessage(body) => body.message.blobs_mut(out),
            Self::LaunchFromHost(body) => {
                if let Some(message) = body.message.as_mut() {
                    message.blobs_mut(out);
                }
            }
            _ => {}
        }
    }
}

/// A validated request, immutable once built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    correlation_id: CorrelationId,
    body: RequestBody,
}

impl Request {
    pub fn new(
        correlation_id: CorrelationId,
        body: impl Into<RequestBody>,
    ) -> Result<Self, ValidationError> {
        let request = Self {
            correlation_id,
            body: body.into(),
        };
        request.validate()?;
        Ok(request)
    }

    pub(crate) fn from_parts_unchecked(correlation_id: CorrelationId, body: RequestBody) -> Self {
        Self {
            correlation_id,
            body,
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    pub fn into_body(self) -> RequestBody {
        self.body
    }

    pub fn variant(&self) -> Variant {
        self.body.variant()
    }

    pub(crate) fn blobs_mut<'a>(&'a mut self, out: &mut Vec<BlobSlot<'a>>) {
        self.body.blobs_mut(out);
    }
}

impl Validate for Request {
    fn validate(&self) -> Result<(), ValidationError> {
        self.correlation_id.validate()?;
        self.body.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextObject;

    fn media() -> MediaMessage {
        MediaMessage::builder()
            .object(TextObject::new("hello").unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_send_message_rejects_text_and_media() {
        let err = SendMessageRequest::builder()
            .text("hello")
            .media(media())
            .build()
            .unwrap_err();
        assert!(matches!(err, ValidationError::NotExactlyOne { .. }));
    }

    #[test]
    fn test_send_message_rejects_neither() {
        let err = SendMessageRequest::builder().build().unwrap_err();
        assert!(matches!(err, ValidationError::NotExactlyOne { .. }));
    }

    #[test]
    fn test_specified_target_requires_target() {
        let err = SendMessageRequest::builder()
            .text("hello")
            .scene(Scene::SpecifiedTarget)
            .build()
            .unwrap_err();
        assert_eq!(err, ValidationError::Missing { field: "target" });

        let request = SendMessageRequest::builder()
            .text("hello")
            .scene(Scene::SpecifiedTarget)
            .target("o-friend")
            .build()
            .unwrap();
        assert_eq!(request.target(), Some("o-friend"));
    }

    #[test]
    fn test_target_only_for_specified_scene() {
        let err = SendMessageRequest::builder()
            .text("hello")
            .scene(Scene::Timeline)
            .target("o-friend")
            .build()
            .unwrap_err();
        assert_eq!(err.field(), "target");
    }

    #[test]
    fn test_text_bounds() {
        assert!(SendMessageRequest::builder().text("").build().is_err());
        assert!(
            SendMessageRequest::builder()
                .text("x".repeat(limits::TEXT))
                .build()
                .is_ok()
        );
        let err = SendMessageRequest::builder()
            .text("x".repeat(limits::TEXT + 1))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "text",
                limit: limits::TEXT,
                actual: limits::TEXT + 1
            }
        );
    }

    #[test]
    fn test_auth_state_ceiling() {
        assert!(AuthRequest::new("snsapi_userinfo", "s".repeat(limits::AUTH_STATE)).is_ok());
        let err = AuthRequest::new("snsapi_userinfo", "s".repeat(limits::AUTH_STATE + 1)).unwrap_err();
        assert_eq!(err.field(), "state");
    }

    #[test]
    fn test_session_from_ceiling() {
        assert!(OpenTempSessionRequest::new("gh_1", "x".repeat(limits::SESSION_FROM)).is_ok());
        let err = OpenTempSessionRequest::new("gh_1", "x".repeat(limits::SESSION_FROM + 1))
            .unwrap_err();
        assert_eq!(err.field(), "session_from");
    }

    #[test]
    fn test_card_count_ceiling() {
        let cards: Vec<_> = (0..=limits::CARD_COUNT)
            .map(|i| CardItem::new(format!("card-{i}"), None).unwrap())
            .collect();
        let err = AddCardToPackageRequest::new(cards).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooMany {
                field: "cards",
                limit: limits::CARD_COUNT,
                actual: limits::CARD_COUNT + 1
            }
        );
        assert!(AddCardToPackageRequest::new(Vec::new()).is_err());
    }

    #[test]
    fn test_request_reports_variant() {
        let request = Request::new(
            CorrelationId::new("o-1").unwrap(),
            AuthRequest::new("snsapi_base", "n").unwrap(),
        )
        .unwrap();
        assert_eq!(request.variant(), Variant::Auth);
        assert_eq!(request.correlation_id().as_str(), "o-1");
    }

    #[test]
    fn test_choose_card_builder() {
        let request = ChooseCardRequest::builder("wx-app")
            .shop_id(7)
            .multi_select(true)
            .card_type("GROUPON")
            .signature("SHA1", "abc")
            .timestamp(1_700_000_000)
            .nonce("n0")
            .build()
            .unwrap();
        assert!(request.multi_select());
        assert_eq!(request.sign_type(), "SHA1");
        assert!(ChooseCardRequest::builder("").build().is_err());
    }
}
