//! Media messages and the objects they carry
//!
//! A [`MediaMessage`] wraps exactly one [`MediaObject`] plus presentation
//! fields (title, description, thumbnail). Both are validated when built and
//! cannot be changed afterwards.
//!
//! ```rust,ignore
//! use hostbridge::{MediaMessage, MediaObject, WebpageObject};
//!
//! let message = MediaMessage::builder()
//!     .title("Release notes")
//!     .description("What changed in 2.0")
//!     .object(WebpageObject::new("https://example.com/notes")?)
//!     .build()?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::Validate;
use crate::model::blob::{Blob, BlobSlot};
use crate::model::limits;

/// Mini program build flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MiniProgramType {
    #[default]
    Release,
    Test,
    Preview,
}

impl From<MiniProgramType> for u8 {
    fn from(value: MiniProgramType) -> Self {
        match value {
            MiniProgramType::Release => 0,
            MiniProgramType::Test => 1,
            MiniProgramType::Preview => 2,
        }
    }
}

impl TryFrom<u8> for MiniProgramType {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Release),
            1 => Ok(Self::Test),
            2 => Ok(Self::Preview),
            other => Err(ValidationError::UnknownCode {
                field: "mini_program_type",
                value: other.into(),
            }),
        }
    }
}

/// Image bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageObject {
    data: Blob,
}

impl ImageObject {
    pub fn new(data: impl Into<Vec<u8>>) -> Result<Self, ValidationError> {
        let object = Self {
            data: Blob::new(data),
        };
        object.validate()?;
        Ok(object)
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl Validate for ImageObject {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.data.is_empty() {
            return Err(ValidationError::Empty { field: "image.data" });
        }
        limits::max_bytes("image.data", self.data.len(), limits::IMAGE_DATA)
    }
}

/// Music link; at least one of `url` / `low_band_url` must be set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MusicObject {
    url: String,
    low_band_url: String,
    data_url: String,
    low_band_data_url: String,
}

impl MusicObject {
    pub fn new(
        url: impl Into<String>,
        low_band_url: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        Self::with_data_urls(url, low_band_url, "", "")
    }

    pub fn with_data_urls(
        url: impl Into<String>,
        low_band_url: impl Into<String>,
        data_url: impl Into<String>,
        low_band_data_url: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let object = Self {
            url: url.into(),
            low_band_url: low_band_url.into(),
            data_url: data_url.into(),
            low_band_data_url: low_band_data_url.into(),
        };
        object.validate()?;
        Ok(object)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn low_band_url(&self) -> &str {
        &self.low_band_url
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    pub fn low_band_data_url(&self) -> &str {
        &self.low_band_data_url
    }
}

impl Validate for MusicObject {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() && self.low_band_url.is_empty() {
            return Err(ValidationError::AllEmpty {
                fields: "music.url, music.low_band_url",
            });
        }
        limits::max_len("music.url", &self.url, limits::URL)?;
        limits::max_len("music.low_band_url", &self.low_band_url, limits::URL)?;
        limits::max_len("music.data_url", &self.data_url, limits::URL)?;
        limits::max_len(
            "music.low_band_data_url",
            &self.low_band_data_url,
            limits::URL,
        )
    }
}

/// Video link; at least one of `url` / `low_band_url` must be set
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoObject {
    url: String,
    low_band_url: String,
}

impl VideoObject {
    pub fn new(
        url: impl Into<String>,
        low_band_url: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let object = Self {
            url: url.into(),
            low_band_url: low_band_url.into(),
        };
        object.validate()?;
        Ok(object)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn low_band_url(&self) -> &str {
        &self.low_band_url
    }
}

impl Validate for VideoObject {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() && self.low_band_url.is_empty() {
            return Err(ValidationError::AllEmpty {
                fields: "video.url, video.low_band_url",
            });
        }
        limits::max_len("video.url", &self.url, limits::URL)?;
        limits::max_len("video.low_band_url", &self.low_band_url, limits::URL)
    }
}

/// Web page link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebpageObject {
    url: String,
}

impl WebpageObject {
    pub fn new(url: impl Into<String>) -> Result<Self, ValidationError> {
        let object = Self { url: url.into() };
        object.validate()?;
        Ok(object)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Validate for WebpageObject {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("webpage.url", &self.url, limits::URL)
    }
}

/// App-defined payload the host hands back to this app when opened
///
/// At least one of `url`, `ext_info` or `file_data` must be non-empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AppExtendObject {
    url: String,
    ext_info: Option<String>,
    file_data: Option<Blob>,
}

impl AppExtendObject {
    pub fn new(
        url: impl Into<String>,
        ext_info: Option<String>,
        file_data: Option<Vec<u8>>,
    ) -> Result<Self, ValidationError> {
        let object = Self {
            url: url.into(),
            ext_info,
            file_data: file_data.map(Blob::new),
        };
        object.validate()?;
        Ok(object)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ext_info(&self) -> Option<&str> {
        self.ext_info.as_deref()
    }

    pub fn file_data(&self) -> Option<&[u8]> {
        self.file_data.as_ref().map(Blob::as_slice)
    }
}

impl Validate for AppExtendObject {
    fn validate(&self) -> Result<(), ValidationError> {
        let ext_empty = self.ext_info.as_deref().is_none_or(str::is_empty);
        let file_empty = self.file_data.as_ref().is_none_or(Blob::is_empty);
        if self.url.is_empty() && ext_empty && file_empty {
            return Err(ValidationError::AllEmpty {
                fields: "app_extend.url, app_extend.ext_info, app_extend.file_data",
            });
        }
        limits::max_len("app_extend.url", &self.url, limits::URL)?;
        limits::optional(
            "app_extend.ext_info",
            self.ext_info.as_deref(),
            limits::APP_EXT_INFO,
        )?;
        if let Some(data) = &self.file_data {
            limits::max_bytes("app_extend.file_data", data.len(), limits::APP_FILE_DATA)?;
        }
        Ok(())
    }
}

/// Emoticon bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmoticonObject {
    data: Blob,
}

impl EmoticonObject {
    pub fn new(data: impl Into<Vec<u8>>) -> Result<Self, ValidationError> {
        let object = Self {
            data: Blob::new(data),
        };
        object.validate()?;
        Ok(object)
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl Validate for EmoticonObject {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.data.is_empty() {
            return Err(ValidationError::Empty {
                field: "emoticon.data",
            });
        }
        limits::max_bytes("emoticon.data", self.data.len(), limits::EMOTICON_DATA)
    }
}

/// File contents plus extension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileObject {
    extension: String,
    data: Blob,
}

impl FileObject {
    pub fn new(
        extension: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Result<Self, ValidationError> {
        let object = Self {
            extension: extension.into(),
            data: Blob::new(data),
        };
        object.validate()?;
        Ok(object)
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }
}

impl Validate for FileObject {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len("file.extension", &self.extension, limits::FILE_EXTENSION)?;
        if self.data.is_empty() {
            return Err(ValidationError::Empty { field: "file.data" });
        }
        limits::max_bytes("file.data", self.data.len(), limits::FILE_DATA)
    }
}

/// A point on the map
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationObject {
    lat: f64,
    lng: f64,
}

impl LocationObject {
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        let object = Self { lat, lng };
        object.validate()?;
        Ok(object)
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl Validate for LocationObject {
    fn validate(&self) -> Result<(), ValidationError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(ValidationError::OutOfRange {
                field: "location.lat",
                value: self.lat.to_string(),
            });
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(ValidationError::OutOfRange {
                field: "location.lng",
                value: self.lng.to_string(),
            });
        }
        Ok(())
    }
}

/// Plain text carried as a media object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextObject {
    text: String,
}

impl TextObject {
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationError> {
        let object = Self { text: text.into() };
        object.validate()?;
        Ok(object)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Validate for TextObject {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::required("text_object.text", &self.text, limits::TEXT)
    }
}

/// Mini program card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiniProgramObject {
    webpage_url: String,
    username: String,
    path: Option<String>,
    hd_image: Option<Blob>,
    with_share_ticket: bool,
    program_type: MiniProgramType,
}

impl MiniProgramObject {
    pub fn builder(
        webpage_url: impl Into<String>,
        username: impl Into<String>,
    ) -> MiniProgramObjectBuilder {
        MiniProgramObjectBuilder {
            inner: Self {
                webpage_url: webpage_url.into(),
                username: username.into(),
                path: None,
                hd_image: None,
                with_share_ticket: false,
                program_type: MiniProgramType::Release,
            },
        }
    }

    pub fn webpage_url(&self) -> &str {
        &self.webpage_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn hd_image(&self) -> Option<&[u8]> {
        self.hd_image.as_ref().map(Blob::as_slice)
    }

    pub fn with_share_ticket(&self) -> bool {
        self.with_share_ticket
    }

    pub fn program_type(&self) -> MiniProgramType {
        self.program_type
    }
}

impl Validate for MiniProgramObject {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len(
            "mini_program.webpage_url",
            &self.webpage_url,
            limits::MINI_PROGRAM_URL,
        )?;
        limits::required("mini_program.username", &self.username, limits::IDENTIFIER)?;
        limits::optional("mini_program.path", self.path.as_deref(), limits::IDENTIFIER)?;
        if let Some(image) = &self.hd_image {
            limits::max_bytes(
                "mini_program.hd_image",
                image.len(),
                limits::MINI_PROGRAM_IMAGE,
            )?;
        }
        Ok(())
    }
}

/// Builder for MiniProgramObject
#[derive(Debug)]
pub struct MiniProgramObjectBuilder {
    inner: MiniProgramObject,
}

impl MiniProgramObjectBuilder {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.inner.path = Some(path.into());
        self
    }

    pub fn hd_image(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.inner.hd_image = Some(Blob::new(data));
        self
    }

    pub fn with_share_ticket(mut self, enabled: bool) -> Self {
        self.inner.with_share_ticket = enabled;
        self
    }

    pub fn program_type(mut self, program_type: MiniProgramType) -> Self {
        self.inner.program_type = program_type;
        self
    }

    pub fn build(self) -> Result<MiniProgramObject, ValidationError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}

/// The single content object of a media message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaObject {
    Image(ImageObject),
    Music(MusicObject),
    Video(VideoObject),
    Webpage(WebpageObject),
    AppExtend(AppExtendObject),
    Emoticon(EmoticonObject),
    File(FileObject),
    Location(LocationObject),
    Text(TextObject),
    MiniProgram(MiniProgramObject),
}

impl MediaObject {
    /// Short name of the object kind, used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Music(_) => "music",
            Self::Video(_) => "video",
            Self::Webpage(_) => "webpage",
            Self::AppExtend(_) => "app_extend",
            Self::Emoticon(_) => "emoticon",
            Self::File(_) => "file",
            Self::Location(_) => "location",
            Self::Text(_) => "text",
            Self::MiniProgram(_) => "mini_program",
        }
    }

    fn blobs_mut<'a>(&'a mut self, out: &mut Vec<BlobSlot<'a>>) {
        match self {
            Self::Image(object) => out.push(BlobSlot {
                field: "image.data",
                blob: &mut object.data,
            }),
            Self::AppExtend(object) => {
                if let Some(blob) = object.file_data.as_mut() {
                    out.push(BlobSlot {
                        field: "app_extend.file_data",
                        blob,
                    });
                }
            }
            Self::Emoticon(object) => out.push(BlobSlot {
                field: "emoticon.data",
                blob: &mut object.data,
            }),
            Self::File(object) => out.push(BlobSlot {
                field: "file.data",
                blob: &mut object.data,
            }),
            Self::MiniProgram(object) => {
                if let Some(blob) = object.hd_image.as_mut() {
                    out.push(BlobSlot {
                        field: "mini_program.hd_image",
                        blob,
                    });
                }
            }
            Self::Music(_) | Self::Video(_) | Self::Webpage(_) | Self::Location(_) | Self::Text(_) => {}
        }
    }
}

impl Validate for MediaObject {
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Image(object) => object.validate(),
            Self::Music(object) => object.validate(),
            Self::Video(object) => object.validate(),
            Self::Webpage(object) => object.validate(),
            Self::AppExtend(object) => object.validate(),
            Self::Emoticon(object) => object.validate(),
            Self::File(object) => object.validate(),
            Self::Location(object) => object.validate(),
            Self::Text(object) => object.validate(),
            Self::MiniProgram(object) => object.validate(),
        }
    }
}

macro_rules! impl_from_object {
    ($($object:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$object> for MediaObject {
                fn from(object: $object) -> Self {
                    Self::$variant(object)
                }
            }
        )*
    };
}

impl_from_object! {
    ImageObject => Image,
    MusicObject => Music,
    VideoObject => Video,
    WebpageObject => Webpage,
    AppExtendObject => AppExtend,
    EmoticonObject => Emoticon,
    FileObject => File,
    LocationObject => Location,
    TextObject => Text,
    MiniProgramObject => MiniProgram,
}

/// Composite payload of a media share
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMessage {
    title: String,
    description: String,
    thumbnail: Option<Blob>,
    thumbnail_from_image: bool,
    media_tag_name: Option<String>,
    message_ext: Option<String>,
    message_action: Option<String>,
    object: MediaObject,
}

impl MediaMessage {
    /// Create a new builder for MediaMessage
    pub fn builder() -> MediaMessageBuilder {
        MediaMessageBuilder::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_ref().map(Blob::as_slice)
    }

    /// Whether the thumbnail came through the image conversion path
    pub fn thumbnail_from_image(&self) -> bool {
        self.thumbnail_from_image
    }

    pub fn media_tag_name(&self) -> Option<&str> {
        self.media_tag_name.as_deref()
    }

    pub fn message_ext(&self) -> Option<&str> {
        self.message_ext.as_deref()
    }

    pub fn message_action(&self) -> Option<&str> {
        self.message_action.as_deref()
    }

    pub fn object(&self) -> &MediaObject {
        &self.object
    }

    pub(crate) fn blobs_mut<'a>(&'a mut self, out: &mut Vec<BlobSlot<'a>>) {
        if let Some(blob) = self.thumbnail.as_mut() {
            out.push(BlobSlot {
                field: "media.thumbnail",
                blob,
            });
        }
        self.object.blobs_mut(out);
    }
}

impl Validate for MediaMessage {
    fn validate(&self) -> Result<(), ValidationError> {
        limits::max_len("media.title", &self.title, limits::TITLE)?;
        limits::max_len("media.description", &self.description, limits::DESCRIPTION)?;
        if let Some(thumbnail) = &self.thumbnail {
            let limit = if self.thumbnail_from_image {
                limits::THUMBNAIL_FROM_IMAGE
            } else {
                limits::THUMBNAIL
            };
            limits::max_bytes("media.thumbnail", thumbnail.len(), limit)?;
        }
        limits::optional(
            "media.media_tag_name",
            self.media_tag_name.as_deref(),
            limits::MEDIA_TAG_NAME,
        )?;
        limits::optional(
            "media.message_ext",
            self.message_ext.as_deref(),
            limits::MESSAGE_EXT,
        )?;
        limits::optional(
            "media.message_action",
            self.message_action.as_deref(),
            limits::MESSAGE_EXT,
        )?;
        self.object.validate()
    }
}

/// Builder for MediaMessage
///
/// Exactly one object must be supplied; calling [`object`](Self::object)
/// twice makes [`build`](Self::build) fail.
#[derive(Debug, Default)]
pub struct MediaMessageBuilder {
    title: String,
    description: String,
    thumbnail: Option<Blob>,
    thumbnail_from_image: bool,
    media_tag_name: Option<String>,
    message_ext: Option<String>,
    message_action: Option<String>,
    object: Option<MediaObject>,
    extra_objects: usize,
}

impl MediaMessageBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Thumbnail bytes supplied as-is (32 KB ceiling)
    pub fn thumbnail(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.thumbnail = Some(Blob::new(data));
        self.thumbnail_from_image = false;
        self
    }

    /// Thumbnail produced by an image conversion (64 KB ceiling)
    pub fn thumbnail_image(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.thumbnail = Some(Blob::new(data));
        self.thumbnail_from_image = true;
        self
    }

    pub fn media_tag_name(mut self, name: impl Into<String>) -> Self {
        self.media_tag_name = Some(name.into());
        self
    }

    pub fn message_ext(mut self, ext: impl Into<String>) -> Self {
        self.message_ext = Some(ext.into());
        self
    }

    pub fn message_action(mut self, action: impl Into<String>) -> Self {
        self.message_action = Some(action.into());
        self
    }

    pub fn object(mut self, object: impl Into<MediaObject>) -> Self {
        if self.object.is_some() {
            self.extra_objects += 1;
        } else {
            self.object = Some(object.into());
        }
        self
    }

    pub fn build(self) -> Result<MediaMessage, ValidationError> {
        if self.extra_objects > 0 {
            return Err(ValidationError::Duplicate {
                field: "media.object",
            });
        }
        let object = self.object.ok_or(ValidationError::Missing {
            field: "media.object",
        })?;
        let message = MediaMessage {
            title: self.title,
            description: self.description,
            thumbnail: self.thumbnail,
            thumbnail_from_image: self.thumbnail_from_image,
            media_tag_name: self.media_tag_name,
            message_ext: self.message_ext,
            message_action: self.message_action,
            object,
        };
        message.validate()?;
        Ok(message)
    }
}
