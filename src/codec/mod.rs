//! Message codec
//!
//! Maps a [`Message`] to the opaque [`TransportPayload`] handed to the host
//! launch mechanism and back. Both directions re-validate every field, so a
//! decoded message is always as valid as one built by application code.
//!
//! # Example
//!
//! ```rust,ignore
//! use hostbridge::{AuthRequest, Codec, CodecLimits, CorrelationId, Request};
//!
//! let codec = Codec::new(CodecLimits::default());
//! let request = Request::new(
//!     CorrelationId::new("o-user")?,
//!     AuthRequest::new("snsapi_userinfo", "nonce-1")?,
//! )?;
//!
//! let payload = codec.encode(&request.clone().into())?;
//! assert_eq!(codec.decode(payload.as_bytes())?, request.into());
//! ```

mod attachment;
mod frame;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DecodingError, EncodingError, Result};
use crate::model::blob::Blob;
use crate::model::{Message, Validate};

pub use attachment::{AttachmentStore, MemoryAttachments};
pub use frame::PROTOCOL_VERSION;

/// Size ceilings applied by the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecLimits {
    /// Largest payload, and largest single binary field, the transport accepts
    pub max_payload_bytes: usize,
    /// Binary fields above this size are offered to the attachment store
    pub inline_attachment_limit: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_payload_bytes: 32 * 1024 * 1024,
            inline_attachment_limit: 1024 * 1024,
        }
    }
}

/// Encoded message as handed to the launch collaborator
#[derive(Clone, PartialEq, Eq)]
pub struct TransportPayload(Vec<u8>);

impl TransportPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for TransportPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for TransportPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for TransportPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransportPayload({} bytes)", self.0.len())
    }
}

/// Stateless encoder/decoder, optionally backed by an attachment store
#[derive(Clone, Default)]
pub struct Codec {
    limits: CodecLimits,
    attachments: Option<Arc<dyn AttachmentStore>>,
}

impl Codec {
    pub fn new(limits: CodecLimits) -> Self {
        Self {
            limits,
            attachments: None,
        }
    }

    /// Route large binary fields through `store`
    pub fn with_attachments(mut self, store: Arc<dyn AttachmentStore>) -> Self {
        self.attachments = Some(store);
        self
    }

    pub fn limits(&self) -> &CodecLimits {
        &self.limits
    }

    /// Encode a message into a transport payload
    pub fn encode(&self, message: &Message) -> Result<TransportPayload, EncodingError> {
        message.validate()?;

        let mut message = message.clone();
        for slot in message.blobs_mut() {
            let len = slot.blob.len();
            if len > self.limits.max_payload_bytes {
                return Err(EncodingError::FieldTooLarge {
                    field: slot.field,
                    limit: self.limits.max_payload_bytes,
                    actual: len,
                });
            }

            if len <= self.limits.inline_attachment_limit {
                continue;
            }
            let Some(store) = &self.attachments else {
                continue;
            };
            if let Some(reference) = store.detach(slot.field, slot.blob.as_slice()) {
                tracing::debug!(field = slot.field, len, %reference, "detached binary field");
                *slot.blob = Blob::Detached { reference, len };
            }
        }

        let bytes = frame::write(&message)?;
        if bytes.len() > self.limits.max_payload_bytes {
            return Err(EncodingError::PayloadTooLarge {
                limit: self.limits.max_payload_bytes,
                actual: bytes.len(),
            });
        }

        tracing::debug!(
            variant = %message.variant(),
            kind = message.kind().as_str(),
            correlation_id = %message.correlation_id(),
            bytes = bytes.len(),
            "encoded message"
        );
        Ok(TransportPayload(bytes))
    }

    /// Decode a transport payload
    ///
    /// The variant tag is read before anything else: tags this build does not
    /// know fail with [`Error::UnsupportedVariant`](crate::Error::UnsupportedVariant).
    /// Pure; never calls back into the host.
    pub fn decode(&self, payload: &[u8]) -> Result<Message> {
        if payload.len() > self.limits.max_payload_bytes {
            return Err(DecodingError::PayloadTooLarge {
                limit: self.limits.max_payload_bytes,
                actual: payload.len(),
            }
            .into());
        }

        let raw = frame::RawFrame::parse(payload)?;
        let mut message = frame::read(&raw)?;
        self.resolve_attachments(&mut message)?;
        message.validate().map_err(DecodingError::from)?;

        tracing::debug!(
            variant = %message.variant(),
            kind = message.kind().as_str(),
            correlation_id = %message.correlation_id(),
            "decoded message"
        );
        Ok(message)
    }

    fn resolve_attachments(&self, message: &mut Message) -> Result<(), DecodingError> {
        for slot in message.blobs_mut() {
            let Blob::Detached { reference, len } = &*slot.blob else {
                continue;
            };

            let data = self
                .attachments
                .as_ref()
                .and_then(|store| store.take(reference))
                .ok_or_else(|| DecodingError::MissingAttachment {
                    field: slot.field,
                    reference: reference.clone(),
                })?;

            if data.len() != *len {
                return Err(DecodingError::AttachmentLength {
                    field: slot.field,
                    declared: *len,
                    actual: data.len(),
                });
            }
            *slot.blob = Blob::Inline(data);
        }
        Ok(())
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("limits", &self.limits)
            .field("attachments", &self.attachments.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::model::*;

    fn id() -> CorrelationId {
        CorrelationId::new("o-user").unwrap()
    }

    fn roundtrip(codec: &Codec, message: Message) {
        let payload = codec.encode(&message).unwrap();
        assert_eq!(codec.decode(payload.as_bytes()).unwrap(), message);
    }

    fn media(object: impl Into<MediaObject>) -> MediaMessage {
        MediaMessage::builder()
            .title("title")
            .description("description")
            .object(object)
            .build()
            .unwrap()
    }

    fn send(object: impl Into<MediaObject>) -> Message {
        let body = SendMessageRequest::builder()
            .media(media(object))
            .scene(Scene::Timeline)
            .build()
            .unwrap();
        Request::new(id(), body).unwrap().into()
    }

    #[test]
    fn test_every_media_object_roundtrips() {
        let codec = Codec::default();
        let objects: Vec<MediaObject> = vec![
            ImageObject::new(vec![1, 2, 3]).unwrap().into(),
            MusicObject::new("https://music.example/a", "").unwrap().into(),
            VideoObject::new("", "https://video.example/low").unwrap().into(),
            WebpageObject::new("https://example.com").unwrap().into(),
            AppExtendObject::new("", Some("ext".into()), None)
                .unwrap()
                .into(),
            EmoticonObject::new(vec![9; 16]).unwrap().into(),
            FileObject::new("pdf", vec![7; 32]).unwrap().into(),
            LocationObject::new(31.2304, 121.4737).unwrap().into(),
            TextObject::new("plain").unwrap().into(),
            MiniProgramObject::builder("https://example.com/fallback", "gh_abc")
                .path("pages/index")
                .hd_image(vec![5; 8])
                .build()
                .unwrap()
                .into(),
        ];

        for object in objects {
            roundtrip(&codec, send(object));
        }
    }

    #[test]
    fn test_response_roundtrip() {
        let codec = Codec::default();
        let response = Response::success(
            id(),
            AuthResponse::new(Some("abc".into()), Some("nonce-1".into()), Locale::default())
                .unwrap(),
        )
        .unwrap();
        roundtrip(&codec, response.into());

        let failure =
            Response::failure(id(), Variant::ChooseCard, ErrorCode::UserCancelled, "cancelled")
                .unwrap();
        roundtrip(&codec, failure.into());
    }

    #[test]
    fn test_unknown_tag_is_unsupported_variant() {
        let mut payload = vec![PROTOCOL_VERSION, 0, 8];
        payload.extend_from_slice(b"teleport");
        payload.push(0x80);

        let err = Codec::default().decode(&payload).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVariant(tag) if tag == "teleport"));
    }

    #[test]
    fn test_oversize_field_is_rejected() {
        let codec = Codec::new(CodecLimits {
            max_payload_bytes: 64,
            inline_attachment_limit: 16,
        });
        let err = codec
            .encode(&send(ImageObject::new(vec![0; 128]).unwrap()))
            .unwrap_err();
        assert!(matches!(
            err,
            EncodingError::FieldTooLarge {
                field: "image.data",
                limit: 64,
                actual: 128
            }
        ));
    }

    #[test]
    fn test_oversize_payload_is_rejected() {
        let codec = Codec::new(CodecLimits {
            max_payload_bytes: 32,
            inline_attachment_limit: 16,
        });
        let message = Request::new(id(), AuthRequest::new("s".repeat(64), "n").unwrap())
            .unwrap()
            .into();
        assert!(matches!(
            codec.encode(&message),
            Err(EncodingError::PayloadTooLarge { limit: 32, .. })
        ));

        assert!(matches!(
            codec.decode(&[0; 33]),
            Err(Error::Decoding(DecodingError::PayloadTooLarge { .. }))
        ));
    }

    #[test]
    fn test_large_fields_detach_through_store() {
        let store = Arc::new(MemoryAttachments::new());
        let codec = Codec::new(CodecLimits {
            max_payload_bytes: 4096,
            inline_attachment_limit: 256,
        })
        .with_attachments(store.clone());

        let message = send(FileObject::new("bin", vec![3; 2048]).unwrap());
        let payload = codec.encode(&message).unwrap();

        assert_eq!(store.len(), 1);
        assert!(payload.len() < 2048);
        assert_eq!(codec.decode(payload.as_bytes()).unwrap(), message);
        assert!(store.is_empty());

        // the attachment was released by the first decode
        let err = codec.decode(payload.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Decoding(DecodingError::MissingAttachment { .. })
        ));
    }

    #[test]
    fn test_detached_reference_needs_store() {
        let store = Arc::new(MemoryAttachments::new());
        let limits = CodecLimits {
            max_payload_bytes: 4096,
            inline_attachment_limit: 256,
        };
        let payload = Codec::new(limits)
            .with_attachments(store)
            .encode(&send(FileObject::new("bin", vec![3; 1024]).unwrap()))
            .unwrap();

        let err = Codec::new(limits).decode(payload.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            Error::Decoding(DecodingError::MissingAttachment {
                field: "file.data",
                ..
            })
        ));
    }

    #[test]
    fn test_decode_revalidates_fields() {
        // Hand-built body with a scope one byte over its ceiling
        #[derive(Serialize)]
        struct Auth {
            scope: String,
            state: String,
        }
        #[derive(Serialize)]
        struct Frame {
            correlation_id: &'static str,
            body: Auth,
        }

        let body = rmp_serde::to_vec_named(&Frame {
            correlation_id: "o-user",
            body: Auth {
                scope: "s".repeat(limits::AUTH_SCOPE + 1),
                state: "nonce".into(),
            },
        })
        .unwrap();
        let mut payload = vec![PROTOCOL_VERSION, 0, 4];
        payload.extend_from_slice(b"auth");
        payload.extend_from_slice(&body);

        let err = Codec::default().decode(&payload).unwrap_err();
        match err {
            Error::Decoding(DecodingError::Invalid(e)) => assert_eq!(e.field(), "scope"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
