use serde::{Deserialize, Serialize};

/// Binary field contents
///
/// Messages built by application code always hold `Inline` bytes. `Detached`
/// only exists on the wire, when the attachment hook moved the bytes out of
/// the payload and left a reference behind; the codec resolves it before
/// handing a decoded message out.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Blob {
    Inline(#[serde(with = "serde_bytes")] Vec<u8>),
    Detached { reference: String, len: usize },
}

impl Blob {
    pub(crate) fn new(data: impl Into<Vec<u8>>) -> Self {
        Self::Inline(data.into())
    }

    /// Length in bytes, as declared for detached blobs
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Inline(data) => data.len(),
            Self::Detached { len, .. } => *len,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            Self::Inline(data) => data,
            Self::Detached { .. } => &[],
        }
    }
}

impl Default for Blob {
    fn default() -> Self {
        Self::Inline(Vec::new())
    }
}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never dump raw bytes into logs
        match self {
            Self::Inline(data) => write!(f, "Blob({} bytes)", data.len()),
            Self::Detached { reference, len } => {
                write!(f, "Blob(detached {reference:?}, {len} bytes)")
            }
        }
    }
}

/// A mutable view of one binary field, used by the codec's attachment pass
pub(crate) struct BlobSlot<'a> {
    pub field: &'static str,
    pub blob: &'a mut Blob,
}
