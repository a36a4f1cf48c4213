//! Out-of-band storage for large binary fields

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Hook the transport provides to move large binary fields out of a payload
///
/// On encode the codec offers every binary field above the inline limit to
/// [`detach`](Self::detach); returning `None` keeps the bytes inline. On
/// decode each detached reference is claimed through [`take`](Self::take),
/// which releases the stored bytes: a reference resolves at most once.
pub trait AttachmentStore: Send + Sync {
    /// Store `data` and return a reference that travels in its place
    fn detach(&self, field: &str, data: &[u8]) -> Option<String>;

    /// Claim the bytes behind a reference produced by `detach`
    fn take(&self, reference: &str) -> Option<Vec<u8>>;
}

/// Process-local attachment store
#[derive(Debug, Default)]
pub struct MemoryAttachments {
    next: AtomicU64,
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attachments currently held
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AttachmentStore for MemoryAttachments {
    fn detach(&self, field: &str, data: &[u8]) -> Option<String> {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        let reference = format!("mem:{field}:{id}");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.clone(), data.to_vec());
        Some(reference)
    }

    fn take(&self, reference: &str) -> Option<Vec<u8>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(reference)
    }
}
