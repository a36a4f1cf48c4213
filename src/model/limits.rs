//! Field ceilings and the checks that enforce them
//!
//! All limits are in bytes (UTF-8 bytes for strings) unless noted.

use crate::error::ValidationError;

const KB: usize = 1024;
const MB: usize = 1024 * 1024;

pub const CORRELATION_ID: usize = KB;
pub const ERROR_MESSAGE: usize = 2 * KB;
pub const LOCALE: usize = 32;

pub const AUTH_SCOPE: usize = KB;
pub const AUTH_STATE: usize = KB;

pub const TEXT: usize = 10 * KB;
pub const TARGET_ID: usize = KB;

pub const TITLE: usize = 512;
pub const DESCRIPTION: usize = KB;
pub const THUMBNAIL: usize = 32 * KB;
pub const THUMBNAIL_FROM_IMAGE: usize = 64 * KB;
pub const MEDIA_TAG_NAME: usize = 64;
pub const MESSAGE_EXT: usize = 2 * KB;

pub const IMAGE_DATA: usize = 25 * MB;
pub const URL: usize = 10 * KB;
pub const APP_EXT_INFO: usize = 2 * KB;
pub const APP_FILE_DATA: usize = 10 * MB;
pub const EMOTICON_DATA: usize = 10 * MB;
pub const FILE_EXTENSION: usize = 64;
pub const FILE_DATA: usize = 10 * MB;
pub const MINI_PROGRAM_URL: usize = KB;
pub const MINI_PROGRAM_IMAGE: usize = 128 * KB;

pub const USERNAME: usize = 512;
pub const SESSION_FROM: usize = 32;
pub const WEBVIEW_URL: usize = KB;
pub const EXT_MSG: usize = KB;
pub const IDENTIFIER: usize = KB;
pub const CARD_EXT_MSG: usize = 2024;
pub const CARD_COUNT: usize = 40;
pub const BUSINESS_RESULT: usize = 2 * KB;
pub const JSON_EXTRA: usize = 10 * KB;

/// Fail if `value` is longer than `limit` bytes
pub(crate) fn max_len(field: &'static str, value: &str, limit: usize) -> Result<(), ValidationError> {
    max_bytes(field, value.len(), limit)
}

/// Fail if `value` is empty or longer than `limit` bytes
pub(crate) fn required(field: &'static str, value: &str, limit: usize) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    max_len(field, value, limit)
}

/// Same as [`max_len`] for optional fields; `None` always passes
pub(crate) fn optional(
    field: &'static str,
    value: Option<&str>,
    limit: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => max_len(field, value, limit),
        None => Ok(()),
    }
}

pub(crate) fn max_bytes(field: &'static str, actual: usize, limit: usize) -> Result<(), ValidationError> {
    if actual > limit {
        return Err(ValidationError::TooLong {
            field,
            limit,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn max_items(field: &'static str, actual: usize, limit: usize) -> Result<(), ValidationError> {
    if actual > limit {
        return Err(ValidationError::TooMany {
            field,
            limit,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_len_boundary() {
        let at_limit = "a".repeat(AUTH_SCOPE);
        assert!(max_len("scope", &at_limit, AUTH_SCOPE).is_ok());

        let over = "a".repeat(AUTH_SCOPE + 1);
        let err = max_len("scope", &over, AUTH_SCOPE).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "scope",
                limit: AUTH_SCOPE,
                actual: AUTH_SCOPE + 1
            }
        );
    }

    #[test]
    fn test_limits_count_utf8_bytes() {
        // 3 bytes per character
        let value = "测".repeat(11);
        assert!(max_len("session_from", &value, SESSION_FROM).is_err());
        let value = "测".repeat(10);
        assert!(max_len("session_from", &value, SESSION_FROM).is_ok());
    }

    #[test]
    fn test_required_rejects_empty() {
        assert_eq!(
            required("url", "", URL).unwrap_err(),
            ValidationError::Empty { field: "url" }
        );
    }
}
