#![forbid(unsafe_code)]

use thiserror::Error;

/// Failure of a single Data API request.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Non-2xx answer. The body is kept verbatim because quota and
    /// disabled-key conditions are only visible as text inside it.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("could not decode response: {0}")]
    Decode(String),
}

/// How a failed call is treated by the collection loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    QuotaExceeded,
    KeyDisabled,
    RateLimited,
    Other,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    fn forbidden_with(&self, marker: &str) -> bool {
        matches!(self, ApiError::Status { status: 403, body } if body.contains(marker))
    }

    /// Order matters: a 403 body naming both conditions counts as quota.
    pub fn class(&self) -> ErrorClass {
        if self.forbidden_with("quotaExceeded") {
            ErrorClass::QuotaExceeded
        } else if self.forbidden_with("disabled") {
            ErrorClass::KeyDisabled
        } else if self.status() == Some(429) {
            ErrorClass::RateLimited
        } else {
            ErrorClass::Other
        }
    }

    /// The video has comments turned off. The API message for this case also
    /// says "disabled", so this has to be checked before [`ApiError::class`].
    pub fn is_comments_disabled(&self) -> bool {
        self.forbidden_with("commentsDisabled")
    }
}

/// Outcome of a one-shot channel lookup that produced no usable value.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("channel {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, body: &str) -> ApiError {
        ApiError::Status {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn quota_wins_over_disabled() {
        let err = status(403, r#"{"reason":"quotaExceeded","message":"disabled"}"#);
        assert_eq!(err.class(), ErrorClass::QuotaExceeded);
    }

    #[test]
    fn disabled_key_is_recognised() {
        let err = status(403, r#"{"reason":"accessNotConfigured","message":"API key disabled"}"#);
        assert_eq!(err.class(), ErrorClass::KeyDisabled);
    }

    #[test]
    fn rate_limit_needs_429() {
        assert_eq!(status(429, "").class(), ErrorClass::RateLimited);
        assert_eq!(status(403, "rateLimitExceeded").class(), ErrorClass::Other);
    }

    #[test]
    fn quota_text_on_other_status_is_not_quota() {
        assert_eq!(status(400, "quotaExceeded").class(), ErrorClass::Other);
        assert_eq!(ApiError::Transport("reset".into()).class(), ErrorClass::Other);
    }

    #[test]
    fn comments_disabled_is_separate_from_class() {
        let err = status(403, r#"{"reason":"commentsDisabled"}"#);
        assert!(err.is_comments_disabled());
        assert!(!status(403, "quotaExceeded").is_comments_disabled());
        assert!(!status(404, "commentsDisabled").is_comments_disabled());
    }
}
