//! Error types for the Backblaze B2 provider

use crate::types::ErrorResponse;
use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Backblaze B2 provider errors
#[derive(Error, Debug)]
pub enum B2Error {
    /// Credentials rejected, or the key may not access the bucket
    #[error("Authorization failed: {0}")]
    Unauthorized(String),

    /// Session token expired; re-authorizing fixes it
    #[error("Authorization token expired")]
    ExpiredToken,

    /// Configured bucket does not exist or is not visible to the key
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// API request returned an error
    #[error("B2 API error (status {status_code}, {code}): {message}")]
    ApiError {
        status_code: u16,
        code: String,
        message: String,
    },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

impl B2Error {
    /// Classify a non-2xx response.
    pub fn from_status(status_code: u16, body: &[u8]) -> Self {
        let (code, message) = match serde_json::from_slice::<ErrorResponse>(body) {
            Ok(error) => (error.code, error.message),
            Err(_) => (String::new(), String::from_utf8_lossy(body).into_owned()),
        };

        match status_code {
            401 if code == "expired_auth_token" => B2Error::ExpiredToken,
            401 | 403 => B2Error::Unauthorized(if message.is_empty() { code } else { message }),
            _ => B2Error::ApiError {
                status_code,
                code,
                message,
            },
        }
    }

    /// Upload failures that should be retried with a fresh upload URL.
    pub fn is_retryable_upload(&self) -> bool {
        match self {
            B2Error::ApiError { status_code, .. } => {
                matches!(status_code, 408 | 429) || (500..600).contains(status_code)
            }
            B2Error::ExpiredToken => true,
            B2Error::BridgeError(BridgeError::OperationFailed(_)) => true,
            _ => false,
        }
    }
}

/// Result type for Backblaze B2 operations
pub type Result<T> = std::result::Result<T, B2Error>;

impl From<B2Error> for BridgeError {
    fn from(error: B2Error) -> Self {
        match error {
            B2Error::Unauthorized(msg) => BridgeError::Unauthorized(msg),
            B2Error::ExpiredToken => {
                BridgeError::Unauthorized("authorization token expired".to_string())
            }
            // A missing bucket is a configuration failure: the whole pass
            // cannot succeed.
            B2Error::BucketNotFound(name) => {
                BridgeError::Unauthorized(format!("bucket not found: {}", name))
            }
            B2Error::ApiError {
                status_code,
                code,
                message,
            } => BridgeError::OperationFailed(format!(
                "B2 API error (status {}, {}): {}",
                status_code, code, message
            )),
            B2Error::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            B2Error::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let body = br#"{"status":401,"code":"bad_auth_token","message":"Invalid token"}"#;
        assert!(matches!(
            B2Error::from_status(401, body),
            B2Error::Unauthorized(msg) if msg == "Invalid token"
        ));

        let body = br#"{"status":401,"code":"expired_auth_token","message":"expired"}"#;
        assert!(matches!(B2Error::from_status(401, body), B2Error::ExpiredToken));

        let err = B2Error::from_status(503, b"Service Unavailable");
        assert!(matches!(err, B2Error::ApiError { status_code: 503, .. }));
        assert!(err.is_retryable_upload());

        let err = B2Error::from_status(400, br#"{"code":"bad_request","message":"x"}"#);
        assert!(!err.is_retryable_upload());
    }

    #[test]
    fn test_bridge_conversion() {
        let bridge: BridgeError = B2Error::Unauthorized("bad key".to_string()).into();
        assert!(bridge.is_unauthorized());

        let bridge: BridgeError = B2Error::BucketNotFound("assets".to_string()).into();
        assert!(bridge.is_unauthorized());

        let bridge: BridgeError = B2Error::ApiError {
            status_code: 500,
            code: "internal_error".to_string(),
            message: "oops".to_string(),
        }
        .into();
        assert!(matches!(bridge, BridgeError::OperationFailed(_)));
    }
}
