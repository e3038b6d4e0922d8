//! EasyCars error taxonomy
//!
//! The vendor embeds a small integer response code in every JSON body.
//! That switch is reproduced here as a tagged-variant error type so callers
//! pattern-match to decide retry vs. surface instead of string-comparing.

use thiserror::Error;

/// Errors returned by the EasyCars API client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EasyCarsError {
    /// Response code 1: stale or bad credentials. Never retried, never cached.
    #[error("EasyCars authentication failed: {0}")]
    Authentication(String),

    /// Response code 7: the request itself was malformed. Not retryable.
    #[error("EasyCars rejected the request: {0}")]
    Validation(String),

    /// Response code 5: transient remote condition. Retried with backoff.
    #[error("EasyCars temporary service condition: {0}")]
    Temporary(String),

    /// Response code 9: unrecoverable server condition. Not retryable.
    #[error("EasyCars fatal server condition: {0}")]
    Fatal(String),

    /// Any response code outside the documented set. The raw code is kept
    /// for diagnostics.
    #[error("EasyCars returned unknown response code {code}: {message}")]
    Unknown { code: i64, message: String },

    /// Connect failure, timeout, or a non-JSON body. Retried like Temporary.
    #[error("EasyCars transport error: {0}")]
    Transport(String),

    /// The caller's cancellation token fired mid-request.
    #[error("EasyCars request cancelled")]
    Cancelled,
}

impl EasyCarsError {
    /// Whether the retry loop may attempt this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EasyCarsError::Temporary(_) | EasyCarsError::Transport(_)
        )
    }

    /// Map a vendor response code to an error, or `Ok(())` for success.
    pub fn from_response_code(code: i64, message: Option<&str>) -> Result<(), EasyCarsError> {
        let message = message.unwrap_or("no message").to_string();
        match code {
            0 => Ok(()),
            1 => Err(EasyCarsError::Authentication(message)),
            5 => Err(EasyCarsError::Temporary(message)),
            7 => Err(EasyCarsError::Validation(message)),
            9 => Err(EasyCarsError::Fatal(message)),
            other => Err(EasyCarsError::Unknown {
                code: other,
                message,
            }),
        }
    }
}

impl From<reqwest::Error> for EasyCarsError {
    fn from(err: reqwest::Error) -> Self {
        EasyCarsError::Transport(err.to_string())
    }
}
