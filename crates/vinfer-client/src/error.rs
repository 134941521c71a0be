//! Client error types.

use std::error::Error as StdError;

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

/// Longest server error body kept in an error message.
const MAX_BODY_CHARS: usize = 500;

/// Errors from talking to an SGLang server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transport failure, carrying the full cause chain
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(&err)
    }
}

impl ClientError {
    /// Network error whose message includes every underlying cause.
    pub fn network(err: &(dyn StdError + 'static)) -> Self {
        Self::Network(error_chain(err))
    }

    /// Invalid or unexpected response body.
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build a status error, truncating long bodies (HTML error pages and the like).
    pub fn status(status: u16, body: &str) -> Self {
        let body = body.trim();
        let body = match body.char_indices().nth(MAX_BODY_CHARS) {
            Some((idx, _)) => format!("{}...", &body[..idx]),
            None => body.to_string(),
        };
        Self::Status { status, body }
    }

    /// Map a transport error, turning reqwest timeouts into [`ClientError::Timeout`].
    pub fn from_transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_secs)
        } else {
            Self::network(&err)
        }
    }

    /// True for request timeouts.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout(_))
    }
}

/// Join an error and its `source()` chain, e.g.
/// `error sending request: client error (Connect): Connection refused`.
///
/// Causes whose text is already part of the message are skipped.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !text.is_empty() && !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
