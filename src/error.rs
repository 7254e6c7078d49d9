use std::fmt;

use thiserror::Error;

/// Result alias used throughout the console core.
pub type ConsoleResult<T> = Result<T, ConsoleError>;

/// Error types for the console core.
///
/// Authentication and API failures are modelled explicitly so callers can
/// distinguish "the token is garbage" from "the server said no" from "the
/// network ate the request". Nothing here is fatal to the process; the worst
/// outcome of any of these is forced re-authentication.
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// The access token could not be decoded (missing or malformed payload).
    #[error("Access token is invalid: {reason}")]
    InvalidToken { reason: String },

    /// The user profile could not be fetched during login or refresh.
    #[error("Failed to fetch user profile: {reason}")]
    ProfileFetch { reason: String },

    /// The server rejected the request with HTTP 401.
    #[error("Request was not authorized")]
    Unauthorized,

    /// Any other non-2xx response, carrying the server-supplied message
    /// when one was present.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The request never produced a response (DNS, connect, timeout).
    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration value for '{key}': {reason}")]
    ConfigInvalid { key: String, reason: String },
}

impl ConsoleError {
    /// Create an invalid token error
    pub fn invalid_token(reason: impl fmt::Display) -> Self {
        Self::InvalidToken {
            reason: reason.to_string(),
        }
    }

    /// Create a profile fetch error
    pub fn profile_fetch(reason: impl fmt::Display) -> Self {
        Self::ProfileFetch {
            reason: reason.to_string(),
        }
    }

    /// Create an HTTP status error
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(reason: impl fmt::Display) -> Self {
        Self::Transport {
            reason: reason.to_string(),
        }
    }

    /// Create an invalid configuration error
    pub fn config_invalid(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::ConfigInvalid {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for errors that indicate the session is no longer usable.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        ConsoleError::transport(err)
    }
}
