use std::time::Duration;

use thiserror::Error;

/// Errors produced by the QR login handshake.
#[derive(Debug, Error)]
pub enum LoginError {
    /// Network or HTTP status failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The `callback(...)` wrapper was not found in a JSONP response.
    #[error("callback `{callback}` not found in response")]
    CallbackUnwrap { callback: String },

    /// The payload is not valid JSON, even after repair.
    #[error("invalid response format: {0}")]
    ResponseFormat(String),

    /// The provider reported a logical failure (e.g. expired code).
    #[error("provider error, errno: {errno}")]
    Provider { errno: i64 },

    /// No `netdisk` scoped token in the session's stoken list.
    #[error("netdisk stoken not found in stoken list")]
    TokenNotFound,

    /// `bdstoken` not present in the fetched page.
    #[error("bdstoken not found")]
    BdstokenNotFound,

    /// The cookie string cannot be sent as an HTTP header value.
    #[error("invalid cookie header: {0}")]
    InvalidCookie(String),

    /// The poll was cancelled by the caller.
    #[error("login cancelled")]
    Cancelled,

    /// No confirmation arrived before the poll deadline.
    #[error("QR code was not confirmed within {0:?}")]
    PollTimeout(Duration),

    /// The credential store rejected the handoff.
    #[error("credential store error: {0}")]
    Store(String),

    #[error("tls configuration error: {0}")]
    Tls(String),

    #[error("system time error")]
    SystemTime,
}

pub type Result<T> = std::result::Result<T, LoginError>;

