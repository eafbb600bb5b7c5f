//! Feed errors

use thiserror::Error;

/// Errors surfaced by the feed client
///
/// Callers of `subscribe`/`fetch_history` only ever see `InvalidSymbol`,
/// `RequestTimeout`, `ReconnectExhausted`, `Rejected` or `Shutdown`.
/// `ConnectionFailure` and `MalformedMessage` are handled inside the client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// Symbol failed pre-flight validation; nothing was sent
    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),
    /// Transport-level failure, retried internally
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),
    /// No correlated response before the deadline
    #[error("Request {req_id} timed out")]
    RequestTimeout { req_id: u64 },
    /// Inbound payload could not be parsed
    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    /// Reconnection budget spent; call `connect` to resume
    #[error("Reconnection attempts exhausted")]
    ReconnectExhausted,
    /// Feed answered the request with an error
    #[error("Request rejected ({code}): {message}")]
    Rejected { code: String, message: String },
    /// Client shut down while the request was pending
    #[error("Feed client shut down")]
    Shutdown,
}
