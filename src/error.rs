//! Error taxonomy for the client.
//!
//! Connection-level failures ([`TransportError`]) are recovered by the
//! supervisor's reconnect loop. Request-level failures ([`ClientError::Timeout`],
//! [`ClientError::Remote`]) fail only the call that observed them. Both types are
//! `Clone` because one connect outcome fans out to every joined caller.

use std::time::Duration;

/// Connection-level failure: refused, reset, handshake rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The websocket handshake or stream failed.
    #[error("websocket error: {0}")]
    WebSocket(String),
    /// A handshake header could not be encoded.
    #[error("invalid handshake header: {0}")]
    InvalidHeader(String),
    /// The dial did not complete in time.
    #[error("dial timed out after {0:?}")]
    DialTimeout(Duration),
    /// `send` was called with no open link.
    #[error("not connected")]
    NotConnected,
    /// The link was closed while a frame was in flight.
    #[error("link closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(error.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue> for TransportError {
    fn from(error: tokio_tungstenite::tungstenite::http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(error.to_string())
    }
}

/// Error returned by the public client surface.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The connect attempt was rejected by the transport.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// No `connected` notification arrived within the caller's deadline.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    /// No matching response arrived before the request deadline.
    #[error("timeout waiting for response to seq {seq}")]
    Timeout { seq: u32 },
    /// The server answered with its error field set.
    #[error("server returned error: {0}")]
    Remote(String),
    /// The response carried no payload of the expected kind.
    #[error("response carried no `{0}` payload")]
    MissingPayload(&'static str),
    /// The client has been shut down.
    #[error("client is shut down")]
    Closed,
}
