//! Unified error handling for slirc-bot.
//!
//! [`ClientError`] is what a session reports on its error channel. Every
//! variant is cheap to clone so the same value can be returned from
//! [`Connection::start`](crate::Connection::start) and delivered to the
//! channel consumer.

use std::sync::Arc;

use slirc_proto::ProtocolError;
use thiserror::Error;

/// Connection-level errors.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// TCP connection to the server could not be established.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// TLS configuration or handshake failed.
    #[error("tls handshake with {address} failed: {reason}")]
    Tls { address: String, reason: String },

    /// Writing a line to the transport failed mid-session.
    #[error("write failed: {0}")]
    Write(#[source] Arc<ProtocolError>),

    /// Reading from the transport failed mid-session.
    #[error("read failed: {0}")]
    Read(#[source] Arc<ProtocolError>),

    /// A line arrived that could not be decoded into a message.
    #[error("decode failed: {0}")]
    Decode(#[source] Arc<ProtocolError>),

    /// The server closed the connection.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// The session was ended by [`Connection::disconnect`](crate::Connection::disconnect).
    #[error("disconnected")]
    Disconnected,
}

impl ClientError {
    /// Classify a failure coming out of the inbound frame stream.
    pub(crate) fn from_inbound(err: ProtocolError) -> Self {
        match err {
            ProtocolError::Io(_) => Self::Read(Arc::new(err)),
            other => Self::Decode(Arc::new(other)),
        }
    }

    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Tls { .. } => "tls",
            Self::Write(_) => "write",
            Self::Read(_) => "read",
            Self::Decode(_) => "decode",
            Self::ConnectionClosed => "connection_closed",
            Self::Disconnected => "disconnected",
        }
    }

    /// Whether the session ended at the caller's request rather than through a failure.
    pub fn is_requested(&self) -> bool {
        matches!(self, Self::Disconnected)
    }
}

// ============================================================================
// Broadcaster Errors
// ============================================================================

/// Errors returned by [`Broadcaster`](crate::broadcast::Broadcaster) operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BroadcastError {
    #[error("can't subscribe, broadcaster killed")]
    Killed,
}
