//! Inbound frames.
//!
//! A [`Frame`] is one decoded line plus the time it arrived. Frames are
//! created once by the reader pump and then shared read-only (behind an
//! `Arc`) between pending waits, callbacks and triggers.

use std::ops::Deref;

use chrono::{DateTime, Utc};
use slirc_proto::Message;

/// One inbound protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    message: Message,
    received_at: DateTime<Utc>,
}

impl Frame {
    /// Wrap a decoded message, stamping it with the current time.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            received_at: Utc::now(),
        }
    }

    /// The decoded message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// When the reader pump decoded this frame.
    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Trailing text, or the empty string when the message has none.
    pub fn trailing_text(&self) -> &str {
        self.message.trailing.as_deref().unwrap_or_default()
    }

    /// Sender nick, or the empty string for server-originated frames.
    pub fn sender_nick(&self) -> &str {
        self.message.source_nickname().unwrap_or_default()
    }
}

impl Deref for Frame {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.message
    }
}

impl From<Message> for Frame {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}
