//! # slirc-proto
//!
//! IRC line framing and message parsing used by the slirc bot engine.
//!
//! ## Features
//!
//! - Lenient RFC 1459 / RFC 2812 message parsing (IRCv3 tags are skipped)
//! - Prefix handling with byte-accurate length for line budgeting
//! - Tokio codecs for newline-delimited framing (`tokio` feature, on by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use slirc_proto::Message;
//!
//! let msg: Message = ":nick!user@host PRIVMSG #channel :Hello!".parse().unwrap();
//! assert_eq!(msg.command, "PRIVMSG");
//! assert_eq!(msg.param(0), Some("#channel"));
//! assert_eq!(msg.trailing.as_deref(), Some("Hello!"));
//! assert_eq!(msg.source_nickname(), Some("nick"));
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod commands;
pub mod error;
#[cfg(feature = "tokio")]
pub mod irc;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod prefix;

pub use self::error::{MessageParseError, ProtocolError};
#[cfg(feature = "tokio")]
pub use self::irc::IrcCodec;
#[cfg(feature = "tokio")]
pub use self::line::LineCodec;
pub use self::message::Message;
pub use self::prefix::Prefix;

/// Maximum length of an encoded IRC line, excluding the trailing CRLF.
pub const MAX_LINE_LEN: usize = 510;

/// Maximum inbound line length accepted by the codecs (IRCv3 tags included).
pub const MAX_IRC_LINE_LEN: usize = 8191;

/// Maximum nickname length the client assumes (RFC 2812 allows 9, modern networks 15+).
pub const NICK_MAX_LEN: usize = 15;
