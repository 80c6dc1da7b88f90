//! slirc-bot - Straylight IRC bot engine
//!
//! A long-lived IRC client connection: inbound lines become [`Frame`]s that
//! are dispatched to callbacks and triggers, outbound lines go through a
//! throttled FIFO queue, and scripted exchanges (nick recovery, identified
//! joins) are built from [`Connection::wait_for`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use slirc_bot::{Connection, Frame};
//!
//! # async fn run() -> Result<(), slirc_bot::ClientError> {
//! let conn = Connection::new("ugjka", "ugjka", "irc.libera.chat:6697", true);
//! conn.handle_ping_pong();
//! conn.handle_nick_taken();
//! conn.handle_join(["#ugjka"]);
//! conn.add_callback("PRIVMSG", |conn: Connection, msg: Arc<Frame>| async move {
//!     if msg.trailing_text() == "hello" {
//!         conn.reply(&msg, "Hi, How are you?");
//!     }
//! });
//!
//! let mut errors = conn.take_errors().unwrap();
//! conn.start().await?;
//! if let Some(err) = errors.recv().await {
//!     eprintln!("session ended: {err}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod handlers;
pub mod split;
pub mod telemetry;
pub mod wait;

pub use broadcast::{Broadcaster, Subscriber};
pub use config::Config;
pub use connection::{Connection, ConnectionState};
pub use dispatch::{Event, Handler, SpawnPolicy, Trigger};
pub use error::{BroadcastError, ClientError};
pub use frame::Frame;
pub use wait::WaitOutcome;

pub use slirc_proto::{Message, Prefix, commands};
