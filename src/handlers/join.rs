//! Join channels once registration completes.

use std::sync::Arc;

use slirc_proto::commands;
use tracing::{debug, info};

use crate::connection::Connection;
use crate::frame::Frame;
use crate::wait::WaitOutcome;

/// Services notice that confirms identification.
pub(crate) const IDENTIFIED: &str = "You are now identified";

impl Connection {
    /// Join `channels` after `RPL_WELCOME`.
    ///
    /// With a password set, the join waits (up to the negotiation timeout)
    /// for services to confirm identification, so channels that require a
    /// registered nick let us in.
    pub fn handle_join<I, S>(&self, channels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let channels: Arc<[String]> = channels.into_iter().map(Into::into).collect();
        self.add_callback(commands::RPL_WELCOME, move |conn: Connection, _msg: Arc<Frame>| {
            let channels = Arc::clone(&channels);
            async move { join_after_welcome(conn, &channels).await }
        });
    }
}

async fn join_after_welcome(conn: Connection, channels: &[String]) {
    if conn.has_password() {
        let outcome = conn
            .wait_for_timeout(is_identified, || {}, conn.negotiation_timeout())
            .await;
        match outcome {
            WaitOutcome::Matched(_) => debug!(nick = %conn.nick(), "Identified with services"),
            WaitOutcome::TimedOut => {
                info!(nick = %conn.nick(), "No identification notice, joining anyway")
            }
            WaitOutcome::Closed => return,
        }
    }

    info!(channels = ?channels, "Joining channels");
    conn.join(channels);
}

pub(crate) fn is_identified(frame: &Frame) -> bool {
    frame.is(commands::NOTICE) && frame.trailing_text().contains(IDENTIFIED)
}
