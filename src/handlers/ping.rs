//! PING/PONG and the liveness watchdog.

use std::sync::Arc;

use slirc_proto::commands;
use tracing::debug;

use crate::connection::Connection;
use crate::dispatch::Event;
use crate::frame::Frame;

impl Connection {
    /// Answer server PINGs and run the ping watchdog.
    ///
    /// The watchdog ticks every [`ping_interval`](Self::ping_interval): if
    /// anything arrived since the last tick it sends a PING, otherwise it logs
    /// a warning. Calling this more than once has no further effect.
    pub fn handle_ping_pong(&self) {
        if !self.enable_watchdog() {
            debug!("Ping handling already installed");
            return;
        }

        self.add_callback(Event::Any, |conn: Connection, _msg: Arc<Frame>| async move {
            conn.mark_alive();
        });
        self.add_callback(commands::PING, |conn: Connection, msg: Arc<Frame>| async move {
            conn.pong(msg.text());
        });
    }
}
