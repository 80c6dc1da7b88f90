use std::sync::Arc;

use slirc_proto::commands;
use tracing::info;

use crate::connection::Connection;
use crate::frame::Frame;

impl Connection {
    /// Log every inbound NOTICE at INFO.
    pub fn log_notices(&self) {
        self.add_callback(commands::NOTICE, |_conn: Connection, msg: Arc<Frame>| async move {
            info!(
                from = %msg.sender_nick(),
                target = %msg.param(0).unwrap_or_default(),
                "NOTICE: {}",
                msg.trailing_text()
            );
        });
    }
}
