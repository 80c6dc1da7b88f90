//! Ping watchdog.
//!
//! Every tick looks at the liveness flag that inbound traffic sets. A set
//! flag is cleared and answered with an unsolicited PING to keep the link
//! exercised; an unset flag only produces a warning. The watchdog never
//! disconnects on its own.

use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::Connection;

const MIN_PERIOD: Duration = Duration::from_millis(1);

pub(super) async fn run(conn: Connection, shutdown: CancellationToken) {
    let period = conn.ping_interval().max(MIN_PERIOD);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            _ = ticker.tick() => {}
        }

        if conn.take_alive() {
            conn.ping();
        } else {
            warn!(
                server = %conn.server(),
                interval_ms = period.as_millis() as u64,
                "No traffic from server since last liveness check"
            );
        }
    }
}
