//! Reader pump: transport -> frames -> waits and dispatcher.

use std::sync::Arc;

use futures_util::StreamExt;
use slirc_proto::IrcCodec;
use tokio::io::ReadHalf;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use super::{Connection, TransportStream};
use crate::error::ClientError;
use crate::frame::Frame;

pub(super) type FrameStream = FramedRead<ReadHalf<TransportStream>, IrcCodec>;

/// Decode frames until the stream ends, fails, or the session is cancelled.
///
/// Each frame goes to the pending waits first, then to the dispatcher. The
/// dispatcher spawns handlers, so a slow handler never holds up reading.
pub(super) async fn run(
    conn: Connection,
    mut frames: FrameStream,
    shutdown: CancellationToken,
    generation: u64,
) {
    let cause = loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return,
            next = frames.next() => next,
        };

        match next {
            Some(Ok(message)) => {
                let frame = Arc::new(Frame::new(message));
                conn.log_wire("<<", frame.message());
                conn.waits().broadcast(&frame);
                conn.dispatcher().dispatch(&conn, &frame);
            }
            Some(Err(e)) => break ClientError::from_inbound(e),
            None => break ClientError::ConnectionClosed,
        }
    };

    conn.shutdown(Some(generation), cause);
}
