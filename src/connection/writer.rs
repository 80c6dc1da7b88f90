//! Writer pump: outbound queue -> throttle -> transport.

use std::sync::Arc;

use futures_util::SinkExt;
use slirc_proto::LineCodec;
use tokio::io::WriteHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;

use super::{Connection, TransportStream};
use crate::error::ClientError;

pub(super) type LineSink = FramedWrite<WriteHalf<TransportStream>, LineCodec>;

/// Write queued lines in FIFO order, sleeping for the throttle interval after each.
pub(super) async fn run(
    conn: Connection,
    mut sink: LineSink,
    mut outbound: mpsc::UnboundedReceiver<String>,
    shutdown: CancellationToken,
    generation: u64,
) {
    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            line = outbound.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        conn.log_wire(">>", &line);
        let sent = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            sent = sink.send(line) => sent,
        };
        if let Err(e) = sent {
            conn.shutdown(Some(generation), ClientError::Write(Arc::new(e)));
            break;
        }

        let throttle = conn.throttle();
        if !throttle.is_zero() {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(throttle) => {}
            }
        }
    }

    // Discard whatever was still queued; senders are already cut off.
    outbound.close();
    while outbound.try_recv().is_ok() {}
}
