//! Server side of one bot connection.
//!
//! Sends raw lines to the bot and asserts on the lines it writes back.

use std::time::Duration;

use slirc_bot::Message;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

use super::STEP;

/// The server's end of an accepted bot connection.
pub struct TestPeer {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

#[allow(dead_code)]
impl TestPeer {
    pub(crate) fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        }
    }

    /// Send a raw line to the bot.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        if !line.ends_with("\r\n") {
            self.writer.write_all(b"\r\n").await?;
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive one raw line, CRLF included.
    pub async fn recv_line(&mut self) -> anyhow::Result<String> {
        self.recv_line_timeout(STEP).await
    }

    pub async fn recv_line_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let n = timeout(dur, self.reader.read_line(&mut line)).await??;
        if n == 0 {
            anyhow::bail!("bot closed the connection");
        }
        Ok(line)
    }

    /// Receive and parse one message.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        let line = self.recv_line().await?;
        line.parse::<Message>()
            .map_err(|e| anyhow::anyhow!("Parse error: {} in {:?}", e, line))
    }

    /// Receive messages until one satisfies `predicate`; return that one.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Message>
    where
        F: FnMut(&Message) -> bool,
    {
        loop {
            let msg = self.recv().await?;
            if predicate(&msg) {
                return Ok(msg);
            }
        }
    }

    /// Receive one message and check its command.
    pub async fn expect_command(&mut self, command: &str) -> anyhow::Result<Message> {
        let msg = self.recv().await?;
        if !msg.is(command) {
            anyhow::bail!("expected {}, got {:?}", command, msg.to_string());
        }
        Ok(msg)
    }

    /// Receive one line and compare it exactly (without CRLF).
    pub async fn expect_line(&mut self, expected: &str) -> anyhow::Result<()> {
        let line = self.recv_line().await?;
        let got = line.trim_end_matches(&['\r', '\n'][..]);
        if got != expected {
            anyhow::bail!("expected {:?}, got {:?}", expected, got);
        }
        Ok(())
    }

    /// Assert the bot writes nothing for `dur`.
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match self.recv_line_timeout(dur).await {
            Err(e) if e.is::<tokio::time::error::Elapsed>() => Ok(()),
            Err(e) => Err(e),
            Ok(line) => anyhow::bail!("expected silence, got {:?}", line),
        }
    }

    /// True once the bot has closed its side of the connection.
    pub async fn closed_within(&mut self, dur: Duration) -> bool {
        let mut line = String::new();
        loop {
            line.clear();
            match timeout(dur, self.reader.read_line(&mut line)).await {
                Ok(Ok(0)) | Ok(Err(_)) => return true,
                Ok(Ok(_)) => continue,
                Err(_) => return false,
            }
        }
    }
}
