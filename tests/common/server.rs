//! Scripted IRC server.
//!
//! Listens on an ephemeral loopback port and hands each accepted bot
//! connection to the test as a [`TestPeer`].

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::time::timeout;

use super::STEP;
use super::peer::TestPeer;

/// A listening test server.
pub struct TestServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl TestServer {
    /// Bind to `127.0.0.1:0`.
    pub async fn spawn() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        Ok(Self { listener, addr })
    }

    /// `host:port` to hand to the bot.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// Accept the next connection.
    pub async fn accept(&self) -> anyhow::Result<TestPeer> {
        let (stream, _) = timeout(STEP, self.listener.accept()).await??;
        Ok(TestPeer::new(stream))
    }
}
