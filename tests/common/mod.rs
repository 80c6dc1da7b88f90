//! Integration test common infrastructure.
//!
//! Provides an in-process scripted IRC server the bot connects to, and
//! helpers for asserting on the lines the bot writes.

pub mod peer;
pub mod server;

#[allow(unused_imports)]
pub use peer::TestPeer;
#[allow(unused_imports)]
pub use server::TestServer;

use std::time::Duration;

use slirc_bot::Connection;

/// Nick used throughout the integration tests.
#[allow(dead_code)]
pub const NICK: &str = "ugjka";
#[allow(dead_code)]
pub const CHANNEL: &str = "#ugjka";
#[allow(dead_code)]
pub const PASSWORD: &str = "hunter123";

/// Bound on every single step of a test.
#[allow(dead_code)]
pub const STEP: Duration = Duration::from_secs(5);

/// A bot pointed at `server` with throttling off, like every test wants.
#[allow(dead_code)]
pub fn test_bot(server: &TestServer) -> Connection {
    let bot = Connection::new(NICK, NICK, server.address(), false);
    bot.set_throttle(Duration::ZERO);
    bot
}

/// Start `bot` and accept its connection, consuming the USER/NICK handshake
/// (and PASS, when a password is set).
#[allow(dead_code)]
pub async fn connect(bot: &Connection, server: &TestServer) -> anyhow::Result<TestPeer> {
    let (started, peer) = tokio::join!(bot.start(), server.accept());
    started?;
    let mut peer = peer?;
    if bot.has_password() {
        peer.expect_command("PASS").await?;
    }
    peer.expect_command("USER").await?;
    peer.expect_command("NICK").await?;
    Ok(peer)
}
