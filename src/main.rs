//! slirc-bot - Straylight IRC bot
//!
//! A small demo bot on top of the slirc-bot engine: joins the configured
//! channels, answers "hello", rejoins when kicked, and exits when the session
//! ends.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use slirc_bot::config::{self, Config};
use slirc_bot::{ClientError, Connection, Frame, Trigger, commands, telemetry};
use tracing::{error, info, warn};

const QUIT_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    // Initialize tracing
    telemetry::init(&config.log).context("failed to initialize logging")?;

    if let Err(errors) = config::validate(&config) {
        for e in &errors {
            error!(path = %config_path, "{}", e);
        }
        bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server.address,
        nick = %config.identity.nick,
        tls = config.server.tls,
        "Starting slirc-bot"
    );

    let conn = Connection::from_config(&config);
    install_demo_handlers(&conn);

    let mut errors = conn
        .take_errors()
        .context("error channel already taken")?;

    conn.start().await?;

    tokio::select! {
        err = errors.recv() => match err {
            Some(err) if err.is_requested() => info!("Session ended"),
            Some(err) => return Err(report(err)),
            None => warn!("Error channel closed"),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received - disconnecting");
            conn.cmd("QUIT :bye");
            // Give the writer a moment to flush QUIT before cutting the link.
            let _ = tokio::time::timeout(QUIT_GRACE, errors.recv()).await;
            conn.disconnect();
        }
    }

    Ok(())
}

fn install_demo_handlers(conn: &Connection) {
    conn.add_callback(commands::PRIVMSG, |conn: Connection, msg: Arc<Frame>| async move {
        if msg.trailing_text() == "hello" {
            conn.reply(&msg, "Hi, How are you?");
        }
    });

    // KICK <channel> <nick> :<reason>
    conn.add_trigger(Trigger::new(
        |conn: &Connection, msg: &Frame| {
            msg.is(commands::KICK) && msg.param(1).is_some_and(|nick| nick.starts_with(&conn.nick()))
        },
        |conn: Connection, msg: Arc<Frame>| async move {
            if let Some(channel) = msg.param(0) {
                info!(channel = %channel, by = %msg.sender_nick(), "Kicked, rejoining");
                conn.join([channel]);
            }
        },
    ));
}

fn report(err: ClientError) -> anyhow::Error {
    error!(error = %err, code = err.error_code(), "Session failed");
    anyhow::Error::new(err).context("IRC session ended")
}
