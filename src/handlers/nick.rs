//! Recovery from `ERR_NICKNAMEINUSE`.
//!
//! Without a password the nick is mutated and retried. With a password the
//! bot takes a temporary nick, has services ghost whoever holds the real one,
//! takes it back and identifies:
//!
//! ```text
//! NICK <temp>
//! PRIVMSG NickServ :GHOST <nick> <password>     wait: "has been ghosted"
//! NICK <nick>
//! PRIVMSG NickServ :IDENTIFY <nick> <password>  wait: "You are now identified"
//! ```
//!
//! Each wait is bounded by the negotiation timeout; a silent services bot
//! delays the flow but never wedges it.

use std::sync::Arc;

use rand::Rng;
use slirc_proto::{NICK_MAX_LEN, commands};
use tracing::{debug, info, warn};

use super::join::is_identified;
use crate::connection::Connection;
use crate::frame::Frame;
use crate::wait::WaitOutcome;

/// Nick of the services bot we negotiate with.
const SERVICES: &str = "NickServ";
const GHOSTED: &str = "has been ghosted";

/// Characters kept from the original nick when a suffix has to fit.
const STEM_LEN: usize = NICK_MAX_LEN - 3;

impl Connection {
    /// Recover when the server says our nick is taken.
    pub fn handle_nick_taken(&self) {
        self.add_callback(
            commands::ERR_NICKNAMEINUSE,
            |conn: Connection, msg: Arc<Frame>| async move {
                if conn.has_password() {
                    reclaim(conn).await;
                } else {
                    // 433 <client> <rejected nick> :<reason>
                    let rejected = msg.param(1).map_or_else(|| conn.nick(), str::to_owned);
                    let next = mutate_nick(&rejected, conn.next_nick_attempt());
                    info!(nick = %next, "Nick in use, trying another");
                    conn.new_nick(&next);
                }
            },
        );
    }
}

/// Next nick to try after `nick` was refused.
///
/// Short nicks get an underscore appended. Nicks at or near the protocol
/// limit are cut to their first twelve characters and suffixed with `_` and
/// the two-digit attempt number.
pub fn mutate_nick(nick: &str, attempt: u32) -> String {
    if nick.chars().count() < NICK_MAX_LEN {
        return format!("{nick}_");
    }
    let stem: String = nick.chars().take(STEM_LEN).collect();
    format!("{stem}_{:02}", attempt % 100)
}

/// Temporary nick used while the real one is being ghosted.
pub fn temporary_nick(nick: &str, suffix: u16) -> String {
    let stem: String = nick.chars().take(STEM_LEN).collect();
    format!("{stem}{:03}", suffix % 1000)
}

async fn reclaim(conn: Connection) {
    if !conn.begin_negotiation() {
        debug!("Nick recovery already in progress");
        return;
    }
    negotiate(&conn).await;
    conn.end_negotiation();
}

async fn negotiate(conn: &Connection) {
    let Some(password) = conn.password() else {
        return;
    };
    let nick = conn.configured_nick();
    let timeout = conn.negotiation_timeout();

    let suffix: u16 = rand::thread_rng().gen_range(0..1000);
    let temp = temporary_nick(&nick, suffix);
    info!(nick = %nick, temp = %temp, "Nick in use, asking services to ghost it");
    conn.new_nick(&temp);

    let ghost = format!("GHOST {nick} {}", password.as_str());
    let outcome = conn
        .wait_for_timeout(is_ghosted, || conn.msg(SERVICES, &ghost), timeout)
        .await;
    match outcome {
        WaitOutcome::Matched(_) => debug!(nick = %nick, "Ghosted"),
        WaitOutcome::TimedOut => warn!(nick = %nick, "No ghost confirmation from services"),
        WaitOutcome::Closed => return,
    }

    conn.new_nick(&nick);

    let identify = format!("IDENTIFY {nick} {}", password.as_str());
    let outcome = conn
        .wait_for_timeout(is_identified, || conn.msg(SERVICES, &identify), timeout)
        .await;
    match outcome {
        WaitOutcome::Matched(_) => info!(nick = %nick, "Nick recovered and identified"),
        WaitOutcome::TimedOut => warn!(nick = %nick, "No identification confirmation from services"),
        WaitOutcome::Closed => {}
    }
}

fn is_ghosted(frame: &Frame) -> bool {
    frame.is(commands::NOTICE) && frame.trailing_text().contains(GHOSTED)
}
