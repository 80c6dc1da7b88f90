//! Command tokens and numeric replies the client engine reacts to.
//!
//! Only the handful of commands the engine itself sends or observes are
//! listed; anything else is matched by its raw token.

/// Private message to a user or channel.
pub const PRIVMSG: &str = "PRIVMSG";
/// Notice to a user or channel.
pub const NOTICE: &str = "NOTICE";
/// Join a channel.
pub const JOIN: &str = "JOIN";
/// Leave a channel.
pub const PART: &str = "PART";
/// Kick a user from a channel.
pub const KICK: &str = "KICK";
/// Nickname change.
pub const NICK: &str = "NICK";
/// User registration.
pub const USER: &str = "USER";
/// Connection password.
pub const PASS: &str = "PASS";
/// Liveness probe.
pub const PING: &str = "PING";
/// Liveness probe reply.
pub const PONG: &str = "PONG";
/// Client quit.
pub const QUIT: &str = "QUIT";
/// Fatal server error.
pub const ERROR: &str = "ERROR";

/// `001` - registration completed.
pub const RPL_WELCOME: &str = "001";
/// `433` - requested nickname is already in use.
pub const ERR_NICKNAMEINUSE: &str = "433";
