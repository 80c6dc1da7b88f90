//! Convenience handlers a typical bot installs.
//!
//! Each installer registers ordinary callbacks on the connection; nothing
//! here has access the public API doesn't.

mod join;
mod nick;
mod notices;
mod ping;

pub use nick::{mutate_nick, temporary_nick};
