//! Message source: `servername` or `nick[!user][@host]`.

use std::fmt;

/// Where a message came from.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum Prefix {
    /// Server name (e.g., "irc.example.com")
    ServerName(String),
    /// User mask: (nickname, username, hostname); missing parts are empty.
    Nickname(String, String, String),
}

impl Prefix {
    /// Parse the text between the leading `:` and the first space.
    ///
    /// Lenient: components are not validated. A bare token containing a dot
    /// and neither `!` nor `@` is taken to be a server name.
    pub fn parse(raw: &str) -> Self {
        let (mask, host) = raw.split_once('@').unwrap_or((raw, ""));
        let (nick, user) = mask.split_once('!').unwrap_or((mask, ""));

        if user.is_empty() && host.is_empty() && !raw.contains(['!', '@']) && nick.contains('.') {
            return Prefix::ServerName(nick.to_owned());
        }
        Prefix::Nickname(nick.to_owned(), user.to_owned(), host.to_owned())
    }

    /// Build a full user mask.
    ///
    /// ```
    /// use slirc_proto::Prefix;
    ///
    /// let prefix = Prefix::new("nick", "user", "host.example.com");
    /// assert_eq!(prefix.nick(), Some("nick"));
    /// assert_eq!(prefix.len(), "nick!user@host.example.com".len());
    /// ```
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Prefix::Nickname(nick.into(), user.into(), host.into())
    }

    /// Nickname of a user prefix.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::Nickname(nick, _, _) if !nick.is_empty() => Some(nick),
            _ => None,
        }
    }

    /// Encoded length in bytes, without the leading `:` and trailing space.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Prefix::ServerName(name) => name.len(),
            Prefix::Nickname(nick, user, host) => {
                let optional = |part: &str| if part.is_empty() { 0 } else { 1 + part.len() };
                nick.len() + optional(user) + optional(host)
            }
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::ServerName(name) => f.write_str(name),
            Prefix::Nickname(nick, user, host) => {
                f.write_str(nick)?;
                if !user.is_empty() {
                    write!(f, "!{user}")?;
                }
                if !host.is_empty() {
                    write!(f, "@{host}")?;
                }
                Ok(())
            }
        }
    }
}
