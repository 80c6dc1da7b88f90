use crate::commands;
use crate::prefix::Prefix;

/// An owned IRC message.
///
/// Middle parameters and the trailing parameter are kept apart, so a handler
/// can tell `PRIVMSG #chan :text` from `PRIVMSG #chan text`.
///
/// # Example
///
/// ```
/// use slirc_proto::Message;
///
/// let msg: Message = ":nick!user@host KICK #chan victim :bye".parse().unwrap();
/// assert_eq!(msg.params, vec!["#chan", "victim"]);
/// assert_eq!(msg.text(), Some("bye"));
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Message {
    /// Message prefix/source (e.g., `nick!user@host`).
    pub prefix: Option<Prefix>,
    /// The command token, upper-cased (`PRIVMSG`, `001`, ...).
    pub command: String,
    /// Middle parameters, in order.
    pub params: Vec<String>,
    /// Trailing parameter (the part after ` :`), if present.
    pub trailing: Option<String>,
}

impl Message {
    /// Create a message from raw components without validation.
    pub fn new<C, P>(command: C, params: P, trailing: Option<String>) -> Self
    where
        C: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Message {
            prefix: None,
            command: command.into(),
            params: params.into_iter().map(Into::into).collect(),
            trailing,
        }
    }

    /// Attach a prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Get the nickname from the message prefix, if present.
    pub fn source_nickname(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }

    /// Middle parameter by index.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The message text: the trailing parameter, or the last middle parameter.
    pub fn text(&self) -> Option<&str> {
        self.trailing
            .as_deref()
            .or_else(|| self.params.last().map(String::as_str))
    }

    /// Case-insensitive command comparison.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// Create a PRIVMSG message to a target with text
    #[must_use]
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Message::new(commands::PRIVMSG, [target.into()], Some(text.into()))
    }

    /// Create a NOTICE message to a target with text
    #[must_use]
    pub fn notice(target: impl Into<String>, text: impl Into<String>) -> Self {
        Message::new(commands::NOTICE, [target.into()], Some(text.into()))
    }

    /// Create a JOIN message for a channel
    #[must_use]
    pub fn join(channel: impl Into<String>) -> Self {
        Message::new(commands::JOIN, [channel.into()], None)
    }

    /// Create a NICK message
    #[must_use]
    pub fn nick(nick: impl Into<String>) -> Self {
        Message::new(commands::NICK, [nick.into()], None)
    }

    /// Create a PASS message
    #[must_use]
    pub fn pass(password: impl Into<String>) -> Self {
        Message::new(commands::PASS, [password.into()], None)
    }

    /// Create the registration USER message (`USER <user> +iw * :<realname>`).
    #[must_use]
    pub fn user(user: impl Into<String>, realname: impl Into<String>) -> Self {
        Message::new(
            commands::USER,
            [user.into(), "+iw".to_owned(), "*".to_owned()],
            Some(realname.into()),
        )
    }

    /// Create a PING message carrying a token
    #[must_use]
    pub fn ping(token: impl Into<String>) -> Self {
        Message::new(commands::PING, [token.into()], None)
    }

    /// Create a PONG message, echoing a token when one was received
    #[must_use]
    pub fn pong(token: Option<&str>) -> Self {
        Message::new(
            commands::PONG,
            std::iter::empty::<String>(),
            token.map(str::to_owned),
        )
    }
}
