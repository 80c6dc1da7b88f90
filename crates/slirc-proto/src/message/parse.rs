//! Message parsing implementation.

use std::str::FromStr;

use crate::error::{MessageParseError, ProtocolError};
use crate::prefix::Prefix;

use super::types::Message;

fn invalid(s: &str, cause: MessageParseError) -> ProtocolError {
    ProtocolError::InvalidMessage {
        string: s.to_owned(),
        cause,
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Message, Self::Err> {
        let line = s.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return Err(invalid(s, MessageParseError::EmptyMessage));
        }

        let mut rest = line;

        // IRCv3 tags are not used by the client; skip them.
        if rest.starts_with('@') {
            rest = match rest.split_once(' ') {
                Some((_, after)) => after.trim_start_matches(' '),
                None => return Err(invalid(s, MessageParseError::MissingCommand)),
            };
        }

        let prefix = if let Some(stripped) = rest.strip_prefix(':') {
            let (raw, after) = stripped
                .split_once(' ')
                .ok_or_else(|| invalid(s, MessageParseError::MissingCommand))?;
            rest = after.trim_start_matches(' ');
            Some(Prefix::parse(raw))
        } else {
            None
        };

        let (head, trailing) = match rest.find(" :") {
            Some(idx) => (&rest[..idx], Some(rest[idx + 2..].to_owned())),
            None => (rest, None),
        };

        let mut tokens = head.split(' ').filter(|t| !t.is_empty());
        let command = tokens
            .next()
            .ok_or_else(|| invalid(s, MessageParseError::MissingCommand))?;

        if !command.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid(
                s,
                MessageParseError::InvalidCommand(command.to_owned()),
            ));
        }

        Ok(Message {
            prefix,
            command: command.to_ascii_uppercase(),
            params: tokens.map(str::to_owned).collect(),
            trailing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_ping() {
        let msg: Message = "PING :server\r\n".parse().unwrap();
        assert_eq!(msg.command, "PING");
        assert!(msg.params.is_empty());
        assert_eq!(msg.trailing.as_deref(), Some("server"));
    }

    #[test]
    fn test_parse_privmsg() {
        let msg: Message = ":nick!user@host PRIVMSG #channel :Hello, world!\r\n"
            .parse()
            .unwrap();
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["#channel"]);
        assert_eq!(msg.trailing.as_deref(), Some("Hello, world!"));
        assert_eq!(msg.source_nickname(), Some("nick"));
    }

    #[test]
    fn test_parse_skips_tags() {
        let msg: Message = "@time=2023-01-01T00:00:00Z;msgid=abc :nick PRIVMSG #ch :Hi"
            .parse()
            .unwrap();
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.source_nickname(), Some("nick"));
    }

    #[test]
    fn test_parse_numeric_response() {
        let msg: Message = ":server.example 001 nick :Welcome to IRC\r\n"
            .parse()
            .unwrap();
        assert_eq!(msg.command, "001");
        assert_eq!(msg.param(0), Some("nick"));
        assert!(matches!(msg.prefix, Some(Prefix::ServerName(_))));
    }

    #[test]
    fn test_parse_lowercase_command() {
        let msg: Message = "join #channel".parse().unwrap();
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.text(), Some("#channel"));
    }

    #[test]
    fn test_parse_trailing_with_colons() {
        let msg: Message = ":a!b@c PRIVMSG #c ::) a :b".parse().unwrap();
        assert_eq!(msg.trailing.as_deref(), Some(":) a :b"));
    }

    #[test]
    fn test_parse_empty_trailing() {
        let msg: Message = "PRIVMSG #c :".parse().unwrap();
        assert_eq!(msg.trailing.as_deref(), Some(""));
    }

    #[test]
    fn test_parse_empty_message() {
        assert!("".parse::<Message>().is_err());
        assert!("\r\n".parse::<Message>().is_err());
    }

    #[test]
    fn test_parse_prefix_only() {
        let err = ":server.example".parse::<Message>().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidMessage {
                cause: MessageParseError::MissingCommand,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_invalid_command() {
        let err = "PRIV/MSG #c :x".parse::<Message>().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidMessage {
                cause: MessageParseError::InvalidCommand(_),
                ..
            }
        ));
    }

    #[test]
    fn test_display_then_parse_is_stable() {
        let raw = ":ugjka!ugjka@example.com JOIN #ugjka";
        let msg: Message = raw.parse().unwrap();
        assert_eq!(msg.to_string(), raw);
    }
}
