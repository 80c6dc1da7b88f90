use std::fmt::{self, Display, Formatter};

use super::types::Message;

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, ":{} ", prefix)?;
        }

        write!(f, "{}", self.command)?;

        for param in &self.params {
            write!(f, " {}", param)?;
        }

        if let Some(ref trailing) = self.trailing {
            write!(f, " :{}", trailing)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefix::Prefix;

    #[test]
    fn test_display_full() {
        let msg = Message::privmsg("#rust", "Hello, world!").with_prefix(Prefix::new(
            "bot",
            "bot",
            "example.com",
        ));
        assert_eq!(
            msg.to_string(),
            ":bot!bot@example.com PRIVMSG #rust :Hello, world!"
        );
    }

    #[test]
    fn test_display_no_trailing() {
        assert_eq!(Message::join("#chan").to_string(), "JOIN #chan");
        assert_eq!(Message::pong(None).to_string(), "PONG");
    }

    #[test]
    fn test_display_empty_trailing_kept() {
        assert_eq!(Message::privmsg("#c", "").to_string(), "PRIVMSG #c :");
    }
}
