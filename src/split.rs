//! Splitting long PRIVMSG/NOTICE payloads into wire-sized chunks.
//!
//! The server relays our messages with our full prefix prepended:
//!
//! ```text
//! :<nick>!<user>@<host> PRIVMSG <target> :<text>
//! ```
//!
//! so the text budget of each line depends on how long our own prefix looks
//! from the outside. The connection keeps a live estimate of that length and
//! passes it in here.

use slirc_proto::MAX_LINE_LEN;

/// Host length assumed until the server shows us our real prefix.
pub const DEFAULT_HOST_ESTIMATE: usize = 63;

/// Prefix length estimate for a nick/user pair whose host is not yet known.
pub fn estimate_prefix_len(nick: &str, user: &str) -> usize {
    nick.len() + 1 + user.len() + 1 + DEFAULT_HOST_ESTIMATE
}

/// Bytes available for the text of one `<command> <target> :<text>` line.
///
/// Overhead is `:` + prefix + ` ` + command + ` ` + target + ` :`.
pub fn text_budget(command: &str, target: &str, prefix_len: usize) -> usize {
    let overhead = 1 + prefix_len + 1 + command.len() + 1 + target.len() + 2;
    MAX_LINE_LEN.saturating_sub(overhead)
}

/// Split `text` into chunks of at most `budget` bytes.
///
/// Chunks are cut on UTF-8 character boundaries and are as long as the budget
/// allows, so concatenating them yields `text` unchanged. Empty input yields
/// no chunks. A budget too small for the next character still emits that
/// character on its own rather than looping forever.
pub fn split_text(text: &str, budget: usize) -> Vec<&str> {
    let mut chunks = Vec::with_capacity(text.len() / budget.max(1) + 1);
    let mut rest = text;

    while !rest.is_empty() {
        if rest.len() <= budget {
            chunks.push(rest);
            break;
        }

        let mut end = budget;
        while end > 0 && !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }

        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_text("hello", 100), vec!["hello"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(split_text("", 100).is_empty());
    }

    #[test]
    fn test_exact_budget_is_one_chunk() {
        assert_eq!(split_text("abcd", 4), vec!["abcd"]);
        assert_eq!(split_text("abcde", 4), vec!["abcd", "e"]);
    }

    #[test]
    fn test_multibyte_not_cut() {
        // "é" is two bytes; a budget of 3 fits one and a half.
        assert_eq!(split_text("ééé", 3), vec!["é", "é", "é"]);
    }

    #[test]
    fn test_tiny_budget_still_progresses() {
        assert_eq!(split_text("日本", 1), vec!["日", "本"]);
        assert_eq!(split_text("ab", 0), vec!["a", "b"]);
    }

    #[test]
    fn test_budget_accounts_for_prefix() {
        // ":" + 20 + " " + "PRIVMSG" + " " + "#chan" + " :" = 37
        assert_eq!(text_budget("PRIVMSG", "#chan", 20), 510 - 37);
    }

    #[test]
    fn test_budget_never_underflows() {
        let target = "#".repeat(600);
        assert_eq!(text_budget("PRIVMSG", &target, 80), 0);
    }

    #[test]
    fn test_estimate_uses_default_host() {
        assert_eq!(estimate_prefix_len("ugjka", "ugjka"), 5 + 1 + 5 + 1 + 63);
    }

    proptest! {
        #[test]
        fn prop_chunks_reassemble_exactly(text in "\\PC{0,2000}", budget in 1usize..600) {
            let chunks = split_text(&text, budget);
            prop_assert_eq!(chunks.concat(), text);
        }

        #[test]
        fn prop_chunks_fit_and_are_maximal(text in "\\PC{1,2000}", budget in 4usize..600) {
            let chunks = split_text(&text, budget);
            let last = chunks.len() - 1;
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert!(!chunk.is_empty());
                prop_assert!(chunk.len() <= budget);
                if i < last {
                    // The next character would not have fit.
                    let next = chunks[i + 1].chars().next().map_or(0, char::len_utf8);
                    prop_assert!(chunk.len() + next > budget);
                }
            }
        }

        #[test]
        fn prop_lines_stay_within_wire_limit(
            text in "[a-z ]{1,3000}",
            target in "#[a-z]{1,40}",
            prefix_len in 10usize..120,
        ) {
            let budget = text_budget("PRIVMSG", &target, prefix_len);
            for chunk in split_text(&text, budget) {
                let relayed = 1 + prefix_len + 1 + "PRIVMSG".len() + 1 + target.len() + 2 + chunk.len();
                prop_assert!(relayed <= MAX_LINE_LEN);
            }
        }
    }
}
