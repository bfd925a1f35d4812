/// Extract `@name` mentions from message content: runs of
/// `[A-Za-z0-9_-]` following an `@`, returned in first-seen order with
/// duplicates removed and case preserved (spec §4.6's mention grammar).
pub fn parse_mentions(content: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut mentions = Vec::new();
    let bytes = content.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'@' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && is_mention_char(bytes[end]) {
                end += 1;
            }
            if end > start {
                let name = &content[start..end];
                if seen.insert(name.to_string()) {
                    mentions.push(name.to_string());
                }
                i = end;
                continue;
            }
        }
        i += 1;
    }
    mentions
}

fn is_mention_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_mention() {
        assert_eq!(
            parse_mentions("Found a bug. @zealot-2 please review"),
            vec!["zealot-2".to_string()]
        );
    }

    #[test]
    fn dedupes_while_preserving_order_and_case() {
        assert_eq!(
            parse_mentions("@Alice and @Bob, also @Alice again"),
            vec!["Alice".to_string(), "Bob".to_string()]
        );
    }

    #[test]
    fn ignores_bare_at_sign() {
        assert_eq!(parse_mentions("email me @ noon"), Vec::<String>::new());
    }

    #[test]
    fn no_mentions_returns_empty() {
        assert!(parse_mentions("nothing to see here").is_empty());
    }
}
