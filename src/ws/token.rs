use uuid::Uuid;

/// Mint an opaque, unguessable identifier (128 random bits, hex-encoded).
///
/// Used for session ids, host tokens and participant tokens alike.
pub fn issue_token() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_hex_and_distinct() {
        let tokens: HashSet<String> = (0..100).map(|_| issue_token()).collect();
        assert_eq!(tokens.len(), 100);
        for token in &tokens {
            assert_eq!(token.len(), 32);
            assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
