/// True when `stem` is a lowercase UUID, the only file-stem shape the
/// scanner treats as a session transcript.
pub fn is_session_stem(stem: &str) -> bool {
    stem.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && uuid::Uuid::parse_str(stem).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_uuid() {
        assert!(is_session_stem("550e8400-e29b-41d4-a716-446655440000"));
    }

    #[test]
    fn rejects_uppercase_uuid() {
        assert!(!is_session_stem("550E8400-E29B-41D4-A716-446655440000"));
    }

    #[test]
    fn rejects_non_uuid() {
        assert!(!is_session_stem("not-a-uuid"));
        assert!(!is_session_stem(""));
    }
}
