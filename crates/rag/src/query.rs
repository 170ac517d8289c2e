//! Query truncation

/// Longest query the knowledge base accepts
pub const MAX_QUERY_CHARS: usize = 1000;

/// Last `max_chars` characters of `text`
///
/// Cuts on a character boundary, so multi-byte text is never split.
pub fn trailing_window(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match text.char_indices().rev().nth(max_chars - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(trailing_window("pool hours", 500), "pool hours");
        assert_eq!(trailing_window("", 500), "");
    }

    #[test]
    fn test_keeps_tail() {
        assert_eq!(trailing_window("abcdef", 3), "def");
        assert_eq!(trailing_window("abcdef", 6), "abcdef");
        assert_eq!(trailing_window("abcdef", 0), "");
    }

    #[test]
    fn test_multibyte_boundary() {
        let text = "café crème brûlée";
        let window = trailing_window(text, 6);
        assert_eq!(window, "brûlée");
        assert_eq!(window.chars().count(), 6);
    }

    #[test]
    fn test_long_transcript_window() {
        let transcript = format!("{}QUESTION: where is parking?", "x".repeat(2000));
        let window = trailing_window(&transcript, 500);
        assert_eq!(window.chars().count(), 500);
        assert!(window.ends_with("QUESTION: where is parking?"));
    }
}
