//! Text helpers for snippets and rendered output

/// Normalize text by collapsing runs of whitespace
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to at most `max_chars` characters, appending `...` when shortened
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// Keep the first `max_chars` characters without adding an ellipsis
pub fn clip_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  a \n\t b  c "), "a b c");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 5), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w...");
    }

    #[test]
    fn test_clip_chars() {
        assert_eq!(clip_chars("ünïcode", 3), "ünï");
        assert_eq!(clip_chars("ab", 3), "ab");
    }
}
