//! Message content sanitization (XSS protection)

/// Escape the five HTML-significant characters.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Keep at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_special_characters() {
        assert_eq!(
            escape_html(r#"<script>alert("hola")</script>"#),
            "&lt;script&gt;alert(&quot;hola&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_escapes_single_quotes() {
        assert_eq!(
            escape_html("Este es un 'mensaje' con comillas."),
            "Este es un &#039;mensaje&#039; con comillas."
        );
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        let input = "Hola mundo, esto es un mensaje normal.";
        assert_eq!(escape_html(input), input);
        assert_eq!(escape_html(""), "");
    }

    #[test]
    fn test_ampersand_is_escaped_once() {
        assert_eq!(escape_html("a & b &amp;"), "a &amp; b &amp;amp;");
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("ñandú", 3), "ñan");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars(&"a".repeat(300), 255).len(), 255);
    }
}
