//! Message Text Utilities
//!
//! Sanitization, validation, and @mention extraction for chat content.

/// Maximum message length in characters, applied after trimming.
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Neutralize angle brackets so message text cannot smuggle markup.
///
/// Deliberately minimal: only `<` and `>` are escaped. Full sanitization is
/// a client rendering concern.
pub fn escape_html(text: &str) -> String {
    text.replace('<', "&lt;").replace('>', "&gt;")
}

/// Validate chat content: non-empty after trim and within the length bound.
///
/// Returns the trimmed content on success.
pub fn validate_content(text: &str) -> Result<&str, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("Message text must not be empty".into());
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message text exceeds {} characters",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(trimmed)
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Extract distinct `@username` mentions via a word-boundary token scan.
///
/// A mention token is an `@` at the start of the text or after a
/// non-username character, followed by at least one username character.
/// Order of first occurrence is preserved; duplicates are dropped.
pub fn extract_mentions(text: &str) -> Vec<String> {
    let mut mentions: Vec<String> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut prev: Option<char> = None;

    while let Some((idx, c)) = chars.next() {
        if c == '@' && prev.map_or(true, |p| !is_username_char(p)) {
            let rest = &text[idx + 1..];
            let end = rest
                .char_indices()
                .find(|(_, c)| !is_username_char(*c))
                .map(|(i, _)| i)
                .unwrap_or(rest.len());
            if end > 0 {
                let name = &rest[..end];
                if !mentions.iter().any(|m| m == name) {
                    mentions.push(name.to_string());
                }
            }
        }
        prev = Some(c);
    }

    mentions
}
