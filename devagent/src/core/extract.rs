//! Fence stripping for model-generated code.

const FENCE: &str = "```";

/// Strip markdown fence decoration from generated text.
///
/// With a fence present, keeps only what lies between the first opening fence and
/// the last closing fence, dropping a bare language tag that follows the opening
/// fence on the same line. Without a fence, returns the input trimmed.
pub fn extract_code(text: &str) -> String {
    let Some(open) = text.find(FENCE) else {
        return text.trim().to_string();
    };
    let after_open = &text[open + FENCE.len()..];
    let body = match after_open.rfind(FENCE) {
        Some(close) => &after_open[..close],
        None => after_open,
    };
    drop_language_tag(body).trim().to_string()
}

/// Drop the remainder of the opening fence line when it is empty or a bare tag.
fn drop_language_tag(body: &str) -> &str {
    let (first_line, rest) = match body.find('\n') {
        Some(idx) => (&body[..idx], &body[idx + 1..]),
        None => return body,
    };
    let tag = first_line.trim();
    if tag.is_empty() || is_language_tag(tag) {
        rest
    } else {
        body
    }
}

fn is_language_tag(candidate: &str) -> bool {
    candidate
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '.' | '-'))
}
