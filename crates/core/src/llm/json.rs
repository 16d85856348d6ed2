/// Pulls the JSON payload out of a model reply.
///
/// Handles fenced blocks, then falls back to the outermost `{..}` or `[..]` span.
pub fn extract_json(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        return Some(strip_code_fence(trimmed));
    }

    let start = trimmed.find(['{', '['])?;
    let close = if trimmed[start..].starts_with('{') { '}' } else { ']' };
    let end = trimmed.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(trimmed[start..=end].trim().to_string())
}

/// Removes an optional ```lang ... ``` wrapper and surrounding whitespace.
pub fn strip_code_fence(text: &str) -> String {
    let mut inner = text.trim();
    if inner.starts_with("```") {
        inner = match inner.split_once('\n') {
            Some((_, rest)) => rest,
            None => inner.trim_start_matches('`'),
        };
    }
    if let Some(stripped) = inner.trim_end().strip_suffix("```") {
        inner = stripped;
    }
    inner.trim().to_string()
}
