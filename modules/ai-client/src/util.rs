/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

/// Strip markdown code fences from a model response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```JSON")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Slice out the outermost JSON array or object from a chatty response.
///
/// Models sometimes wrap the payload in prose ("Here are the events: [...]").
/// Returns the fence-stripped input unchanged when no bracket pair is found.
pub fn json_payload(response: &str) -> &str {
    let stripped = strip_code_blocks(response);
    let start = match stripped.find(['[', '{']) {
        Some(i) => i,
        None => return stripped,
    };
    let close = if stripped.as_bytes()[start] == b'[' { ']' } else { '}' };
    match stripped.rfind(close) {
        Some(end) if end > start => &stripped[start..=end],
        _ => stripped,
    }
}
