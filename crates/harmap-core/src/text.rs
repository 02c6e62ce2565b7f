//! Small string helpers shared by the prompt renderer and the verifier.

/// Truncates `s` to at most `max_chars` characters, appending `marker` when cut.
pub(crate) fn truncate_chars(s: &str, max_chars: usize, marker: &str) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], marker),
        None => s.to_string(),
    }
}
