//! # Text Utilities
//!
//! Helpers for user-supplied message text.

/// Truncate `value` to at most `max_chars` Unicode scalar values.
///
/// Returns the input unchanged when it already fits.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}

/// Case-insensitive substring check.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
