//! Extension normalization.
//!
//! Registries record extensions in different shapes: `pdf`, `.PDF`, `*.pdf`. Uniqueness
//! comparisons are plain string equality, so every registry (and every observed
//! collection) goes through [`normalize_extension`] before any set is built.

/// Normalizes a raw extension entry, returning `None` for malformed entries.
///
/// The entry is trimmed, a leading glob `*` and any leading dots are stripped and the
/// remainder is lowercased. Entries that end up empty, or that contain whitespace, a
/// path separator or a control character, are rejected.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix('*').unwrap_or(trimmed);
    let stripped = stripped.trim_start_matches('.');

    if stripped.is_empty() || !stripped.chars().all(is_extension_char) {
        return None;
    }

    Some(stripped.to_lowercase())
}

/// Returns whether a normalized extension consists of ASCII digits only
/// (e.g. split-archive volumes such as `001`).
pub fn is_numeric(ext: &str) -> bool {
    !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_digit())
}

#[inline]
fn is_extension_char(c: char) -> bool {
    !(c.is_whitespace() || c.is_control() || c == '/' || c == '\\')
}
