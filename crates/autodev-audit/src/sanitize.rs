//! Log-injection defenses applied to every string that reaches the log

/// Substitute written in place of control characters
pub const REPLACEMENT_CHAR: char = '\u{FFFD}';

/// Maximum characters kept per context value
pub const MAX_CONTEXT_VALUE_LEN: usize = 1024;

const TRUNCATION_MARKER: &str = "[truncated]";

/// Replace every control character (Unicode category Cc) with [`REPLACEMENT_CHAR`].
///
/// Covers NUL, CR, LF, TAB, ESC and the C1 range, so a crafted value can
/// never start a new log line or smuggle terminal escapes into a viewer.
#[must_use]
pub fn sanitize(value: &str) -> String {
    if !value.chars().any(char::is_control) {
        return value.to_owned();
    }
    value
        .chars()
        .map(|c| if c.is_control() { REPLACEMENT_CHAR } else { c })
        .collect()
}

/// Truncate to at most `max_chars` characters, marking the cut.
#[must_use]
pub fn truncate(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        None => value.to_owned(),
        Some((byte_idx, _)) => {
            let mut out = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            out.push_str(&value[..byte_idx]);
            out.push_str(TRUNCATION_MARKER);
            out
        }
    }
}

/// Sanitize then truncate a context value.
#[must_use]
pub fn clean_value(value: &str) -> String {
    truncate(&sanitize(value), MAX_CONTEXT_VALUE_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_line_breaks_and_nul() {
        let out = sanitize("evil\npath\r\0end");
        assert_eq!(out, "evil\u{FFFD}path\u{FFFD}\u{FFFD}end");
    }

    #[test]
    fn sanitize_keeps_printable_unicode() {
        assert_eq!(sanitize("café/ファイル.json"), "café/ファイル.json");
    }

    #[test]
    fn sanitize_handles_c1_controls() {
        assert_eq!(sanitize("a\u{0085}b"), "a\u{FFFD}b");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let out = truncate("ééééé", 2);
        assert_eq!(out, "éé[truncated]");
    }

    #[test]
    fn truncate_is_noop_for_short_values() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exact", 5), "exact");
    }
}
