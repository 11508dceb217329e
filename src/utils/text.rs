//! Text handling helpers shared across the pipeline.

/// Truncate text to a maximum byte length (UTF-8 safe).
pub fn truncate_utf8(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    // Find a valid UTF-8 boundary at or before max_bytes
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Format a second offset as `MM:SS` for transcript timestamps.
///
/// Content longer than an hour rolls minutes past 59 rather than adding
/// an hour field, so timestamps stay sortable as plain strings.
pub fn format_timestamp(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Normalize a claim for cross-referencing: lowercase, punctuation
/// stripped, whitespace collapsed.
pub fn normalize_claim(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_was_space = false;
        } else if c.is_whitespace() || c.is_ascii_punctuation() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Sample head, middle, and tail segments of long text.
///
/// Used by tone detection to catch drift across long content. Returns the
/// whole text when it fits inside three segments.
pub fn sample_segments(text: &str, segment_bytes: usize) -> String {
    if text.len() <= segment_bytes * 3 {
        return text.to_string();
    }
    let head = truncate_utf8(text, segment_bytes);

    let mut mid_start = text.len() / 2;
    while mid_start < text.len() && !text.is_char_boundary(mid_start) {
        mid_start += 1;
    }
    let middle = truncate_utf8(&text[mid_start..], segment_bytes);

    let mut tail_start = text.len().saturating_sub(segment_bytes);
    while tail_start < text.len() && !text.is_char_boundary(tail_start) {
        tail_start += 1;
    }
    let tail = &text[tail_start..];

    format!("{head}\n[...]\n{middle}\n[...]\n{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_utf8_ascii() {
        assert_eq!(truncate_utf8("hello world", 5), "hello");
        assert_eq!(truncate_utf8("hi", 100), "hi");
    }

    #[test]
    fn test_truncate_utf8_multibyte_boundary() {
        // é is two bytes; truncating mid-char must back off
        let s = "caf\u{e9} au lait";
        let t = truncate_utf8(s, 4);
        assert_eq!(t, "caf");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "00:00");
        assert_eq!(format_timestamp(90), "01:30");
        assert_eq!(format_timestamp(3725), "62:05");
    }

    #[test]
    fn test_normalize_claim() {
        assert_eq!(
            normalize_claim("The Earth is FLAT, actually!"),
            "the earth is flat actually"
        );
        assert_eq!(normalize_claim("  spaced   out  "), "spaced out");
        assert_eq!(normalize_claim("a.b.c"), "a b c");
    }

    #[test]
    fn test_sample_segments_short_passthrough() {
        assert_eq!(sample_segments("short", 100), "short");
    }

    #[test]
    fn test_sample_segments_long() {
        let text = "a".repeat(1000);
        let sampled = sample_segments(&text, 100);
        assert!(sampled.contains("[...]"));
        assert!(sampled.len() < text.len());
    }
}
