use unicode_normalization::UnicodeNormalization;

/// Normalize text read from a DOM text node.
///
/// Applies NFC composition, turns non-breaking spaces into plain spaces,
/// collapses whitespace runs and trims. Returns `None` when nothing is left.
pub fn clean(raw: &str) -> Option<String> {
    let composed: String = raw.nfc().collect();
    let collapsed = composed
        .split(|c: char| c.is_whitespace() || c == '\u{00A0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

/// Clean every segment and drop the empty ones.
///
/// Returns `None` when no segment survives, matching how an empty subtitle
/// panel is treated.
pub fn clean_segments<S: AsRef<str>>(segments: &[S]) -> Option<Vec<String>> {
    let cleaned: Vec<String> = segments
        .iter()
        .filter_map(|s| clean(s.as_ref()))
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
