//! Byte-offset helpers over UTF-8 text

/// Largest char boundary `<= index`
pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut i = index;
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary `>= index`
pub fn ceil_char_boundary(text: &str, index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    let mut i = index;
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Up to `window` bytes of text ending at `start`
pub fn preceding(text: &str, start: usize, window: usize) -> &str {
    let end = floor_char_boundary(text, start);
    let begin = ceil_char_boundary(text, end.saturating_sub(window));
    &text[begin..end]
}

/// Up to `window` bytes of text starting at `end`
pub fn following(text: &str, end: usize, window: usize) -> &str {
    let begin = ceil_char_boundary(text, end);
    let stop = floor_char_boundary(text, begin.saturating_add(window));
    &text[begin..stop]
}

/// Whether `word` occurs in `haystack` with no letter or digit on either side
///
/// Both sides are compared as given; callers lowercase first.
pub fn contains_word(haystack: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }
    haystack.match_indices(word).any(|(i, _)| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Whether `start` lies in the leading or trailing region of the text
pub fn in_header_or_footer(
    start: usize,
    text_len: usize,
    header_fraction: f64,
    footer_fraction: f64,
) -> bool {
    if text_len == 0 {
        return false;
    }
    let position = start as f64 / text_len as f64;
    position < header_fraction || position >= 1.0 - footer_fraction
}
