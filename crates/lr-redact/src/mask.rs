//! Length-preserving masking.
//!
//! The sensitive part of a match is replaced by the mask character repeated
//! once per character of the original; everything around it is reproduced
//! verbatim. Masking never adds or removes line breaks, separators or
//! quotes.

use std::ops::Range;

/// Default masking character.
pub const DEFAULT_MASK_CHAR: char = 'X';

/// Mask `captured`, wrapping the result in the literal prefix and suffix.
pub fn mask(captured: &str, literal_prefix: &str, literal_suffix: &str, mask_char: char) -> String {
    let width = captured.chars().count();
    let mut out = String::with_capacity(
        literal_prefix.len() + width * mask_char.len_utf8() + literal_suffix.len(),
    );
    out.push_str(literal_prefix);
    out.extend(std::iter::repeat(mask_char).take(width));
    out.push_str(literal_suffix);
    out
}

/// Mask the byte range `span` of `matched`, keeping the rest as-is.
///
/// `span` must lie on character boundaries of `matched`, which holds for
/// any capture-group offset taken relative to its enclosing match.
pub fn mask_span(matched: &str, span: Range<usize>, mask_char: char) -> String {
    mask(
        &matched[span.clone()],
        &matched[..span.start],
        &matched[span.end..],
        mask_char,
    )
}

/// Whether `text` is already fully masked.
///
/// Empty text is not considered masked.
pub fn is_masked(text: &str, mask_char: char) -> bool {
    !text.is_empty() && text.chars().all(|c| c == mask_char)
}
