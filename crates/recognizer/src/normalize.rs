//! Text normalization for fuzzy comparison.
//!
//! Lower-cases, applies NFKD, drops combining marks and turns every run of
//! non-alphanumeric characters into a single space. Each normalized byte
//! remembers which raw character produced it, so regex captures on the
//! normalized text can be reported with the user's original spelling.

use std::ops::Range;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize `input` for comparison. Idempotent.
pub fn normalize(input: &str) -> String {
    NormalizedText::new(input).text
}

/// Normalized text plus a map back into the raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    text: String,
    /// For every byte of `text`, the byte range of the raw char it came from.
    origins: Vec<Range<usize>>,
}

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        let mut text = String::with_capacity(raw.len());
        let mut origins = Vec::with_capacity(raw.len());
        let mut pending_separator: Option<Range<usize>> = None;

        for (start, raw_char) in raw.char_indices() {
            let origin = start..start + raw_char.len_utf8();

            for folded in raw_char
                .to_lowercase()
                .nfkd()
                .flat_map(char::to_lowercase)
                .filter(|c| !is_combining_mark(*c))
            {
                if !folded.is_alphanumeric() {
                    pending_separator.get_or_insert_with(|| origin.clone());
                    continue;
                }
                if let Some(sep) = pending_separator.take() {
                    if !text.is_empty() {
                        text.push(' ');
                        origins.push(sep);
                    }
                }
                text.push(folded);
                origins.extend(std::iter::repeat_n(origin.clone(), folded.len_utf8()));
            }
        }

        Self { text, origins }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Map a byte range of the normalized text back to a byte range of the raw input.
    ///
    /// The result always covers whole raw characters.
    pub fn raw_range(&self, normalized: Range<usize>) -> Option<Range<usize>> {
        if normalized.start > normalized.end || normalized.end > self.origins.len() {
            return None;
        }
        if normalized.is_empty() {
            let at = self
                .origins
                .get(normalized.start)
                .map(|o| o.start)
                .or_else(|| self.origins.last().map(|o| o.end))?;
            return Some(at..at);
        }
        let start = self.origins[normalized.start].start;
        let end = self.origins[normalized.end - 1].end;
        Some(start..end)
    }
}
