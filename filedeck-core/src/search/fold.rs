//! Case folding with a map back to the original byte offsets.
//!
//! Lower-casing may change the byte length of non-ASCII characters, so every
//! byte of the folded text remembers where its character started in the
//! original. ASCII input keeps offsets unchanged and skips the map.

use std::ops::Range;

use memchr::memmem::Finder;

#[derive(Debug)]
pub(crate) struct Folded<'a> {
    original: &'a str,
    lowered: String,
    origin: Option<Vec<usize>>,
}

impl<'a> Folded<'a> {
    pub(crate) fn new(original: &'a str) -> Self {
        if original.is_ascii() {
            return Self {
                original,
                lowered: original.to_ascii_lowercase(),
                origin: None,
            };
        }

        let mut lowered = String::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len());
        for (at, c) in original.char_indices() {
            for lc in c.to_lowercase() {
                let before = lowered.len();
                lowered.push(lc);
                origin.resize(origin.len() + (lowered.len() - before), at);
            }
        }

        Self {
            original,
            lowered,
            origin: Some(origin),
        }
    }

    #[inline]
    fn to_original(&self, folded_at: usize) -> usize {
        match &self.origin {
            None => folded_at,
            Some(origin) => origin.get(folded_at).copied().unwrap_or(self.original.len()),
        }
    }

    /// Start offsets (in the folded text) of every occurrence of `needle`.
    ///
    /// After each hit the scan restarts one character past its start, so
    /// adjacent and overlapping repeats are all reported.
    pub(crate) fn starts<'s>(&'s self, needle: &'s Finder<'_>) -> impl Iterator<Item = usize> + 's {
        let hay = self.lowered.as_bytes();
        let mut pos = 0;
        std::iter::from_fn(move || {
            if needle.needle().is_empty() || pos > hay.len() {
                return None;
            }
            let start = pos + needle.find(&hay[pos..])?;
            let width = self.lowered[start..].chars().next().map_or(1, char::len_utf8);
            pos = start + width;
            Some(start)
        })
    }

    /// Original byte offset of a hit starting at `folded_start`.
    #[inline]
    pub(crate) fn original_offset(&self, folded_start: usize) -> usize {
        self.to_original(folded_start)
    }

    /// Original byte range covered by a hit of `len` folded bytes.
    pub(crate) fn original_span(&self, folded_start: usize, len: usize) -> Range<usize> {
        let start = self.to_original(folded_start);
        let last = self.to_original(folded_start + len.saturating_sub(1));
        let width = self.original[last..].chars().next().map_or(0, char::len_utf8);
        start..(last + width).min(self.original.len())
    }
}

/// Owned finder for a lower-cased term.
pub(crate) fn finder(term: &str) -> Finder<'static> {
    Finder::new(term.to_lowercase().as_bytes()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_starts() {
        let folded = Folded::new("aaa");
        let f = finder("aa");
        assert_eq!(folded.starts(&f).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn test_offsets_map_back_to_original() {
        // 'É' is two bytes in both cases; 'İ' lowers to three bytes.
        let text = "İx Éa éA";
        let folded = Folded::new(text);
        let f = finder("éa");
        let hits: Vec<_> = folded.starts(&f).map(|s| folded.original_offset(s)).collect();
        assert_eq!(hits, vec![4, 8]);
        assert_eq!(&text[4..7], "Éa");

        let span = folded.original_span(folded.starts(&f).next().unwrap(), f.needle().len());
        assert_eq!(&text[span], "Éa");
    }
}
