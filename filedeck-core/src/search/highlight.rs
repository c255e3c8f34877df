//! Splitting text into plain and highlighted runs for renderers.

use crate::search::fold::{Folded, finder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Highlight(&'a str),
}

impl<'a> Segment<'a> {
    #[must_use]
    pub const fn text(&self) -> &'a str {
        match self {
            Self::Plain(s) | Self::Highlight(s) => s,
        }
    }

    #[must_use]
    pub const fn is_highlight(&self) -> bool {
        matches!(self, Self::Highlight(_))
    }
}

/// Case-insensitive highlight of every occurrence of `term` in `text`.
///
/// Overlapping occurrences merge into one highlighted run.
#[must_use]
pub fn highlight<'a>(text: &'a str, term: &str) -> Vec<Segment<'a>> {
    if term.is_empty() || text.is_empty() {
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Plain(text)]
        };
    }

    let needle = finder(term);
    let folded = Folded::new(text);

    let mut runs: Vec<(usize, usize)> = Vec::new();
    for start in folded.starts(&needle) {
        let span = folded.original_span(start, needle.needle().len());
        match runs.last_mut() {
            Some(last) if span.start <= last.1 => last.1 = last.1.max(span.end),
            _ => runs.push((span.start, span.end)),
        }
    }

    let mut segments = Vec::with_capacity(runs.len() * 2 + 1);
    let mut pos = 0;
    for (start, end) in runs {
        if start > pos {
            segments.push(Segment::Plain(&text[pos..start]));
        }
        segments.push(Segment::Highlight(&text[start..end]));
        pos = end;
    }
    if pos < text.len() {
        segments.push(Segment::Plain(&text[pos..]));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_runs() {
        let segs = highlight("Read me, READ you", "read");
        assert_eq!(
            segs,
            vec![
                Segment::Highlight("Read"),
                Segment::Plain(" me, "),
                Segment::Highlight("READ"),
                Segment::Plain(" you"),
            ]
        );
    }

    #[test]
    fn test_overlaps_merge() {
        assert_eq!(
            highlight("xaaax", "aa"),
            vec![
                Segment::Plain("x"),
                Segment::Highlight("aaa"),
                Segment::Plain("x"),
            ]
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(highlight("abc", ""), vec![Segment::Plain("abc")]);
        assert!(highlight("", "a").is_empty());
    }
}
