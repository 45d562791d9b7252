use memchr::memchr;

use crate::models::Citation;

/// One piece of an assistant answer: literal text, or a citation marker with
/// the exact span it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Plain(&'a str),
    Citation { citation: Citation, raw: &'a str },
}

/// Collects every well-formed `(page: N, chunk: M)` marker in occurrence
/// order. Duplicates are kept. Malformed near-misses are skipped, never an
/// error.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    let mut citations = Vec::new();
    let mut pos = 0;

    while let Some(found) = memchr(b'(', &text.as_bytes()[pos..]) {
        let start = pos + found;
        match parse_marker(&text[start..]) {
            Some((citation, len)) => {
                citations.push(citation);
                pos = start + len;
            }
            None => pos = start + 1,
        }
    }

    citations
}

/// Splits text into plain runs and citation markers. Concatenating the plain
/// slices and the citation `raw` spans in order reproduces the input exactly;
/// empty plain segments are never emitted.
pub fn segment_text(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;

    while let Some(found) = memchr(b'(', &text.as_bytes()[pos..]) {
        let start = pos + found;
        match parse_marker(&text[start..]) {
            Some((citation, len)) => {
                if plain_start < start {
                    segments.push(Segment::Plain(&text[plain_start..start]));
                }
                segments.push(Segment::Citation {
                    citation,
                    raw: &text[start..start + len],
                });
                pos = start + len;
                plain_start = pos;
            }
            None => pos = start + 1,
        }
    }

    if plain_start < text.len() {
        segments.push(Segment::Plain(&text[plain_start..]));
    }

    segments
}

// Marker grammar: "(page:" ws* digits "," ws* "chunk:" ws* digits ")".
// Whitespace is allowed only in those three gaps. Returns the citation and
// the byte length of the matched span, or None for anything malformed,
// including page 0 (pages are 1-based) and numbers that overflow u32.
fn parse_marker(input: &str) -> Option<(Citation, usize)> {
    let rest = input.strip_prefix("(page:")?;
    let (page, rest) = take_number(rest.trim_start())?;
    let rest = rest.strip_prefix(',')?;
    let rest = rest.trim_start().strip_prefix("chunk:")?;
    let (chunk_id, rest) = take_number(rest.trim_start())?;
    let rest = rest.strip_prefix(')')?;

    if page == 0 {
        return None;
    }

    let len = input.len() - rest.len();
    Some((Citation { page, chunk_id }, len))
}

fn take_number(input: &str) -> Option<(u32, &str)> {
    let end = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    let value = input[..end].parse::<u32>().ok()?;
    Some((value, &input[end..]))
}
