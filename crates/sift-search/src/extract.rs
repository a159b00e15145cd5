//! Locate the JSON payload inside a free-form model reply.
//!
//! Models wrap their answer in prose, in fenced code blocks, or both, and
//! sometimes emit a short example object before the real one. A fenced
//! `json` (or untagged) block that parses is taken as-is. Otherwise the
//! reply is scanned once for balanced `{...}` / `[...]` spans and the
//! longest one that is valid JSON wins.

use std::ops::Range;

use serde::de::IgnoredAny;
use sift_core::ExtractionError;
use tracing::debug;

const FENCE: &str = "```";

/// Return the most plausible top-level JSON object or array in `text`.
///
/// The returned slice borrows from `text`, byte-for-byte.
///
/// # Errors
///
/// - [`ExtractionError::NoJsonFound`] if no bracketed candidate exists.
/// - [`ExtractionError::UnbalancedBrackets`] if a candidate carrying JSON
///   structure opens but never closes, which is what a truncated reply
///   looks like. An earlier complete object does not mask it.
///
/// # Examples
///
/// ```
/// use sift_search::extract::extract_json;
///
/// let reply = "Sure! Here you go: {\"matches\": []} Hope that helps.";
/// assert_eq!(extract_json(reply).unwrap(), "{\"matches\": []}");
/// ```
pub fn extract_json(text: &str) -> Result<&str, ExtractionError> {
    if let Some(body) = fenced_json(text) {
        return Ok(body);
    }

    let scan = scan_candidates(text);
    let mut ranked = scan.balanced;
    ranked.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));

    let chosen = match ranked.iter().find(|span| is_json(&text[(*span).clone()])) {
        Some(span) => Some(span.clone()),
        None => {
            if !ranked.is_empty() {
                debug!("no balanced candidate is valid JSON, using the longest");
            }
            ranked.first().cloned()
        }
    };

    match (chosen, scan.unclosed) {
        (Some(span), Some(start)) if open_tail_is_structured(text, &span, start) => {
            debug!(start, "JSON candidate is never closed");
            Err(ExtractionError::UnbalancedBrackets { start })
        }
        (Some(span), _) => Ok(&text[span]),
        (None, Some(start)) => Err(ExtractionError::UnbalancedBrackets { start }),
        (None, None) => Err(ExtractionError::NoJsonFound),
    }
}

fn is_json(candidate: &str) -> bool {
    serde_json::from_str::<IgnoredAny>(candidate).is_ok()
}

/// First fenced block tagged `json` (or untagged) whose body is valid JSON.
///
/// Fences count only at the start of a line, so inline backticks in prose
/// cannot pair up with a real block.
fn fenced_json(text: &str) -> Option<&str> {
    let mut fences = fence_lines(text);
    while let Some((_, body_start, tag)) = fences.next() {
        let Some((close, _, _)) = fences.next() else {
            break;
        };
        if !(tag.is_empty() || tag.eq_ignore_ascii_case("json")) {
            continue;
        }
        let body = text[body_start..close].trim();
        let looks_structured = body.starts_with('{') || body.starts_with('[');
        if looks_structured && is_json(body) {
            return Some(body);
        }
        debug!(tag, "skipping fenced block that is not valid JSON");
    }
    None
}

/// `(line_start, next_line_start, info_string)` for each fence line.
fn fence_lines(text: &str) -> impl Iterator<Item = (usize, usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n').filter_map(move |line| {
        let start = offset;
        offset += line.len();
        line.trim_start()
            .strip_prefix(FENCE)
            .map(|info| (start, offset, info.trim()))
    })
}

struct Scan {
    /// Every balanced span, nested ones included.
    balanced: Vec<Range<usize>>,
    /// Start of the outermost candidate still open at the end of the text.
    unclosed: Option<usize>,
}

/// Single pass over `text` pairing brackets with a stack.
///
/// Quotes are tracked only inside a candidate, so prose quotation marks do
/// not hide brackets. A closer of the wrong kind abandons everything still
/// open; spans that already closed are kept. All structural bytes are
/// ASCII, so every recorded index is a char boundary.
fn scan_candidates(text: &str) -> Scan {
    let mut balanced = Vec::new();
    let mut open: Vec<(u8, usize)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'{' | b'[' => open.push((b, i)),
            b'"' if !open.is_empty() => in_string = true,
            b'}' | b']' => {
                let expected = if b == b'}' { b'{' } else { b'[' };
                match open.pop() {
                    Some((opener, start)) if opener == expected => balanced.push(start..i + 1),
                    Some(_) => open.clear(),
                    None => {}
                }
            }
            _ => {}
        }
    }

    Scan {
        balanced,
        unclosed: open.first().map(|&(_, start)| start),
    }
}

/// Whether the text left open from `start` looks like cut-off JSON rather
/// than a stray bracket in prose. `chosen` is excluded when it lies inside.
fn open_tail_is_structured(text: &str, chosen: &Range<usize>, start: usize) -> bool {
    let structured = |s: &str| s.contains(['"', ':']);
    if chosen.start > start {
        structured(&text[start..chosen.start]) || structured(&text[chosen.end..])
    } else {
        structured(&text[start..])
    }
}
