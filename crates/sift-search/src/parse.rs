//! Decode and validate extracted JSON into [`SearchResults`].

use serde_json::{Map, Value};
use sift_core::{ParseError, SearchMatch, SearchResults};
use tracing::{debug, warn};

/// Scores this far outside `[0, 1]` are clamped instead of rejected.
pub const DEFAULT_SCORE_TOLERANCE: f64 = 1e-4;

/// Validating decoder for backend search replies.
///
/// Without context it checks each match on its own. Supplying the body
/// enables the `endIndex <= len(body)` bound, and supplying the query fills
/// in a missing `queryProcessed` and reports drift.
///
/// # Examples
///
/// ```
/// use sift_search::parse::ResponseParser;
///
/// let body = "Refunds are issued within 30 days of purchase.";
/// let json = r#"{"matches":[{"text":"Refunds are issued","relevanceScore":0.9,"startIndex":0,"endIndex":18}]}"#;
/// let results = ResponseParser::new()
///     .with_body(body)
///     .with_query("refund policy")
///     .parse(json)
///     .unwrap();
/// assert_eq!(results.total_matches(), 1);
/// assert_eq!(results.query_processed(), "refund policy");
/// ```
#[derive(Debug, Clone)]
pub struct ResponseParser<'a> {
    score_tolerance: f64,
    body_len: Option<usize>,
    query: Option<&'a str>,
}

impl Default for ResponseParser<'_> {
    fn default() -> Self {
        Self {
            score_tolerance: DEFAULT_SCORE_TOLERANCE,
            body_len: None,
            query: None,
        }
    }
}

impl<'a> ResponseParser<'a> {
    /// A parser with the default tolerance and no context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the clamping tolerance for relevance scores.
    pub fn with_score_tolerance(mut self, tolerance: f64) -> Self {
        self.score_tolerance = tolerance;
        self
    }

    /// Bound `endIndex` by the character length of `body`.
    pub fn with_body(mut self, body: &str) -> Self {
        self.body_len = Some(body.chars().count());
        self
    }

    /// The query that was sent, used as the `queryProcessed` fallback.
    pub fn with_query(mut self, query: &'a str) -> Self {
        self.query = Some(query);
        self
    }

    /// Decode `json_text` into validated results.
    ///
    /// The top level may be an object with a `matches` array, or a bare
    /// array of matches. A missing `matches` means zero matches.
    ///
    /// # Errors
    ///
    /// - [`ParseError::MalformedJson`] on a syntax error.
    /// - [`ParseError::InvalidField`] when a field has the wrong type or an
    ///   offset invariant is violated; the field is named by its JSON key.
    /// - [`ParseError::ScoreOutOfRange`] when a score lies outside `[0, 1]`
    ///   by more than the tolerance.
    pub fn parse(&self, json_text: &str) -> Result<SearchResults, ParseError> {
        let value: Value = serde_json::from_str(json_text)?;

        let (matches_value, root) = match &value {
            Value::Object(map) => (map.get("matches"), Some(map)),
            Value::Array(_) => (Some(&value), None),
            _ => {
                return Err(ParseError::invalid_field(
                    "matches",
                    "expected a JSON object or an array of matches",
                ))
            }
        };

        let matches = match matches_value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.parse_match(i, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(ParseError::invalid_field("matches", "expected an array")),
        };

        let total_matches = match root.and_then(|r| r.get("totalMatches")) {
            None | Some(Value::Null) => matches.len(),
            Some(v) => as_offset(v).ok_or_else(|| {
                ParseError::invalid_field("totalMatches", "expected a non-negative integer")
            })?,
        };
        if total_matches != matches.len() {
            warn!(
                reported = total_matches,
                returned = matches.len(),
                "backend match count does not agree with the matches returned"
            );
        }

        let query_processed = match root.and_then(|r| r.get("queryProcessed")) {
            None | Some(Value::Null) => self.query.unwrap_or_default().to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(ParseError::invalid_field(
                    "queryProcessed",
                    "expected a string",
                ))
            }
        };
        if let Some(query) = self.query {
            if query_processed != query {
                warn!(
                    query,
                    query_processed = %query_processed,
                    "backend answered a different query than the one sent"
                );
            }
        }

        Ok(SearchResults::new(matches, total_matches, query_processed))
    }

    fn parse_match(&self, i: usize, item: &Value) -> Result<SearchMatch, ParseError> {
        let Some(obj) = item.as_object() else {
            return Err(ParseError::invalid_field(
                "matches",
                format!("entry {i} is not an object"),
            ));
        };

        let text = match obj.get("text") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) => {
                return Err(ParseError::invalid_field(
                    "text",
                    format!("entry {i} has empty text"),
                ))
            }
            _ => {
                return Err(ParseError::invalid_field(
                    "text",
                    format!("entry {i}: expected a string"),
                ))
            }
        };

        let raw_score = obj
            .get("relevanceScore")
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                ParseError::invalid_field("relevanceScore", format!("entry {i}: expected a number"))
            })?;
        let score = self.normalize_score(raw_score)?;

        let start = offset_field(obj, "startIndex", i)?;
        let end = offset_field(obj, "endIndex", i)?;
        if start > end {
            return Err(ParseError::invalid_field(
                "startIndex",
                format!("entry {i}: start {start} exceeds end {end}"),
            ));
        }
        if let Some(len) = self.body_len {
            if end > len {
                return Err(ParseError::invalid_field(
                    "endIndex",
                    format!("entry {i}: end {end} is past the end of the body ({len} chars)"),
                ));
            }
        }

        let reasoning = match obj.get("reasoning") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(ParseError::invalid_field(
                    "reasoning",
                    format!("entry {i}: expected a string"),
                ))
            }
        };

        SearchMatch::new(text, score, start, end, reasoning)
    }

    fn normalize_score(&self, raw: f64) -> Result<f64, ParseError> {
        if (0.0..=1.0).contains(&raw) {
            return Ok(raw);
        }
        let tol = self.score_tolerance;
        if raw >= -tol && raw <= 1.0 + tol {
            debug!(raw, "clamping relevance score into [0, 1]");
            return Ok(raw.clamp(0.0, 1.0));
        }
        Err(ParseError::ScoreOutOfRange { value: raw })
    }
}

/// Decode `json_text` with default settings and no body/query context.
///
/// # Errors
///
/// See [`ResponseParser::parse`].
///
/// # Examples
///
/// ```
/// use sift_search::parse::parse_response;
///
/// let results = parse_response(r#"{"matches": [], "totalMatches": 0, "queryProcessed": "x"}"#).unwrap();
/// assert!(results.is_empty());
/// ```
pub fn parse_response(json_text: &str) -> Result<SearchResults, ParseError> {
    ResponseParser::new().parse(json_text)
}

fn offset_field(obj: &Map<String, Value>, key: &str, i: usize) -> Result<usize, ParseError> {
    obj.get(key).and_then(as_offset).ok_or_else(|| {
        ParseError::invalid_field(key, format!("entry {i}: expected a non-negative integer"))
    })
}

/// Non-negative integer, also accepting integral floats such as `120.0`.
fn as_offset(v: &Value) -> Option<usize> {
    if let Some(n) = v.as_u64() {
        return usize::try_from(n).ok();
    }
    let f = v.as_f64()?;
    if f >= 0.0 && f.fract() == 0.0 {
        Some(f as usize)
    } else {
        None
    }
}
