use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One passage of the body judged relevant to the query.
///
/// Offsets are character positions (Unicode scalar values) into the body
/// that was sent to the backend. Fields are private so that every value in
/// circulation has passed the invariant checks in [`SearchMatch::new`].
///
/// # Examples
///
/// ```
/// use sift_core::SearchMatch;
///
/// let m = SearchMatch::new("refunds within 30 days", 0.92, 120, 180, "mentions refunds").unwrap();
/// assert_eq!(m.span(), 120..180);
/// assert_eq!(m.relevance_score(), 0.92);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    text: String,
    relevance_score: f64,
    start_index: usize,
    end_index: usize,
    reasoning: String,
}

impl SearchMatch {
    /// Build a match, enforcing its invariants.
    ///
    /// # Errors
    ///
    /// - [`ParseError::InvalidField`] for empty `text` or `start_index > end_index`.
    /// - [`ParseError::ScoreOutOfRange`] if the score is not within `[0, 1]`.
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_core::{ParseError, SearchMatch};
    ///
    /// let err = SearchMatch::new("x", 0.5, 5, 3, "").unwrap_err();
    /// assert_eq!(err.field(), Some("startIndex"));
    /// ```
    pub fn new(
        text: impl Into<String>,
        relevance_score: f64,
        start_index: usize,
        end_index: usize,
        reasoning: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let text = text.into();
        if text.is_empty() {
            return Err(ParseError::invalid_field("text", "must not be empty"));
        }
        if !(0.0..=1.0).contains(&relevance_score) {
            return Err(ParseError::ScoreOutOfRange {
                value: relevance_score,
            });
        }
        if start_index > end_index {
            return Err(ParseError::invalid_field(
                "startIndex",
                format!("start {start_index} exceeds end {end_index}"),
            ));
        }
        Ok(Self {
            text,
            relevance_score,
            start_index,
            end_index,
            reasoning: reasoning.into(),
        })
    }

    /// The quoted excerpt.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Relevance in `[0, 1]`.
    pub fn relevance_score(&self) -> f64 {
        self.relevance_score
    }

    /// Character offset where the excerpt starts.
    pub fn start_index(&self) -> usize {
        self.start_index
    }

    /// Character offset one past the end of the excerpt.
    pub fn end_index(&self) -> usize {
        self.end_index
    }

    /// Why the backend considered this passage relevant. May be empty.
    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    /// `start_index..end_index`.
    pub fn span(&self) -> Range<usize> {
        self.start_index..self.end_index
    }
}

/// The validated outcome of one query.
///
/// `matches` keep the backend's order. `total_matches` is whatever the
/// backend reported, which may exceed `matches.len()` when the backend
/// truncated its list.
///
/// # Examples
///
/// ```
/// use sift_core::{SearchMatch, SearchResults};
///
/// let m = SearchMatch::new("a clause", 0.7, 0, 8, "").unwrap();
/// let results = SearchResults::new(vec![m], 3, "clauses");
/// assert!(results.is_truncated());
/// assert_eq!(results.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    matches: Vec<SearchMatch>,
    total_matches: usize,
    query_processed: String,
}

impl SearchResults {
    /// Assemble results from already-validated matches.
    pub fn new(
        matches: Vec<SearchMatch>,
        total_matches: usize,
        query_processed: impl Into<String>,
    ) -> Self {
        Self {
            matches,
            total_matches,
            query_processed: query_processed.into(),
        }
    }

    /// Matches in backend order (descending relevance as reported).
    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    /// Total count reported by the backend.
    pub fn total_matches(&self) -> usize {
        self.total_matches
    }

    /// The query string the backend says it answered.
    pub fn query_processed(&self) -> &str {
        &self.query_processed
    }

    /// Number of matches actually returned.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// `true` if the backend found nothing.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// `true` if the backend reports more matches than it returned.
    pub fn is_truncated(&self) -> bool {
        self.total_matches > self.matches.len()
    }

    /// `true` if the reported total differs from the returned count in either direction.
    pub fn has_count_mismatch(&self) -> bool {
        self.total_matches != self.matches.len()
    }

    /// Render the results as markdown.
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_core::SearchResults;
    ///
    /// let md = SearchResults::new(vec![], 0, "refunds").to_markdown();
    /// assert!(md.contains("# Search Results"));
    /// assert!(md.contains("No matches found."));
    /// ```
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Search Results\n\n");
        out.push_str(&format!(
            "**Query:** {} | **Matches:** {} (reported total: {})\n\n",
            self.query_processed,
            self.matches.len(),
            self.total_matches,
        ));

        if self.matches.is_empty() {
            out.push_str("No matches found.\n");
            return out;
        }

        for (i, m) in self.matches.iter().enumerate() {
            out.push_str(&format!(
                "## {}. `{}..{}` ({:.0}%)\n\n",
                i + 1,
                m.start_index,
                m.end_index,
                m.relevance_score * 100.0,
            ));
            for line in m.text.lines() {
                out.push_str(&format!("> {line}\n"));
            }
            out.push('\n');
            if !m.reasoning.is_empty() {
                out.push_str(&format!("{}\n\n", m.reasoning));
            }
        }
        out
    }
}

impl fmt::Display for SearchResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Search Results")?;
        writeln!(f, "==============")?;
        writeln!(
            f,
            "Query: {} | Matches: {} (reported total: {})\n",
            self.query_processed,
            self.matches.len(),
            self.total_matches,
        )?;

        if self.matches.is_empty() {
            return writeln!(f, "No matches found.");
        }

        for (i, m) in self.matches.iter().enumerate() {
            writeln!(
                f,
                "[{}] score {:.2} | chars {}..{}",
                i + 1,
                m.relevance_score,
                m.start_index,
                m.end_index,
            )?;
            writeln!(f, "  \"{}\"", m.text)?;
            if !m.reasoning.is_empty() {
                writeln!(f, "  Reasoning: {}", m.reasoning)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Output format for CLI results.
///
/// Implements [`FromStr`] so it can be used directly with `clap` argument parsing.
///
/// # Examples
///
/// ```
/// use sift_core::OutputFormat;
///
/// let fmt: OutputFormat = "json".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Json);
///
/// let fmt: OutputFormat = "md".parse().unwrap();
/// assert_eq!(fmt, OutputFormat::Markdown);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Machine-readable JSON with camelCase keys.
    Json,
    /// Markdown-formatted output.
    Markdown,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
