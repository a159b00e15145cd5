use std::path::PathBuf;

/// Errors that can occur across the Sift workspace.
///
/// Library crates return the narrower stage errors ([`SearchError`] and the
/// types it wraps); this type covers configuration, input, and serialization
/// around them. The binary converts to a `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use sift_core::SiftError;
///
/// let err = SiftError::Config("score_tolerance must be finite".into());
/// assert!(err.to_string().contains("score_tolerance"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SiftError {
    /// Filesystem or stdin I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Stdin was empty or contained only whitespace.
    #[error("no input provided via stdin")]
    #[diagnostic(help("pipe the text to search into sift, e.g. `cat notes.txt | sift \"refund policy\"`"))]
    EmptyInput,

    /// JSON serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The search itself failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Search(#[from] SearchError),
}

/// Failure to locate a JSON payload inside a backend reply.
///
/// # Examples
///
/// ```
/// use sift_core::ExtractionError;
///
/// let err = ExtractionError::UnbalancedBrackets { start: 12 };
/// assert!(err.to_string().contains("12"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    /// The text contains no opening `{` or `[` at all.
    #[error("no JSON object or array found in response")]
    NoJsonFound,

    /// A candidate opened at byte offset `start` but never closed.
    #[error("JSON starting at byte {start} is never closed (truncated response?)")]
    UnbalancedBrackets {
        /// Byte offset of the opening bracket.
        start: usize,
    },
}

/// Failure to turn extracted JSON into validated [`SearchResults`](crate::SearchResults).
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The text is not syntactically valid JSON.
    #[error("malformed JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// A field has the wrong type or violates an invariant.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// JSON key of the offending field.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A relevance score lies outside `[0, 1]` beyond the clamping tolerance.
    #[error("relevance score {value} is outside [0, 1]")]
    ScoreOutOfRange {
        /// The score as reported by the backend.
        value: f64,
    },
}

impl ParseError {
    /// Shorthand for [`ParseError::InvalidField`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sift_core::ParseError;
    ///
    /// let err = ParseError::invalid_field("endIndex", "expected a non-negative integer");
    /// assert_eq!(err.field(), Some("endIndex"));
    /// ```
    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field, for [`ParseError::InvalidField`] only.
    pub fn field(&self) -> Option<&str> {
        match self {
            ParseError::InvalidField { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Failure reported by the language-model backend.
///
/// The core treats the backend as opaque: transport, status, and response
/// shape problems are all surfaced through this type without retrying.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No API key in the config file or the provider's environment variable.
    #[error("no API key configured for provider '{provider}' (set {env_var})")]
    MissingApiKey {
        /// Provider name from `[llm] provider`.
        provider: String,
        /// Environment variable that was consulted.
        env_var: String,
    },

    /// The HTTP request could not be built or sent, or timed out.
    #[error("request failed: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("backend API error {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The provider answered successfully but without a text completion.
    #[error("unexpected response structure: {0}")]
    UnexpectedResponse(String),
}

/// Cause of [`SearchError::InvalidResponse`]: the reply reached us but was unusable.
#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    /// No JSON payload could be isolated.
    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    /// The payload was found but failed decoding or validation.
    #[error("{0}")]
    Parse(#[from] ParseError),
}

/// The single observable outcome of a failed search.
///
/// # Examples
///
/// ```
/// use sift_core::{ExtractionError, ResponseError, SearchError};
///
/// let err = SearchError::InvalidResponse(ResponseError::Extraction(ExtractionError::NoJsonFound));
/// assert!(err.to_string().starts_with("invalid response from backend"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SearchError {
    /// The backend call failed (network, auth, timeout, API error).
    #[error("backend error: {0}")]
    #[diagnostic(
        code(sift::backend),
        help("check the [llm] section of .sift.toml and that the provider is reachable")
    )]
    Backend(#[from] BackendError),

    /// The backend replied, but the reply could not be turned into results.
    #[error("invalid response from backend: {0}")]
    #[diagnostic(
        code(sift::invalid_response),
        help("the model did not return usable JSON; run with --verbose to see the raw reply")
    )]
    InvalidResponse(#[from] ResponseError),

    /// The pending backend call was aborted before it completed.
    #[error("search cancelled")]
    #[diagnostic(code(sift::cancelled))]
    Cancelled,
}

impl From<ExtractionError> for SearchError {
    fn from(err: ExtractionError) -> Self {
        SearchError::InvalidResponse(err.into())
    }
}

impl From<ParseError> for SearchError {
    fn from(err: ParseError) -> Self {
        SearchError::InvalidResponse(err.into())
    }
}
