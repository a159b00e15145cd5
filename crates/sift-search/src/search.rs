//! Search orchestration: prompt, one backend call, extraction, validation.

use sift_core::{SearchConfig, SearchError, SearchResults};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::extract::extract_json;
use crate::llm::Backend;
use crate::parse::ResponseParser;
use crate::prompt;

/// Runs semantic searches against a [`Backend`].
///
/// Holds no mutable state, so one `Searcher` can serve any number of
/// concurrent searches.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use sift_core::{BackendError, SearchConfig};
/// use sift_search::llm::{Backend, CompletionRequest};
/// use sift_search::search::Searcher;
///
/// struct Canned;
///
/// #[async_trait]
/// impl Backend for Canned {
///     async fn complete(&self, _request: &CompletionRequest) -> Result<String, BackendError> {
///         Ok(r#"{"matches": [], "totalMatches": 0, "queryProcessed": "q"}"#.into())
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let searcher = Searcher::new(Canned, SearchConfig::default());
/// let results = searcher.search("q", "some body").await.unwrap();
/// assert!(results.is_empty());
/// # });
/// ```
pub struct Searcher<B> {
    backend: B,
    config: SearchConfig,
}

impl<B: Backend> Searcher<B> {
    /// Create a searcher over `backend` with the given validation settings.
    pub fn new(backend: B, config: SearchConfig) -> Self {
        Self { backend, config }
    }

    /// The backend this searcher calls.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Ask the backend for passages of `body` relevant to `query`.
    ///
    /// Makes exactly one backend call. The result is either fully validated
    /// or an error; partial match lists are never returned.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Backend`] if the backend call fails.
    /// - [`SearchError::InvalidResponse`] if no JSON can be extracted from
    ///   the reply or it fails validation.
    pub async fn search(&self, query: &str, body: &str) -> Result<SearchResults, SearchError> {
        let request = prompt::build_request(query, body);
        debug!(
            model = self.backend.model(),
            query_chars = query.chars().count(),
            body_chars = body.chars().count(),
            "sending search request"
        );
        let reply = self.backend.complete(&request).await?;
        self.interpret(query, body, &reply)
    }

    /// Like [`Searcher::search`], but abandons the backend call when `cancel`
    /// fires.
    ///
    /// # Errors
    ///
    /// As [`Searcher::search`], plus [`SearchError::Cancelled`] if the token
    /// is cancelled before the backend replies. No parsing happens then.
    pub async fn search_with_cancel(
        &self,
        query: &str,
        body: &str,
        cancel: &CancellationToken,
    ) -> Result<SearchResults, SearchError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("search cancelled before the backend replied");
                Err(SearchError::Cancelled)
            }
            result = self.search(query, body) => result,
        }
    }

    fn interpret(&self, query: &str, body: &str, reply: &str) -> Result<SearchResults, SearchError> {
        debug!(reply_chars = reply.chars().count(), "backend replied");
        let json = extract_json(reply).inspect_err(|e| {
            warn!(error = %e, "no usable JSON in backend reply");
            debug!(raw = %reply, "raw backend reply");
        })?;

        let mut parser = ResponseParser::new()
            .with_score_tolerance(self.config.score_tolerance)
            .with_query(query);
        if self.config.check_offsets {
            parser = parser.with_body(body);
        }

        let results = parser.parse(json).inspect_err(|e| {
            warn!(error = %e, "backend reply failed validation");
            debug!(raw = %reply, "raw backend reply");
        })?;
        Ok(results)
    }
}
