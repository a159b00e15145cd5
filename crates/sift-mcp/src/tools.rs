//! Tool implementations for the Sift MCP server.
//!
//! One tool is exposed, `semantic_search`, which runs a single search and
//! returns the validated results as JSON via `CallToolResult`.

use std::sync::Arc;

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars, tool, tool_router, ErrorData as McpError,
};
use serde::Deserialize;
use sift_search::llm::Backend;
use sift_search::search::Searcher;
use tracing::debug;

/// MCP server exposing semantic search.
///
/// Cloning is cheap; every clone shares the same [`Searcher`].
#[derive(Clone)]
pub struct SiftServer {
    pub(crate) searcher: Arc<Searcher<Arc<dyn Backend>>>,
    pub(crate) tool_router: ToolRouter<Self>,
}

/// Parameters for the `semantic_search` tool.
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SemanticSearchParams {
    /// Natural-language description of what to find.
    pub query: String,
    /// The full text to search. Offsets in the results refer to this text.
    pub body: String,
}

fn mcp_err(msg: impl Into<String>) -> McpError {
    McpError::internal_error(msg.into(), None)
}

#[tool_router]
impl SiftServer {
    /// Create a new server around `searcher`.
    pub fn new(searcher: Searcher<Arc<dyn Backend>>) -> Self {
        Self {
            searcher: Arc::new(searcher),
            tool_router: Self::tool_router(),
        }
    }

    /// Model identifier of the underlying backend.
    pub fn model(&self) -> &str {
        self.searcher.backend().model()
    }

    #[tool(
        name = "semantic_search",
        description = "Find the passages of a text that are relevant to a natural-language query. Returns matches ordered by relevance, each with the excerpt, a relevanceScore between 0 and 1, startIndex/endIndex character offsets into the body, and a short reasoning. Use this to locate clauses, mentions, or topics in documents by meaning rather than exact wording."
    )]
    pub async fn semantic_search(
        &self,
        Parameters(params): Parameters<SemanticSearchParams>,
    ) -> Result<CallToolResult, McpError> {
        if params.query.trim().is_empty() {
            return Err(McpError::invalid_params("query must not be empty", None));
        }
        if params.body.trim().is_empty() {
            return Err(McpError::invalid_params("body must not be empty", None));
        }

        debug!(query = %params.query, "semantic_search tool called");
        let results = self
            .searcher
            .search(&params.query, &params.body)
            .await
            .map_err(|e| mcp_err(format!("Search failed: {e}")))?;

        let json = serde_json::to_string_pretty(&results).map_err(|e| mcp_err(e.to_string()))?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}
