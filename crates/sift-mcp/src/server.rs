//! MCP server setup and lifecycle.
//!
//! Provides [`run_server`] which starts the stdio-based MCP server and
//! blocks until the client disconnects.

use std::sync::Arc;

use rmcp::{model::*, tool_handler, transport::stdio, ServerHandler, ServiceExt};
use sift_core::SiftError;
use sift_search::llm::Backend;
use sift_search::search::Searcher;
use tracing::info;

use crate::tools::SiftServer;

const SERVER_INSTRUCTIONS: &str = "\
Sift finds the passages of a text that are relevant to a natural-language query.\n\
- semantic_search: pass the query and the full text as `body`; returns ranked \
matches with relevance scores, character offsets, and a short reasoning";

#[tool_handler]
impl ServerHandler for SiftServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sift".to_string(),
                title: Some("Sift Semantic Search".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: Some("LLM-backed semantic search over text".to_string()),
                icons: None,
                website_url: None,
            },
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
        }
    }
}

/// Start the MCP server on stdio transport.
///
/// This is called by the `sift mcp` CLI subcommand. It blocks until
/// the client closes stdin.
///
/// # Errors
///
/// Returns [`SiftError::Config`] if the server fails to initialize or
/// encounters a transport error.
pub async fn run_server(searcher: Searcher<Arc<dyn Backend>>) -> Result<(), SiftError> {
    let server = SiftServer::new(searcher);
    info!(model = server.model(), "starting MCP server on stdio");
    let service = server
        .serve(stdio())
        .await
        .map_err(|e| SiftError::Config(format!("MCP server failed to start: {e}")))?;

    service
        .waiting()
        .await
        .map_err(|e| SiftError::Config(format!("MCP server error: {e}")))?;

    Ok(())
}
