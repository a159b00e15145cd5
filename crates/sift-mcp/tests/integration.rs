use std::sync::Arc;

use async_trait::async_trait;
use rmcp::{handler::server::wrapper::Parameters, model::*, ServerHandler};
use sift_core::{BackendError, SearchConfig};
use sift_mcp::tools::{SemanticSearchParams, SiftServer};
use sift_search::llm::{Backend, CompletionRequest};
use sift_search::search::Searcher;

struct FixedReply(&'static str);

#[async_trait]
impl Backend for FixedReply {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, BackendError> {
        Ok(self.0.to_string())
    }

    fn model(&self) -> &str {
        "fixture-model"
    }
}

fn test_server(reply: &'static str) -> SiftServer {
    let backend: Arc<dyn Backend> = Arc::new(FixedReply(reply));
    SiftServer::new(Searcher::new(backend, SearchConfig::default()))
}

fn extract_text(result: &CallToolResult) -> &str {
    match &result.content[0].raw {
        RawContent::Text(t) => &t.text,
        _ => panic!("expected text content"),
    }
}

fn params(query: &str, body: &str) -> Parameters<SemanticSearchParams> {
    Parameters(SemanticSearchParams {
        query: query.to_string(),
        body: body.to_string(),
    })
}

#[test]
fn server_info_is_correct() {
    let server = test_server("{}");
    let info = server.get_info();

    assert_eq!(info.server_info.name, "sift");
    assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
    let instructions = info.instructions.unwrap();
    assert!(instructions.contains("semantic_search"));
    assert_eq!(server.model(), "fixture-model");
}

#[tokio::test]
async fn semantic_search_returns_results_json() {
    let server = test_server(
        "```json\n{\"matches\":[{\"text\":\"Refunds within 30 days\",\"relevanceScore\":0.9,\
         \"startIndex\":0,\"endIndex\":22,\"reasoning\":\"refunds\"}],\"totalMatches\":1,\
         \"queryProcessed\":\"refund policy\"}\n```",
    );
    let result = server
        .semantic_search(params("refund policy", "Refunds within 30 days of purchase."))
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(extract_text(&result)).unwrap();
    assert_eq!(parsed["totalMatches"], 1);
    assert_eq!(parsed["queryProcessed"], "refund policy");
    assert_eq!(parsed["matches"][0]["startIndex"], 0);
    assert_eq!(parsed["matches"][0]["endIndex"], 22);
    assert_eq!(parsed["matches"][0]["relevanceScore"], 0.9);
}

#[tokio::test]
async fn semantic_search_rejects_empty_query() {
    let server = test_server("{}");
    assert!(server.semantic_search(params("  ", "body")).await.is_err());
}

#[tokio::test]
async fn semantic_search_rejects_empty_body() {
    let server = test_server("{}");
    assert!(server.semantic_search(params("query", "")).await.is_err());
}

#[tokio::test]
async fn semantic_search_surfaces_invalid_reply() {
    let server = test_server("Sorry, I can't help with that.");
    let err = server
        .semantic_search(params("query", "body"))
        .await
        .unwrap_err();
    assert!(err.message.contains("Search failed"));
}
