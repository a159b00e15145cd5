//! MCP server exposing Sift's semantic search to IDEs and agents.
//!
//! Implements a Model Context Protocol server using rmcp that exposes a
//! single `semantic_search` tool over stdio transport.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use sift_core::SiftConfig;
//! use sift_search::llm::{Backend, LlmClient};
//! use sift_search::search::Searcher;
//!
//! # async fn example() -> Result<(), sift_core::SiftError> {
//! let config = SiftConfig::default();
//! let backend: Arc<dyn Backend> = Arc::new(LlmClient::new(&config.llm).map_err(sift_core::SearchError::from)?);
//! sift_mcp::server::run_server(Searcher::new(backend, config.search)).await?;
//! # Ok(())
//! # }
//! ```

pub mod server;
pub mod tools;
