//! Semantic search over a body of text, delegated to a language model.
//!
//! The pipeline is: build a prompt ([`prompt`]), make one backend call
//! ([`llm`]), isolate the JSON in the reply ([`extract`]), and validate it
//! into [`sift_core::SearchResults`] ([`parse`]). [`search::Searcher`] ties
//! the stages together; [`input`] reads the body from stdin.

pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
pub mod prompt;
pub mod search;
