//! lexunion-text
//!
//! Tantivy-backed retriever. Builds an in-RAM index over a single document
//! field and answers queries with tantivy's BM25 ranking.

pub mod retriever;
pub mod tantivy_utils;

pub use retriever::TantivyRetriever;
