//! lexunion-lexical
//!
//! In-memory lexical retrievers: TF-IDF, BM25 (Okapi and L) and keyword
//! phrase matching. Each indexes one field of a document and keeps the full
//! records in its own store.

pub mod bm25;
pub mod keyword;
mod term_index;
pub mod tfidf;
pub mod tokenizer;

pub use bm25::{Bm25, Bm25Params, Bm25Variant};
pub use keyword::Keyword;
pub use tfidf::TfIdf;
