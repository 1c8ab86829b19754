//! lexunion-union
//!
//! Composition of independent retrievers. A [`Union`] runs every child on the
//! same query and merges their ranked lists first-seen-wins by document key;
//! [`Pipeline::add`] pushes a document collection into every leaf.

pub mod merge;
pub mod pipeline;
pub mod registry;
pub mod union;

pub use merge::merge_first_seen;
pub use pipeline::{add, combine, union, AddError, Pipeline};
pub use registry::{build_pipeline, build_retriever};
pub use union::Union;
