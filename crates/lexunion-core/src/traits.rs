use crate::error::Result;
use crate::types::{Document, RetrieverConfig};

/// Capability every lexical backend implements to take part in a union.
///
/// `search` never mutates the index; `add` is the only write path. Backends
/// return full documents, never just keys or the indexed field.
pub trait Retriever: Send + Sync {
    /// Static backend name, used in logs and error messages.
    fn backend(&self) -> &'static str;

    fn config(&self) -> &RetrieverConfig;

    /// Replace the result budget. `None` means unbounded.
    fn set_k(&mut self, k: Option<usize>);

    /// Index `documents` on the configured field. Existing keys are replaced.
    fn add(&mut self, documents: &[Document]) -> Result<()>;

    /// Ranked matches for `query`, at most `k` of them.
    fn search(&self, query: &str) -> Result<Vec<Document>>;

    /// Number of distinct documents held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool { self.len() == 0 }

    /// Consume the retriever and return it populated with `documents`.
    fn with_documents(mut self, documents: &[Document]) -> Result<Self>
    where
        Self: Sized,
    {
        self.add(documents)?;
        Ok(self)
    }
}

impl<R: Retriever + ?Sized> Retriever for Box<R> {
    fn backend(&self) -> &'static str { (**self).backend() }
    fn config(&self) -> &RetrieverConfig { (**self).config() }
    fn set_k(&mut self, k: Option<usize>) { (**self).set_k(k) }
    fn add(&mut self, documents: &[Document]) -> Result<()> { (**self).add(documents) }
    fn search(&self, query: &str) -> Result<Vec<Document>> { (**self).search(query) }
    fn len(&self) -> usize { (**self).len() }
}
