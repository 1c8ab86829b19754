use lexunion_core::{Document, Error, Result, Retriever};

use crate::union::Union;

/// A composed retrieval structure: one retriever, or a union of them.
pub enum Pipeline {
    Single(Box<dyn Retriever>),
    Union(Union),
}

impl Pipeline {
    pub fn single(retriever: impl Retriever + 'static) -> Self { Pipeline::Single(Box::new(retriever)) }

    pub fn key(&self) -> &str {
        match self {
            Pipeline::Single(r) => &r.config().key,
            Pipeline::Union(u) => u.key(),
        }
    }

    pub fn k(&self) -> Option<usize> {
        match self {
            Pipeline::Single(r) => r.config().k,
            Pipeline::Union(u) => u.k(),
        }
    }

    /// Leaf retrievers in declaration order.
    pub fn leaves(&self) -> &[Box<dyn Retriever>] {
        match self {
            Pipeline::Single(r) => std::slice::from_ref(r),
            Pipeline::Union(u) => u.children(),
        }
    }

    /// Index `documents` in every leaf, in place.
    ///
    /// A batch with a document missing the key field is rejected before any
    /// leaf is touched. A backend failure may leave earlier leaves updated.
    pub fn try_add(&mut self, documents: &[Document]) -> Result<()> {
        match self {
            Pipeline::Single(r) => r.add(documents),
            Pipeline::Union(u) => u.add(documents),
        }
    }

    /// Index `documents` in every leaf and return the updated pipeline.
    ///
    /// On failure the pipeline is handed back inside the [`AddError`].
    pub fn add(mut self, documents: &[Document]) -> std::result::Result<Self, AddError> {
        match self.try_add(documents) {
            Ok(()) => Ok(self),
            Err(error) => Err(AddError { pipeline: Box::new(self), error }),
        }
    }

    pub fn search(&self, query: &str) -> Result<Vec<Document>> {
        match self {
            Pipeline::Single(r) => r.search(query),
            Pipeline::Union(u) => u.search(query),
        }
    }
}

impl<R: Retriever + 'static> From<R> for Pipeline {
    fn from(retriever: R) -> Self { Pipeline::single(retriever) }
}

impl From<Union> for Pipeline {
    fn from(union: Union) -> Self { Pipeline::Union(union) }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pipeline::Single(r) => write!(f, "Single({}({}))", r.backend(), r.config().on),
            Pipeline::Union(u) => std::fmt::Debug::fmt(u, f),
        }
    }
}

/// A rejected [`Pipeline::add`], carrying the pipeline that was consumed.
#[derive(Debug, thiserror::Error)]
#[error("documents were rejected by the pipeline")]
pub struct AddError {
    pipeline: Box<Pipeline>,
    #[source]
    error: Error,
}

impl AddError {
    pub fn error(&self) -> &Error { &self.error }

    pub fn into_pipeline(self) -> Pipeline { *self.pipeline }

    pub fn into_parts(self) -> (Pipeline, Error) { (*self.pipeline, self.error) }
}

impl From<AddError> for Error {
    fn from(e: AddError) -> Self { e.error }
}

/// Binary union. Nested unions are flattened, so `combine` is associative.
pub fn combine(a: impl Into<Pipeline>, b: impl Into<Pipeline>) -> Result<Pipeline> {
    Ok(Pipeline::Union(Union::flatten(vec![a.into(), b.into()])?))
}

/// Variadic union over `parts`, flattened in order.
pub fn union<I>(parts: I) -> Result<Pipeline>
where
    I: IntoIterator,
    I::Item: Into<Pipeline>,
{
    Ok(Pipeline::Union(Union::flatten(parts.into_iter().map(Into::into).collect())?))
}

/// Populate every leaf of `pipeline` with `documents`.
pub fn add(pipeline: Pipeline, documents: &[Document]) -> std::result::Result<Pipeline, AddError> {
    pipeline.add(documents)
}
