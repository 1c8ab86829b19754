use lexunion_core::config::{BackendKind, PipelineSettings};
use lexunion_core::{Result, Retriever, RetrieverConfig};
use lexunion_lexical::{Bm25, Keyword, TfIdf};
use lexunion_text::TantivyRetriever;
use tracing::info;

use crate::pipeline::Pipeline;
use crate::union::Union;

pub fn build_retriever(kind: BackendKind, config: RetrieverConfig) -> Result<Box<dyn Retriever>> {
    Ok(match kind {
        BackendKind::TfIdf => Box::new(TfIdf::new(config)?),
        BackendKind::Bm25Okapi => Box::new(Bm25::okapi(config)?),
        BackendKind::Bm25L => Box::new(Bm25::l(config)?),
        BackendKind::Keyword => Box::new(Keyword::new(config)?),
        BackendKind::Tantivy => Box::new(TantivyRetriever::new(config)?),
    })
}

/// Assemble the pipeline described by `settings`.
///
/// A single declared retriever stays a [`Pipeline::Single`]; more become a
/// union sharing `settings.k`.
pub fn build_pipeline(settings: &PipelineSettings) -> Result<Pipeline> {
    settings.validate()?;
    let mut leaves = settings
        .retrievers
        .iter()
        .map(|r| build_retriever(r.backend, RetrieverConfig::new(&settings.key, &r.on).with_k(settings.k)).map(Pipeline::Single))
        .collect::<Result<Vec<_>>>()?;
    info!(
        retrievers = %settings.retrievers.iter().map(|r| format!("{}:{}", r.backend, r.on)).collect::<Vec<_>>().join(","),
        k = ?settings.k,
        "building pipeline"
    );
    if leaves.len() == 1 {
        if let Some(single) = leaves.pop() {
            return Ok(single);
        }
    }
    let union = Union::new(leaves, settings.k)?
        .with_policy(settings.on_child_failure)
        .with_parallel(settings.parallel);
    Ok(Pipeline::Union(union))
}
