use std::collections::HashMap;
use tracing::debug;

use lexunion_core::store::dedup_batch;
use lexunion_core::{Document, Result, Retriever, RetrieverConfig};

use crate::term_index::TermIndex;
use crate::tokenizer::tokenize_unique;

/// Which BM25 formulation to score with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bm25Variant {
    /// Classic Okapi BM25 with a smoothed, always-positive IDF.
    Okapi,
    /// BM25L: shifts the length-normalized tf by `delta` so long documents
    /// are not over-penalized.
    L,
}

/// Free parameters of the BM25 family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
    pub delta: f32,
}

impl Default for Bm25Params {
    fn default() -> Self { Self { k1: 1.5, b: 0.75, delta: 0.5 } }
}

pub struct Bm25 {
    config: RetrieverConfig,
    variant: Bm25Variant,
    params: Bm25Params,
    index: TermIndex,
}

impl Bm25 {
    pub fn new(config: RetrieverConfig, variant: Bm25Variant) -> Result<Self> {
        Self::with_params(config, variant, Bm25Params::default())
    }

    pub fn okapi(config: RetrieverConfig) -> Result<Self> { Self::new(config, Bm25Variant::Okapi) }

    pub fn l(config: RetrieverConfig) -> Result<Self> { Self::new(config, Bm25Variant::L) }

    pub fn with_params(config: RetrieverConfig, variant: Bm25Variant, params: Bm25Params) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, variant, params, index: TermIndex::default() })
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.index.len() as f32;
        let df = self.index.doc_freq(term) as f32;
        match self.variant {
            Bm25Variant::Okapi => ((n - df + 0.5) / (df + 0.5) + 1.0).ln(),
            Bm25Variant::L => ((n + 1.0) / (df + 0.5)).ln(),
        }
    }

    fn term_score(&self, tf: f32, doc_len: f32, avg_len: f32) -> f32 {
        let Bm25Params { k1, b, delta } = self.params;
        let norm = 1.0 - b + b * doc_len / avg_len;
        match self.variant {
            Bm25Variant::Okapi => tf * (k1 + 1.0) / (tf + k1 * norm),
            Bm25Variant::L => {
                let ctd = tf / norm;
                (k1 + 1.0) * (ctd + delta) / (k1 + ctd + delta)
            }
        }
    }
}

impl Retriever for Bm25 {
    fn backend(&self) -> &'static str {
        match self.variant {
            Bm25Variant::Okapi => "bm25_okapi",
            Bm25Variant::L => "bm25_l",
        }
    }

    fn config(&self) -> &RetrieverConfig { &self.config }

    fn set_k(&mut self, k: Option<usize>) { self.config.k = k; }

    fn add(&mut self, documents: &[Document]) -> Result<()> {
        for (key, doc) in dedup_batch(&self.config.key, documents)? {
            self.index.insert(&self.config.on, key, doc);
        }
        debug!(backend = self.backend(), on = %self.config.on, added = documents.len(), total = self.index.len(), "indexed documents");
        Ok(())
    }

    fn search(&self, query: &str) -> Result<Vec<Document>> {
        let avg_len = self.index.avg_len();
        let mut scores: HashMap<usize, f32> = HashMap::new();
        if avg_len > 0.0 {
            for term in tokenize_unique(query) {
                let Some(list) = self.index.postings(&term) else { continue };
                let idf = self.idf(&term);
                for (&slot, &tf) in list {
                    let doc_len = self.index.doc_terms(slot).len as f32;
                    *scores.entry(slot).or_insert(0.0) += idf * self.term_score(tf as f32, doc_len, avg_len);
                }
            }
        }
        let hits = self.index.ranked(scores, self.config.k);
        debug!(backend = self.backend(), on = %self.config.on, query, hits = hits.len(), "search");
        Ok(hits)
    }

    fn len(&self) -> usize { self.index.len() }
}
