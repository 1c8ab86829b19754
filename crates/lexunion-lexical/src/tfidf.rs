use std::collections::HashMap;
use tracing::debug;

use lexunion_core::store::dedup_batch;
use lexunion_core::{Document, Result, Retriever, RetrieverConfig};

use crate::term_index::TermIndex;
use crate::tokenizer::tokenize;

/// TF-IDF retriever with cosine similarity.
///
/// IDF is smoothed as `ln((1 + N) / (1 + df)) + 1` and recomputed at query
/// time, so adding documents never requires a rebuild.
pub struct TfIdf {
    config: RetrieverConfig,
    index: TermIndex,
}

impl TfIdf {
    pub fn new(config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, index: TermIndex::default() })
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.index.len() as f32;
        let df = self.index.doc_freq(term) as f32;
        ((1.0 + n) / (1.0 + df)).ln() + 1.0
    }

    fn doc_norm(&self, slot: usize) -> f32 {
        self.index
            .doc_terms(slot)
            .freqs
            .iter()
            .map(|(t, &tf)| (tf as f32 * self.idf(t)).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

impl Retriever for TfIdf {
    fn backend(&self) -> &'static str { "tfidf" }

    fn config(&self) -> &RetrieverConfig { &self.config }

    fn set_k(&mut self, k: Option<usize>) { self.config.k = k; }

    fn add(&mut self, documents: &[Document]) -> Result<()> {
        for (key, doc) in dedup_batch(&self.config.key, documents)? {
            self.index.insert(&self.config.on, key, doc);
        }
        debug!(backend = "tfidf", on = %self.config.on, added = documents.len(), total = self.index.len(), "indexed documents");
        Ok(())
    }

    fn search(&self, query: &str) -> Result<Vec<Document>> {
        let mut query_tf: HashMap<String, u32> = HashMap::new();
        for t in tokenize(query) {
            if self.index.doc_freq(&t) > 0 {
                *query_tf.entry(t).or_insert(0) += 1;
            }
        }
        let query_weights: Vec<(String, f32)> =
            query_tf.into_iter().map(|(t, tf)| { let w = tf as f32 * self.idf(&t); (t, w) }).collect();
        let query_norm = query_weights.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();

        let mut dots: HashMap<usize, f32> = HashMap::new();
        for (term, qw) in &query_weights {
            let idf = self.idf(term);
            if let Some(list) = self.index.postings(term) {
                for (&slot, &tf) in list {
                    *dots.entry(slot).or_insert(0.0) += qw * tf as f32 * idf;
                }
            }
        }
        let scores: HashMap<usize, f32> = dots
            .into_iter()
            .map(|(slot, dot)| {
                let norm = self.doc_norm(slot) * query_norm;
                (slot, if norm > 0.0 { dot / norm } else { 0.0 })
            })
            .collect();

        let hits = self.index.ranked(scores, self.config.k);
        debug!(backend = "tfidf", on = %self.config.on, query, hits = hits.len(), "search");
        Ok(hits)
    }

    fn len(&self) -> usize { self.index.len() }
}
