//! Inverted index over one field, with the corpus statistics the scorers need.

use std::cmp::Ordering;
use std::collections::HashMap;

use lexunion_core::store::{DocumentStore, Upsert};
use lexunion_core::{DocKey, Document};

use crate::tokenizer::tokenize;

/// Term frequencies of one stored document.
#[derive(Debug, Clone, Default)]
pub(crate) struct DocTerms {
    pub freqs: HashMap<String, u32>,
    pub len: u32,
}

impl DocTerms {
    fn from_text(text: &str) -> Self {
        let tokens = tokenize(text);
        let len = tokens.len() as u32;
        let mut freqs = HashMap::new();
        for t in tokens {
            *freqs.entry(t).or_insert(0) += 1;
        }
        Self { freqs, len }
    }
}

/// Store + postings for a single indexed field.
///
/// Slots come from the [`DocumentStore`]; postings map term -> slot -> tf.
#[derive(Debug, Default)]
pub(crate) struct TermIndex {
    store: DocumentStore,
    docs: Vec<DocTerms>,
    postings: HashMap<String, HashMap<usize, u32>>,
    total_len: u64,
}

impl TermIndex {
    pub fn insert(&mut self, on: &str, key: DocKey, document: Document) {
        let terms = DocTerms::from_text(&document.text(on));
        match self.store.upsert(key, document) {
            Upsert::Inserted(slot) => {
                debug_assert_eq!(slot, self.docs.len());
                self.link(slot, &terms);
                self.docs.push(terms);
            }
            Upsert::Replaced { slot, .. } => {
                let old = std::mem::take(&mut self.docs[slot]);
                self.unlink(slot, &old);
                self.link(slot, &terms);
                self.docs[slot] = terms;
            }
        }
    }

    fn link(&mut self, slot: usize, terms: &DocTerms) {
        for (term, &tf) in &terms.freqs {
            self.postings.entry(term.clone()).or_default().insert(slot, tf);
        }
        self.total_len += u64::from(terms.len);
    }

    fn unlink(&mut self, slot: usize, terms: &DocTerms) {
        for term in terms.freqs.keys() {
            if let Some(list) = self.postings.get_mut(term) {
                list.remove(&slot);
                if list.is_empty() {
                    self.postings.remove(term);
                }
            }
        }
        self.total_len -= u64::from(terms.len);
    }

    pub fn len(&self) -> usize { self.store.len() }

    pub fn doc_freq(&self, term: &str) -> usize { self.postings.get(term).map_or(0, HashMap::len) }

    pub fn postings(&self, term: &str) -> Option<&HashMap<usize, u32>> { self.postings.get(term) }

    pub fn doc_terms(&self, slot: usize) -> &DocTerms { &self.docs[slot] }

    pub fn avg_len(&self) -> f32 {
        if self.store.is_empty() { 0.0 } else { self.total_len as f32 / self.store.len() as f32 }
    }

    /// Turn per-slot scores into ranked documents: positive scores only,
    /// descending, ties by insertion order, at most `k`.
    pub fn ranked(&self, scores: HashMap<usize, f32>, k: Option<usize>) -> Vec<Document> {
        let mut scored: Vec<(usize, f32)> = scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(k.unwrap_or(usize::MAX))
            .filter_map(|(slot, _)| self.store.slot(slot).cloned())
            .collect()
    }
}
