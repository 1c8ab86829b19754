use std::collections::{HashMap, HashSet};
use serde_json::Value;
use tracing::debug;

use lexunion_core::store::{dedup_batch, DocumentStore};
use lexunion_core::types::value_text;
use lexunion_core::{DocKey, Document, Result, Retriever, RetrieverConfig};

use crate::tokenizer::tokenize;

/// Keyword-extraction retriever.
///
/// The indexed field holds keyword phrases (a string, or an array of
/// strings). A document matches when one of its phrases appears in the query
/// as a contiguous run of tokens. More distinct phrase hits rank higher.
pub struct Keyword {
    config: RetrieverConfig,
    store: DocumentStore,
    phrases: Vec<Vec<Vec<String>>>,
    // first token -> (slot, phrase index)
    by_first: HashMap<String, Vec<(usize, usize)>>,
}

impl Keyword {
    pub fn new(config: RetrieverConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, store: DocumentStore::new(), phrases: Vec::new(), by_first: HashMap::new() })
    }

    fn extract_phrases(document: &Document, on: &str) -> Vec<Vec<String>> {
        let raw: Vec<String> = match document.get(on) {
            Some(Value::Array(items)) => items.iter().map(value_text).collect(),
            Some(_) => vec![document.text(on)],
            None => vec![],
        };
        // repeated phrases count once
        let mut phrases: Vec<Vec<String>> = Vec::new();
        for tokens in raw.iter().map(|p| tokenize(p)).filter(|t| !t.is_empty()) {
            if !phrases.contains(&tokens) {
                phrases.push(tokens);
            }
        }
        phrases
    }

    fn insert(&mut self, key: DocKey, document: Document) {
        let phrases = Self::extract_phrases(&document, &self.config.on);
        let slot = self.store.upsert(key, document).slot();
        if slot < self.phrases.len() {
            for phrase in &self.phrases[slot] {
                if let Some(list) = self.by_first.get_mut(&phrase[0]) {
                    list.retain(|(s, _)| *s != slot);
                }
            }
        } else {
            self.phrases.push(Vec::new());
        }
        for (i, phrase) in phrases.iter().enumerate() {
            self.by_first.entry(phrase[0].clone()).or_default().push((slot, i));
        }
        self.phrases[slot] = phrases;
    }
}

impl Retriever for Keyword {
    fn backend(&self) -> &'static str { "keyword" }

    fn config(&self) -> &RetrieverConfig { &self.config }

    fn set_k(&mut self, k: Option<usize>) { self.config.k = k; }

    fn add(&mut self, documents: &[Document]) -> Result<()> {
        for (key, doc) in dedup_batch(&self.config.key, documents)? {
            self.insert(key, doc);
        }
        debug!(backend = "keyword", on = %self.config.on, added = documents.len(), total = self.store.len(), "indexed documents");
        Ok(())
    }

    fn search(&self, query: &str) -> Result<Vec<Document>> {
        let tokens = tokenize(query);
        let mut matched: HashSet<(usize, usize)> = HashSet::new();
        for start in 0..tokens.len() {
            let Some(candidates) = self.by_first.get(&tokens[start]) else { continue };
            for &(slot, i) in candidates {
                let phrase = &self.phrases[slot][i];
                if tokens[start..].starts_with(phrase) {
                    matched.insert((slot, i));
                }
            }
        }
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for (slot, _) in matched {
            *counts.entry(slot).or_insert(0) += 1;
        }
        let mut ranked: Vec<(usize, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let hits: Vec<Document> = ranked
            .into_iter()
            .take(self.config.k.unwrap_or(usize::MAX))
            .filter_map(|(slot, _)| self.store.slot(slot).cloned())
            .collect();
        debug!(backend = "keyword", on = %self.config.on, query, hits = hits.len(), "search");
        Ok(hits)
    }

    fn len(&self) -> usize { self.store.len() }
}
