//! Key -> document store owned by a single retriever.

use std::collections::HashMap;
use tracing::warn;

use crate::error::Result;
use crate::types::{DocKey, Document};

/// Outcome of [`DocumentStore::upsert`].
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
    Inserted(usize),
    Replaced { slot: usize, previous: Document },
}

impl Upsert {
    pub fn slot(&self) -> usize {
        match self {
            Upsert::Inserted(slot) | Upsert::Replaced { slot, .. } => *slot,
        }
    }
}

/// In-memory store of full documents.
///
/// Each key occupies one slot for the lifetime of the store. Replacing a
/// document keeps its slot, so insertion order stays stable for tie-breaks.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    slots: Vec<(DocKey, Document)>,
    by_key: HashMap<DocKey, usize>,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    pub fn upsert(&mut self, key: DocKey, document: Document) -> Upsert {
        if let Some(&slot) = self.by_key.get(&key) {
            let previous = std::mem::replace(&mut self.slots[slot].1, document);
            return Upsert::Replaced { slot, previous };
        }
        let slot = self.slots.len();
        self.by_key.insert(key.clone(), slot);
        self.slots.push((key, document));
        Upsert::Inserted(slot)
    }

    pub fn get(&self, key: &DocKey) -> Option<&Document> {
        self.by_key.get(key).map(|&slot| &self.slots[slot].1)
    }

    pub fn slot(&self, slot: usize) -> Option<&Document> { self.slots.get(slot).map(|(_, d)| d) }

    pub fn slot_of(&self, key: &DocKey) -> Option<usize> { self.by_key.get(key).copied() }

    pub fn len(&self) -> usize { self.slots.len() }

    pub fn is_empty(&self) -> bool { self.slots.is_empty() }
}

/// Resolve one `add` batch into `(key, document)` pairs.
///
/// Within the batch the last document for a key wins and keeps the position
/// of the first occurrence. Conflicting duplicates are reported, not
/// rejected. Fails only when a document has no key field.
pub fn dedup_batch(key_field: &str, documents: &[Document]) -> Result<Vec<(DocKey, Document)>> {
    let mut out: Vec<(DocKey, Document)> = Vec::with_capacity(documents.len());
    let mut positions: HashMap<DocKey, usize> = HashMap::with_capacity(documents.len());
    for doc in documents {
        let key = doc.key(key_field)?;
        match positions.get(&key) {
            Some(&pos) => {
                if out[pos].1 != *doc {
                    warn!(key = %key, "conflicting documents share a key in one batch; keeping the last one");
                }
                out[pos].1 = doc.clone();
            }
            None => {
                positions.insert(key.clone(), out.len());
                out.push((key, doc.clone()));
            }
        }
    }
    Ok(out)
}
