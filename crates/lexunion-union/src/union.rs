use rayon::prelude::*;
use tracing::{debug, warn};

use lexunion_core::types::validate_k;
use lexunion_core::{ChildFailurePolicy, Document, Error, Result, Retriever};

use crate::merge::merge_first_seen;
use crate::pipeline::Pipeline;

/// A flattened union of retrievers.
///
/// Children are kept in declaration order, which is also the merge priority:
/// when several children surface the same key, the earliest one decides the
/// document's position. Nested unions are always flattened into leaves.
pub struct Union {
    key: String,
    k: Option<usize>,
    children: Vec<Box<dyn Retriever>>,
    policy: ChildFailurePolicy,
    parallel: bool,
}

impl Union {
    /// Build a union with an explicit shared budget.
    ///
    /// `k` becomes the budget of the union and of every leaf.
    pub fn new(parts: Vec<Pipeline>, k: Option<usize>) -> Result<Self> {
        validate_k(k)?;
        let mut union = Self::flatten(parts)?;
        union.set_k(k);
        Ok(union)
    }

    /// Flatten `parts` into one union without touching leaf budgets.
    ///
    /// The union's budget is the widest of its operands: unbounded if any
    /// operand is, else the largest. Degrade and parallel settings carry over
    /// when any operand union has them.
    pub(crate) fn flatten(parts: Vec<Pipeline>) -> Result<Self> {
        let mut children: Vec<Box<dyn Retriever>> = Vec::new();
        let mut k: Option<Option<usize>> = None;
        let mut policy = ChildFailurePolicy::FailFast;
        let mut parallel = false;
        for part in parts {
            let part_k = part.k();
            k = Some(match k {
                None => part_k,
                Some(acc) => widest(acc, part_k),
            });
            match part {
                Pipeline::Single(r) => children.push(r),
                Pipeline::Union(u) => {
                    if u.policy == ChildFailurePolicy::Degrade { policy = ChildFailurePolicy::Degrade; }
                    parallel |= u.parallel;
                    children.extend(u.children);
                }
            }
        }
        let Some(first) = children.first() else {
            return Err(Error::InvalidConfig("a union needs at least one retriever".into()));
        };
        let key = first.config().key.clone();
        if let Some(other) = children.iter().find(|c| c.config().key != key) {
            return Err(Error::InvalidConfig(format!(
                "retrievers disagree on the key field: '{}' vs '{}' ({} on '{}')",
                key, other.config().key, other.backend(), other.config().on
            )));
        }
        Ok(Self { key, k: k.flatten(), children, policy, parallel })
    }

    pub fn with_policy(mut self, policy: ChildFailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fan `search`/`add` out to children on the rayon pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn key(&self) -> &str { &self.key }

    pub fn k(&self) -> Option<usize> { self.k }

    pub fn policy(&self) -> ChildFailurePolicy { self.policy }

    pub fn is_parallel(&self) -> bool { self.parallel }

    /// Set the union budget and propagate it to every leaf.
    pub fn set_k(&mut self, k: Option<usize>) {
        self.k = k;
        for child in &mut self.children {
            child.set_k(k);
        }
    }

    pub fn children(&self) -> &[Box<dyn Retriever>] { &self.children }

    /// Run `query` on every child, then merge first-seen-wins and truncate.
    pub fn search(&self, query: &str) -> Result<Vec<Document>> {
        let results: Vec<Result<Vec<Document>>> = if self.parallel && self.children.len() > 1 {
            self.children.par_iter().map(|c| c.search(query)).collect()
        } else {
            self.children.iter().map(|c| c.search(query)).collect()
        };

        let mut batches = Vec::with_capacity(results.len());
        for (child, result) in self.children.iter().zip(results) {
            match result {
                Ok(docs) => batches.push(docs),
                Err(e) if self.policy == ChildFailurePolicy::Degrade => {
                    warn!(backend = child.backend(), on = %child.config().on, error = %e, "child search failed; treating as empty");
                    batches.push(Vec::new());
                }
                Err(e) => return Err(e),
            }
        }

        let merged = merge_first_seen(&self.key, batches, self.k)?;
        debug!(children = self.children.len(), query, hits = merged.len(), k = ?self.k, "union search");
        Ok(merged)
    }

    /// Offer `documents` to every leaf. Errors always propagate.
    ///
    /// Keys are checked up front so a batch with a keyless document leaves
    /// every leaf untouched.
    pub fn add(&mut self, documents: &[Document]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }
        for doc in documents {
            doc.key(&self.key)?;
        }
        let results: Vec<Result<()>> = if self.parallel && self.children.len() > 1 {
            self.children.par_iter_mut().map(|c| c.add(documents)).collect()
        } else {
            self.children.iter_mut().map(|c| c.add(documents)).collect()
        };
        results.into_iter().collect::<Result<Vec<()>>>()?;
        debug!(children = self.children.len(), added = documents.len(), "union add");
        Ok(())
    }
}

fn widest(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        _ => None,
    }
}

impl std::fmt::Debug for Union {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let children: Vec<String> = self.children.iter().map(|c| format!("{}({})", c.backend(), c.config().on)).collect();
        f.debug_struct("Union")
            .field("key", &self.key)
            .field("k", &self.k)
            .field("children", &children)
            .field("policy", &self.policy)
            .field("parallel", &self.parallel)
            .finish()
    }
}
