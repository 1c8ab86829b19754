use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::tokenizer::TokenStream;
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, TantivyError, Term};
use tracing::{debug, warn};

use lexunion_core::store::{dedup_batch, DocumentStore};
use lexunion_core::{Document, Error, Result, Retriever, RetrieverConfig};

use crate::tantivy_utils::{build_schema, register_tokenizer, KEY_FIELD, SLOT_FIELD, TEXT_FIELD};

const WRITER_MEMORY_BYTES: usize = 50_000_000;

fn tantivy_err(e: TantivyError) -> Error { Error::backend("tantivy", e) }

/// Retriever backed by an in-RAM tantivy index over one field.
///
/// Tantivy only sees the key and the indexed text; full records live in the
/// retriever's [`DocumentStore`] and are looked up by slot after ranking.
pub struct TantivyRetriever {
	config: RetrieverConfig,
	store: DocumentStore,
	index: Index,
	reader: IndexReader,
	key_field: Field,
	slot_field: Field,
	text_field: Field,
}

impl TantivyRetriever {
	pub fn new(config: RetrieverConfig) -> Result<Self> {
		config.validate()?;
		let schema = build_schema();
		let index = Index::create_in_ram(schema.clone());
		register_tokenizer(&index);
		let reader = TryInto::<IndexReader>::try_into(index.reader_builder().reload_policy(ReloadPolicy::Manual)).map_err(tantivy_err)?;
		let key_field = schema.get_field(KEY_FIELD).map_err(tantivy_err)?;
		let slot_field = schema.get_field(SLOT_FIELD).map_err(tantivy_err)?;
		let text_field = schema.get_field(TEXT_FIELD).map_err(tantivy_err)?;
		Ok(Self { config, store: DocumentStore::new(), index, reader, key_field, slot_field, text_field })
	}

	/// Distinct terms of `query` under the field's analyzer, in query order.
	///
	/// Query text is never parsed as tantivy query syntax: `-`, `NOT`, `AND`
	/// and `*` are plain characters or stop words here.
	fn query_terms(&self, query: &str) -> Result<Vec<Term>> {
		let mut analyzer = self.index.tokenizer_for_field(self.text_field).map_err(tantivy_err)?;
		let mut stream = analyzer.token_stream(query);
		let mut terms: Vec<Term> = Vec::new();
		while stream.advance() {
			let term = Term::from_field_text(self.text_field, &stream.token().text);
			if !terms.contains(&term) { terms.push(term); }
		}
		Ok(terms)
	}
}

impl Retriever for TantivyRetriever {
	fn backend(&self) -> &'static str { "tantivy" }

	fn config(&self) -> &RetrieverConfig { &self.config }

	fn set_k(&mut self, k: Option<usize>) { self.config.k = k; }

	fn add(&mut self, documents: &[Document]) -> Result<()> {
		let batch = dedup_batch(&self.config.key, documents)?;
		if batch.is_empty() { return Ok(()); }

		let mut index_writer: IndexWriter = self.index.writer_with_num_threads(1, WRITER_MEMORY_BYTES).map_err(tantivy_err)?;
		let mut next_slot = self.store.len();
		for (key, doc) in &batch {
			// Replaced keys keep their slot; the stale tantivy doc is deleted.
			let slot = match self.store.slot_of(key) {
				Some(slot) => { index_writer.delete_term(Term::from_field_text(self.key_field, key.as_str())); slot }
				None => { next_slot += 1; next_slot - 1 }
			};
			index_writer.add_document(doc!(
				self.key_field => key.as_str().to_string(),
				self.slot_field => slot as u64,
				self.text_field => doc.text(&self.config.on),
			)).map_err(tantivy_err)?;
		}
		index_writer.commit().map_err(tantivy_err)?;
		self.reader.reload().map_err(tantivy_err)?;

		// Only touch the store once tantivy has committed.
		for (key, doc) in batch { self.store.upsert(key, doc); }
		debug!(backend = "tantivy", on = %self.config.on, added = documents.len(), total = self.store.len(), "indexed documents");
		Ok(())
	}

	fn search(&self, query: &str) -> Result<Vec<Document>> {
		if self.store.is_empty() { return Ok(vec![]); }
		let terms = self.query_terms(query)?;
		let limit = self.config.k.unwrap_or(self.store.len());
		if terms.is_empty() || limit == 0 { return Ok(vec![]); }
		// Any query term may match, as in the in-memory backends.
		let q = BooleanQuery::new(
			terms
				.into_iter()
				.map(|term| (Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs)) as Box<dyn Query>))
				.collect(),
		);
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&q, &TopDocs::with_limit(limit)).map_err(tantivy_err)?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (_score, addr) in top_docs {
			let stored: TantivyDocument = searcher.doc(addr).map_err(tantivy_err)?;
			let slot = stored.get_first(self.slot_field).and_then(|v| v.as_u64());
			match slot.and_then(|s| self.store.slot(s as usize)) {
				Some(doc) => hits.push(doc.clone()),
				None => warn!(backend = "tantivy", ?slot, "indexed document has no stored record"),
			}
		}
		debug!(backend = "tantivy", on = %self.config.on, query, hits = hits.len(), "search");
		Ok(hits)
	}

	fn len(&self) -> usize { self.store.len() }
}
