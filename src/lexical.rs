//! Capability interface for lexical (BM25-like) search backends, plus an
//! optional Tantivy-backed implementation.

use crate::error::SearchResult;

/// A structural capability for lexical (token-statistics) search.
///
/// Scores are non-negative; `search` returns results ordered by descending
/// score. This is a capability trait, not an inheritance root — concrete
/// backends are peers behind `Arc<dyn LexicalBackend>`.
pub trait LexicalBackend: Send + Sync {
    /// Index a batch of documents for lexical retrieval.
    fn index_documents(&mut self, doc_ids: &[String], texts: &[String]) -> SearchResult<()>;

    /// Return up to `limit` `(doc_id, score)` pairs ranked by descending score.
    fn search(&self, query: &str, limit: usize) -> SearchResult<Vec<(String, f64)>>;
}

#[cfg(feature = "tantivy-engine")]
pub use tantivy_backend::TantivyLexicalBackend;

#[cfg(feature = "tantivy-engine")]
mod tantivy_backend {
    use std::collections::HashMap;

    use tantivy::collector::TopDocs;
    use tantivy::query::QueryParser;
    use tantivy::schema::{Schema, Value, STORED, TEXT};
    use tantivy::{doc, Index, IndexWriter, TantivyDocument};

    use super::LexicalBackend;
    use crate::error::{SearchError, SearchResult};

    /// A single-field BM25 lexical backend built on Tantivy.
    pub struct TantivyLexicalBackend {
        index: Index,
        writer: IndexWriter,
        doc_id_field: tantivy::schema::Field,
        body_field: tantivy::schema::Field,
    }

    impl TantivyLexicalBackend {
        /// Build a fresh in-memory (RAM-backed) Tantivy index.
        ///
        /// # Errors
        /// Returns [`SearchError::IndexCorrupted`] if Tantivy fails to open
        /// the in-memory index or writer.
        pub fn new_in_memory() -> SearchResult<Self> {
            let mut schema_builder = Schema::builder();
            let doc_id_field = schema_builder.add_text_field("doc_id", STORED);
            let body_field = schema_builder.add_text_field("body", TEXT);
            let schema = schema_builder.build();

            let index = Index::create_in_ram(schema);
            let writer = index.writer(15_000_000).map_err(|e| SearchError::IndexCorrupted {
                path: "<in-memory>".to_string(),
                detail: e.to_string(),
            })?;

            Ok(Self {
                index,
                writer,
                doc_id_field,
                body_field,
            })
        }
    }

    impl LexicalBackend for TantivyLexicalBackend {
        fn index_documents(&mut self, doc_ids: &[String], texts: &[String]) -> SearchResult<()> {
            for (doc_id, text) in doc_ids.iter().zip(texts) {
                self.writer
                    .add_document(doc!(
                        self.doc_id_field => doc_id.clone(),
                        self.body_field => text.clone(),
                    ))
                    .map_err(|e| SearchError::IndexCorrupted {
                        path: "<in-memory>".to_string(),
                        detail: e.to_string(),
                    })?;
            }
            self.writer.commit().map_err(|e| SearchError::IndexCorrupted {
                path: "<in-memory>".to_string(),
                detail: e.to_string(),
            })?;
            Ok(())
        }

        fn search(&self, query: &str, limit: usize) -> SearchResult<Vec<(String, f64)>> {
            if limit == 0 {
                return Ok(Vec::new());
            }
            let reader = self.index.reader().map_err(|e| SearchError::IndexCorrupted {
                path: "<in-memory>".to_string(),
                detail: e.to_string(),
            })?;
            let searcher = reader.searcher();
            let parser = QueryParser::for_index(&self.index, vec![self.body_field]);
            let parsed = parser.parse_query(query).map_err(|e| SearchError::QueryParse {
                query: query.to_string(),
                detail: e.to_string(),
            })?;

            let top = searcher
                .search(&parsed, &TopDocs::with_limit(limit))
                .map_err(|e| SearchError::IndexCorrupted {
                    path: "<in-memory>".to_string(),
                    detail: e.to_string(),
                })?;

            let mut results = Vec::with_capacity(top.len());
            for (score, addr) in top {
                let retrieved: TantivyDocument =
                    searcher.doc(addr).map_err(|e| SearchError::IndexCorrupted {
                        path: "<in-memory>".to_string(),
                        detail: e.to_string(),
                    })?;
                if let Some(doc_id) = retrieved
                    .get_first(self.doc_id_field)
                    .and_then(|v| v.as_str())
                {
                    results.push((doc_id.to_string(), f64::from(score)));
                }
            }
            Ok(results)
        }
    }

}
