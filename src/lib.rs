//! A small, embeddable hybrid search engine: lexical and dense-vector
//! semantic retrieval merged by Reciprocal Rank Fusion, exposed through a
//! two-tier progressive refinement protocol.
//!
//! Callers assemble a [`two_tier::TwoTierSearcher`] from a
//! [`vector_index::VectorIndex`], an [`embedder::Embedder`] for the fast
//! tier, optionally a second `Embedder` for the quality tier, and optionally
//! a [`lexical::LexicalBackend`]. `TwoTierSearcher::search` returns a lazy
//! iterator of at most two [`two_tier::SearchResult`]s: an INITIAL result
//! and, unless configuration or an embedder says otherwise, a REFINED (or
//! REFINEMENT_FAILED) result.

pub mod blend;
pub mod canonicalize;
pub mod config;
pub mod embedder;
pub mod error;
pub mod fusion;
pub mod lexical;
pub mod query_class;
pub mod two_tier;
pub mod vector_index;

#[cfg(feature = "cli")]
pub mod cli;

pub use blend::blend;
pub use config::Configuration;
pub use embedder::{Embedder, HashEmbedder, ModelCategory};
pub use error::{SearchError, SearchResult as Result};
pub use fusion::{fuse, fuse_default, FusedHit, DEFAULT_RRF_K};
pub use lexical::LexicalBackend;
pub use query_class::{adaptive_budget, classify, CandidateBudget, QueryClass};
pub use two_tier::{SearchPhase, SearchResult, TwoTierSearcher};
pub use vector_index::{VectorHit, VectorIndex};

#[cfg(feature = "tantivy-engine")]
pub use lexical::TantivyLexicalBackend;

#[cfg(feature = "quality-fastembed")]
pub use embedder::FastEmbedEmbedder;
