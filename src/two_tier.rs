//! The two-tier progressive search orchestrator.

use std::sync::Arc;

use tracing::{debug, debug_span, warn};

use crate::blend::blend;
use crate::canonicalize::canonicalize_query_default;
use crate::config::Configuration;
use crate::embedder::Embedder;
use crate::fusion::{fuse, FusedHit};
use crate::lexical::LexicalBackend;
use crate::query_class::{adaptive_budget, classify, QueryClass};
use crate::vector_index::VectorIndex;

/// Which phase of progressive search produced a [`SearchResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    /// Fast embedder (+ optional lexical) fused result.
    Initial,
    /// Quality re-embedding blended with the initial result.
    Refined,
    /// Refinement was attempted but failed; `hits` carries the unchanged INITIAL result.
    RefinementFailed,
}

/// One step of the progressive search sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Which phase produced this result.
    pub phase: SearchPhase,
    /// Ordered hits for this phase.
    pub hits: Vec<FusedHit>,
}

/// Orchestrates two-tier progressive hybrid search.
///
/// Configured with an index, a fast embedder, optionally a quality embedder
/// and a lexical backend, and a [`Configuration`]. `search` returns a lazy,
/// at-most-two-element iterator of [`SearchResult`] — dropping it after the
/// first `next()` call cancels refinement with no side effects, since no
/// work happens until the iterator is polled.
pub struct TwoTierSearcher<'a> {
    index: &'a VectorIndex,
    fast_embedder: Arc<dyn Embedder>,
    quality_embedder: Option<Arc<dyn Embedder>>,
    lexical: Option<Arc<dyn LexicalBackend>>,
    config: Configuration,
}

impl<'a> TwoTierSearcher<'a> {
    /// Build a new searcher over `index`.
    #[must_use]
    pub fn new(
        index: &'a VectorIndex,
        fast_embedder: Arc<dyn Embedder>,
        quality_embedder: Option<Arc<dyn Embedder>>,
        lexical: Option<Arc<dyn LexicalBackend>>,
        config: Configuration,
    ) -> Self {
        Self {
            index,
            fast_embedder,
            quality_embedder,
            lexical,
            config,
        }
    }

    /// Perform two-tier progressive search for `query`, returning up to `k` hits per phase.
    pub fn search(&self, query: &str, k: usize) -> TwoTierSearchIter<'_> {
        TwoTierSearchIter::new(self, query.to_string(), k)
    }
}

/// Lazy iterator driving the two-tier search state machine.
///
/// State: `phase` starts at 0 (nothing yielded). The first `next()` call
/// runs the INITIAL phase and advances to phase 1 (or directly to "done"
/// on an empty query or fast-only config). The second `next()` call, if
/// reached, runs the REFINEMENT phase and advances to "done".
pub struct TwoTierSearchIter<'a> {
    searcher: &'a TwoTierSearcher<'a>,
    query: String,
    k: usize,
    phase: u8,
    initial_hits: Option<Vec<FusedHit>>,
    lexical_results: Vec<(String, f64)>,
}

impl<'a> TwoTierSearchIter<'a> {
    fn new(searcher: &'a TwoTierSearcher<'a>, query: String, k: usize) -> Self {
        Self {
            searcher,
            query,
            k,
            phase: 0,
            initial_hits: None,
            lexical_results: Vec::new(),
        }
    }

    fn run_initial(&mut self) -> SearchResult {
        let _span = debug_span!("two_tier.initial", query_len = self.query.len(), k = self.k).entered();

        let query_text = canonicalize_query_default(&self.query);
        let class = classify(&query_text);
        if class == QueryClass::Empty {
            debug!("empty query, short-circuiting to empty INITIAL result");
            return SearchResult {
                phase: SearchPhase::Initial,
                hits: Vec::new(),
            };
        }

        let budget = adaptive_budget(class, self.searcher.config.candidate_multiplier);
        let semantic_k = self.k * budget.semantic_multiplier;
        let lexical_k = self.k * budget.lexical_multiplier;

        let semantic_results = run_semantic(&*self.searcher.fast_embedder, self.searcher.index, &query_text, semantic_k);
        let lexical_results = run_lexical(self.searcher.lexical.as_deref(), &query_text, lexical_k);

        let mut hits = fuse_or_fallback(&lexical_results, &semantic_results, self.searcher.config.rrf_k);
        hits.truncate(self.k);

        debug!(result_count = hits.len(), "INITIAL phase complete");

        self.lexical_results = lexical_results;
        self.query = query_text;
        SearchResult {
            phase: SearchPhase::Initial,
            hits,
        }
    }

    fn run_refinement(&mut self) -> SearchResult {
        let _span = debug_span!("two_tier.refinement", query_len = self.query.len()).entered();
        let initial_hits = self.initial_hits.clone().unwrap_or_default();

        let Some(quality_embedder) = self.searcher.quality_embedder.as_ref() else {
            // search() only enters this branch when a quality embedder is configured.
            return SearchResult {
                phase: SearchPhase::RefinementFailed,
                hits: initial_hits,
            };
        };

        match self.try_refine(quality_embedder.as_ref()) {
            Ok(hits) => {
                debug!(result_count = hits.len(), "REFINED phase complete");
                SearchResult {
                    phase: SearchPhase::Refined,
                    hits,
                }
            }
            Err(reason) => {
                warn!(reason = %reason, "quality refinement failed, keeping INITIAL hits");
                SearchResult {
                    phase: SearchPhase::RefinementFailed,
                    hits: initial_hits,
                }
            }
        }
    }

    fn try_refine(&self, quality_embedder: &dyn Embedder) -> Result<Vec<FusedHit>, String> {
        let class = classify(&self.query);
        let budget = adaptive_budget(class, self.searcher.config.candidate_multiplier);
        let semantic_k = self.k * budget.semantic_multiplier;

        let quality_vec = quality_embedder
            .embed(&self.query)
            .map_err(|e| e.to_string())?;
        let quality_hits = self
            .searcher
            .index
            .search(&quality_vec, semantic_k)
            .map_err(|e| e.to_string())?;
        let quality_semantic: Vec<(String, f64)> = quality_hits
            .into_iter()
            .map(|hit| (hit.doc_id, f64::from(hit.score)))
            .collect();

        let mut quality_fused = fuse(&self.lexical_results, &quality_semantic, self.searcher.config.rrf_k);
        quality_fused.truncate(self.k);

        let initial_hits = self.initial_hits.clone().unwrap_or_default();
        let mut blended = blend(&initial_hits, &quality_fused, self.searcher.config.quality_weight);
        blended.truncate(self.k);
        Ok(blended)
    }
}

impl Iterator for TwoTierSearchIter<'_> {
    type Item = SearchResult;

    fn next(&mut self) -> Option<Self::Item> {
        match self.phase {
            0 => {
                let result = self.run_initial();
                self.initial_hits = Some(result.hits.clone());

                let empty_query = result.hits.is_empty() && self.lexical_results.is_empty() && classify(&self.query) == QueryClass::Empty;
                let skip_refinement =
                    empty_query || self.searcher.config.fast_only || self.searcher.quality_embedder.is_none();

                self.phase = if skip_refinement { 2 } else { 1 };
                Some(result)
            }
            1 => {
                self.phase = 2;
                Some(self.run_refinement())
            }
            _ => None,
        }
    }
}

fn run_semantic(
    embedder: &dyn Embedder,
    index: &VectorIndex,
    query_text: &str,
    semantic_k: usize,
) -> Vec<(String, f64)> {
    if semantic_k == 0 {
        return Vec::new();
    }
    let _span = debug_span!("two_tier.semantic", semantic_k).entered();
    match embedder.embed(query_text).and_then(|vec| index.search(&vec, semantic_k)) {
        Ok(hits) => hits.into_iter().map(|h| (h.doc_id, f64::from(h.score))).collect(),
        Err(e) => {
            warn!(error = %e, "fast embedding/search failed, continuing without semantic results");
            Vec::new()
        }
    }
}

fn run_lexical(
    backend: Option<&dyn LexicalBackend>,
    query_text: &str,
    lexical_k: usize,
) -> Vec<(String, f64)> {
    let Some(backend) = backend else {
        return Vec::new();
    };
    if lexical_k == 0 {
        return Vec::new();
    }
    let _span = debug_span!("two_tier.lexical", lexical_k).entered();
    match backend.search(query_text, lexical_k) {
        Ok(hits) => hits,
        Err(e) => {
            warn!(error = %e, "lexical search failed, continuing without lexical results");
            Vec::new()
        }
    }
}

fn fuse_or_fallback(
    lexical: &[(String, f64)],
    semantic: &[(String, f64)],
    rrf_k: f64,
) -> Vec<FusedHit> {
    if !lexical.is_empty() && !semantic.is_empty() {
        return fuse(lexical, semantic, rrf_k);
    }
    if !semantic.is_empty() {
        return semantic
            .iter()
            .enumerate()
            .map(|(rank, (doc_id, score))| FusedHit {
                doc_id: doc_id.clone(),
                rrf_score: *score,
                lexical_rank: None,
                semantic_rank: Some(rank),
                lexical_score: None,
                semantic_score: Some(*score),
                in_both_sources: false,
            })
            .collect();
    }
    if !lexical.is_empty() {
        return lexical
            .iter()
            .enumerate()
            .map(|(rank, (doc_id, score))| FusedHit {
                doc_id: doc_id.clone(),
                rrf_score: *score,
                lexical_rank: Some(rank),
                semantic_rank: None,
                lexical_score: Some(*score),
                semantic_score: None,
                in_both_sources: false,
            })
            .collect();
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::{HashEmbedder, ModelCategory};
    use std::sync::Mutex;

    struct StubEmbedder {
        vectors: Mutex<std::collections::HashMap<String, Vec<f32>>>,
        dim: usize,
        should_fail: bool,
    }

    impl StubEmbedder {
        fn new(dim: usize) -> Self {
            Self {
                vectors: Mutex::new(std::collections::HashMap::new()),
                dim,
                should_fail: false,
            }
        }

        fn with_failure(dim: usize) -> Self {
            Self {
                vectors: Mutex::new(std::collections::HashMap::new()),
                dim,
                should_fail: true,
            }
        }

        fn set(&self, text: &str, vector: Vec<f32>) {
            self.vectors.lock().unwrap().insert(text.to_string(), vector);
        }
    }

    impl Embedder for StubEmbedder {
        fn embed(&self, text: &str) -> crate::error::SearchResult<Vec<f32>> {
            if self.should_fail {
                return Err(crate::error::SearchError::EmbeddingFailed {
                    model: "stub".into(),
                    cause: Some("forced failure".into()),
                });
            }
            Ok(self
                .vectors
                .lock()
                .unwrap()
                .get(text)
                .cloned()
                .unwrap_or_else(|| vec![0.0; self.dim]))
        }

        fn dimension(&self) -> usize {
            self.dim
        }

        fn model_id(&self) -> &str {
            "stub"
        }

        fn is_semantic(&self) -> bool {
            true
        }

        fn category(&self) -> ModelCategory {
            ModelCategory::Fast
        }
    }

    fn build_index() -> VectorIndex {
        let mut idx = VectorIndex::new(2, "stub", false);
        idx.add("doc-a", vec![1.0, 0.0]).unwrap();
        idx.add("doc-b", vec![0.0, 1.0]).unwrap();
        idx.add("doc-c", vec![0.9, 0.1]).unwrap();
        idx
    }

    #[test]
    fn empty_query_short_circuits() {
        let index = build_index();
        let fast = Arc::new(HashEmbedder::default()) as Arc<dyn Embedder>;
        let searcher = TwoTierSearcher::new(&index, fast, None, None, Configuration::default());
        let results: Vec<_> = searcher.search("", 5).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].phase, SearchPhase::Initial);
        assert!(results[0].hits.is_empty());
    }

    #[test]
    fn fast_only_yields_single_initial_result() {
        let index = build_index();
        let fast = Arc::new(StubEmbedder::new(2));
        fast.set("find doc a", vec![1.0, 0.0]);
        let fast: Arc<dyn Embedder> = fast;
        let quality = Arc::new(StubEmbedder::new(2)) as Arc<dyn Embedder>;

        let config = Configuration::fast_only();
        let searcher = TwoTierSearcher::new(&index, fast, Some(quality), None, config);
        let results: Vec<_> = searcher.search("find doc a", 3).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].phase, SearchPhase::Initial);
    }

    #[test]
    fn progressive_two_phase_with_quality_embedder() {
        let index = build_index();
        let fast = Arc::new(StubEmbedder::new(2));
        fast.set("find doc a", vec![1.0, 0.0]);
        let quality = Arc::new(StubEmbedder::new(2));
        quality.set("find doc a", vec![0.9, 0.1]);

        let searcher = TwoTierSearcher::new(
            &index,
            fast as Arc<dyn Embedder>,
            Some(quality as Arc<dyn Embedder>),
            None,
            Configuration::default(),
        );
        let results: Vec<_> = searcher.search("find doc a", 3).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].phase, SearchPhase::Initial);
        assert_eq!(results[1].phase, SearchPhase::Refined);
    }

    #[test]
    fn no_quality_embedder_yields_single_initial_result() {
        let index = build_index();
        let fast = Arc::new(HashEmbedder::default()) as Arc<dyn Embedder>;
        let searcher = TwoTierSearcher::new(&index, fast, None, None, Configuration::default());
        let results: Vec<_> = searcher.search("find doc a", 3).collect();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn abandoning_after_initial_skips_refinement() {
        let index = build_index();
        let fast = Arc::new(StubEmbedder::new(2));
        fast.set("q", vec![1.0, 0.0]);
        let quality = Arc::new(StubEmbedder::new(2));

        let searcher = TwoTierSearcher::new(
            &index,
            fast as Arc<dyn Embedder>,
            Some(quality as Arc<dyn Embedder>),
            None,
            Configuration::default(),
        );
        let mut iter = searcher.search("q", 3);
        let first = iter.next();
        assert!(first.is_some());
        drop(iter); // abandon before polling REFINED
    }

    #[test]
    fn failing_quality_embedder_yields_refinement_failed_with_initial_hits() {
        let index = build_index();
        let fast = Arc::new(StubEmbedder::new(2));
        fast.set("q", vec![1.0, 0.0]);
        let quality = Arc::new(StubEmbedder::with_failure(2));

        let searcher = TwoTierSearcher::new(
            &index,
            fast as Arc<dyn Embedder>,
            Some(quality as Arc<dyn Embedder>),
            None,
            Configuration::default(),
        );
        let results: Vec<_> = searcher.search("q", 3).collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].phase, SearchPhase::RefinementFailed);
        assert_eq!(results[1].hits, results[0].hits);
    }

    #[test]
    fn failing_fast_embedder_degrades_to_empty_semantic_list_not_error() {
        let index = build_index();
        let fast = Arc::new(StubEmbedder::with_failure(2)) as Arc<dyn Embedder>;
        let searcher = TwoTierSearcher::new(&index, fast, None, None, Configuration::default());
        let results: Vec<_> = searcher.search("whatever happens here", 3).collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].phase, SearchPhase::Initial);
        assert!(results[0].hits.is_empty());
    }
}
