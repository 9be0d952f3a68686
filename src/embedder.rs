//! Capability interfaces for text embedding and a zero-dependency hash
//! embedder implementation.

use crate::error::SearchResult;

/// Advisory quality tier of an embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelCategory {
    /// Hash-based, non-semantic, zero ML dependency.
    Hash,
    /// Fast/low-latency semantic tier, used for the INITIAL phase.
    Fast,
    /// Higher-quality semantic tier, used for the REFINED phase.
    Quality,
}

/// A structural capability for mapping text to a fixed-dimension dense vector.
///
/// Implementations may be lazily initialized (e.g. a model loaded from disk
/// on first use); the first call may fail with
/// [`crate::error::SearchError::EmbedderUnavailable`]. This is a capability
/// trait, not an inheritance root — concrete embedders (hash, fast, quality)
/// are peers behind `Arc<dyn Embedder>`, never subclasses of one another.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector of [`Embedder::dimension`] floats.
    fn embed(&self, text: &str) -> SearchResult<Vec<f32>>;

    /// Embed multiple texts. The default implementation calls [`Embedder::embed`]
    /// once per text; implementations with batched inference should override it.
    fn embed_batch(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// The output embedding dimension.
    fn dimension(&self) -> usize;

    /// A stable identifier for the concrete model/algorithm (used as the
    /// vector index's `embedder_id`).
    fn model_id(&self) -> &str;

    /// Whether the embedding captures semantic similarity (`false` for the
    /// hash embedder, `true` for fast/quality tiers).
    fn is_semantic(&self) -> bool;

    /// The embedder's advisory quality tier.
    fn category(&self) -> ModelCategory;
}

// FNV-1a 64-bit constants.
const FNV_OFFSET: u64 = 0xCBF2_9CE4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;
const SIGN_BIT: u32 = 32;
const DEFAULT_DIM: usize = 384;
const DEFAULT_NGRAM: usize = 3;

fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn scatter_ngram(vec: &mut [f64], gram: &[u8]) {
    let hash = fnv1a_hash(gram);
    let bucket = (hash % vec.len() as u64) as usize;
    let sign = if (hash >> SIGN_BIT) & 1 == 1 { 1.0 } else { -1.0 };
    vec[bucket] += sign;
}

fn l2_normalize(vec: Vec<f64>) -> Vec<f32> {
    let norm = vec.iter().map(|c| c * c).sum::<f64>().sqrt();
    if norm > 0.0 {
        vec.into_iter().map(|c| (c / norm) as f32).collect()
    } else {
        vec.into_iter().map(|c| c as f32).collect()
    }
}

/// Deterministic hash-based embedder using FNV-1a over overlapping byte
/// n-grams, scattered into signed buckets and L2-normalized.
///
/// Not semantic, but zero-dependency and always available — useful as a
/// fallback fast tier and for exact/fuzzy matching in tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    ngram_size: usize,
    model_id: String,
}

impl HashEmbedder {
    /// Create a hash embedder with the given output dimension and n-gram size.
    #[must_use]
    pub fn new(dim: usize, ngram_size: usize) -> Self {
        Self {
            dim,
            ngram_size,
            model_id: format!("fnv1a-{dim}d"),
        }
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM, DEFAULT_NGRAM)
    }
}

impl Embedder for HashEmbedder {
    fn embed(&self, text: &str) -> SearchResult<Vec<f32>> {
        let mut vec = vec![0.0f64; self.dim];
        let bytes = text.as_bytes();
        if bytes.len() < self.ngram_size {
            scatter_ngram(&mut vec, bytes);
        } else {
            for start in 0..=(bytes.len() - self.ngram_size) {
                scatter_ngram(&mut vec, &bytes[start..start + self.ngram_size]);
            }
        }
        Ok(l2_normalize(vec))
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn is_semantic(&self) -> bool {
        false
    }

    fn category(&self) -> ModelCategory {
        ModelCategory::Hash
    }
}

#[cfg(feature = "quality-fastembed")]
pub use fastembed_quality::FastEmbedEmbedder;

#[cfg(feature = "quality-fastembed")]
mod fastembed_quality {
    use std::path::Path;

    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

    use super::{Embedder, ModelCategory};
    use crate::error::{SearchError, SearchResult};

    /// Quality-tier embedder backed by a local ONNX model via `fastembed`.
    ///
    /// Construction downloads/loads model weights into `cache_dir` and is
    /// therefore the one place an [`SearchError::EmbedderUnavailable`] is
    /// expected in ordinary operation (missing network access, unsupported
    /// model name, corrupt cache).
    pub struct FastEmbedEmbedder {
        model: TextEmbedding,
        dimension: usize,
        model_id: String,
    }

    impl FastEmbedEmbedder {
        /// Load `model_name` from (or into) `cache_dir`.
        ///
        /// # Errors
        /// Returns [`SearchError::EmbedderUnavailable`] if `model_name` is not
        /// a recognized fastembed model, or the model fails to load.
        pub fn try_new(model_name: &str, cache_dir: &Path) -> SearchResult<Self> {
            let embedding_model = model_name_to_enum(model_name).ok_or_else(|| SearchError::EmbedderUnavailable {
                model: model_name.to_string(),
                reason: "unrecognized fastembed model name".to_string(),
            })?;

            let options = InitOptions::new(embedding_model).with_cache_dir(cache_dir.to_path_buf());
            let model = TextEmbedding::try_new(options).map_err(|e| SearchError::EmbedderUnavailable {
                model: model_name.to_string(),
                reason: e.to_string(),
            })?;

            let probe = model
                .embed(vec!["dimension probe".to_string()], None)
                .map_err(|e| SearchError::EmbedderUnavailable {
                    model: model_name.to_string(),
                    reason: e.to_string(),
                })?;
            let dimension = probe
                .first()
                .map(Vec::len)
                .ok_or_else(|| SearchError::EmbedderUnavailable {
                    model: model_name.to_string(),
                    reason: "model produced no output for its probe embedding".to_string(),
                })?;

            Ok(Self {
                model,
                dimension,
                model_id: model_name.to_string(),
            })
        }
    }

    impl Embedder for FastEmbedEmbedder {
        fn embed(&self, text: &str) -> SearchResult<Vec<f32>> {
            let mut batch = self.embed_batch(std::slice::from_ref(&text.to_string()))?;
            Ok(batch.remove(0))
        }

        fn embed_batch(&self, texts: &[String]) -> SearchResult<Vec<Vec<f32>>> {
            self.model
                .embed(texts.to_vec(), None)
                .map_err(|e| SearchError::EmbeddingFailed {
                    model: self.model_id.clone(),
                    cause: Some(e.to_string()),
                })
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_id(&self) -> &str {
            &self.model_id
        }

        fn is_semantic(&self) -> bool {
            true
        }

        fn category(&self) -> ModelCategory {
            ModelCategory::Quality
        }
    }

    fn model_name_to_enum(name: &str) -> Option<EmbeddingModel> {
        match name {
            "all-MiniLM-L6-v2" => Some(EmbeddingModel::AllMiniLML6V2),
            "bge-small-en-v1.5" => Some(EmbeddingModel::BGESmallENV15),
            "bge-base-en-v1.5" => Some(EmbeddingModel::BGEBaseENV15),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_across_calls() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("hello world").unwrap();
        let b = embedder.embed("hello world").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn output_is_l2_normalized() {
        let embedder = HashEmbedder::default();
        let v = embedder.embed("some reasonably long piece of text").unwrap();
        let norm: f32 = v.iter().map(|c| c * c).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
    }

    #[test]
    fn dimension_matches_configured() {
        let embedder = HashEmbedder::new(64, 3);
        assert_eq!(embedder.embed("x").unwrap().len(), 64);
        assert_eq!(embedder.dimension(), 64);
    }

    #[test]
    fn short_text_below_ngram_size_does_not_panic() {
        let embedder = HashEmbedder::new(16, 3);
        assert_eq!(embedder.embed("ab").unwrap().len(), 16);
        assert_eq!(embedder.embed("").unwrap().len(), 16);
    }

    #[test]
    fn model_id_reports_dimension() {
        assert_eq!(HashEmbedder::new(128, 3).model_id(), "fnv1a-128d");
    }

    #[test]
    fn category_and_semantic_flag() {
        let embedder = HashEmbedder::default();
        assert_eq!(embedder.category(), ModelCategory::Hash);
        assert!(!embedder.is_semantic());
    }

    #[test]
    fn embed_batch_matches_individual_embeds() {
        let embedder = HashEmbedder::default();
        let texts = vec!["one".to_string(), "two".to_string()];
        let batch = embedder.embed_batch(&texts).unwrap();
        assert_eq!(batch[0], embedder.embed("one").unwrap());
        assert_eq!(batch[1], embedder.embed("two").unwrap());
    }
}
