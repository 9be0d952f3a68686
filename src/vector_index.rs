//! Dimension-typed in-memory dense vector store with brute-force top-k
//! search and a compact half-precision persistence format.

use std::cmp::Ordering;
use std::io::{Read, Write};
use std::path::Path;

use half::f16;
use serde::{Deserialize, Serialize};

use crate::error::{SearchError, SearchResult};

const META_VERSION: u32 = 1;

/// A single vector search hit: the row index, raw dot-product score, and
/// the document id stored at that row.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    /// Row index within the index at the time of the search.
    pub index: usize,
    /// Dot-product score against the query vector.
    pub score: f32,
    /// Document identifier stored at this row.
    pub doc_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexMetadata {
    version: u32,
    embedder_id: String,
    dimension: usize,
    quantization: String,
    record_count: usize,
    doc_ids: Vec<String>,
}

/// Dimension-typed dense vector store.
///
/// Holds `(D, embedder_id, quantization_flag, doc_ids[], vectors[N×D])`.
/// `doc_ids` preserves insertion order; duplicate ids are not rejected —
/// each row is searched independently.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    embedder_id: String,
    use_half_precision: bool,
    doc_ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Create an empty index for `dimension`-wide vectors built by `embedder_id`.
    ///
    /// `use_half_precision` controls only the *persisted* representation;
    /// in-memory vectors are always 32-bit.
    #[must_use]
    pub fn new(dimension: usize, embedder_id: impl Into<String>, use_half_precision: bool) -> Self {
        Self {
            dimension,
            embedder_id: embedder_id.into(),
            use_half_precision,
            doc_ids: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Declared embedding dimension.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed rows.
    #[must_use]
    pub fn count(&self) -> usize {
        self.doc_ids.len()
    }

    /// Whether the index holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// The embedder identifier this index was built with.
    #[must_use]
    pub fn embedder_id(&self) -> &str {
        &self.embedder_id
    }

    /// A defensive copy of all document ids in insertion (row) order.
    #[must_use]
    pub fn doc_ids(&self) -> Vec<String> {
        self.doc_ids.clone()
    }

    /// Append a single document embedding.
    ///
    /// # Errors
    /// Returns [`SearchError::DimensionMismatch`] if `embedding.len() != self.dimension()`.
    pub fn add(&mut self, doc_id: impl Into<String>, embedding: Vec<f32>) -> SearchResult<()> {
        if embedding.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                found: embedding.len(),
            });
        }
        self.doc_ids.push(doc_id.into());
        self.vectors.push(embedding);
        Ok(())
    }

    /// Append a batch of document embeddings.
    ///
    /// Validates the full batch before mutating the index, so a failure
    /// leaves the index unchanged.
    ///
    /// # Panics
    /// Panics if `doc_ids.len() != embeddings.len()` — this is a caller
    /// contract violation (the two vectors are built together by the
    /// caller), not a data-dependent error the closed [`SearchError`]
    /// taxonomy models.
    ///
    /// # Errors
    /// Returns [`SearchError::DimensionMismatch`] if any row's length differs
    /// from `self.dimension()`.
    pub fn add_batch(
        &mut self,
        doc_ids: Vec<String>,
        embeddings: Vec<Vec<f32>>,
    ) -> SearchResult<()> {
        assert_eq!(
            doc_ids.len(),
            embeddings.len(),
            "add_batch: doc_ids and embeddings must have the same length"
        );
        for row in &embeddings {
            if row.len() != self.dimension {
                return Err(SearchError::DimensionMismatch {
                    expected: self.dimension,
                    found: row.len(),
                });
            }
        }
        self.doc_ids.extend(doc_ids);
        self.vectors.extend(embeddings);
        Ok(())
    }

    /// Brute-force top-k search by dot product.
    ///
    /// `k >= count()` performs a full descending sort; `k < count()` uses a
    /// quickselect-style partial selection followed by sorting just the
    /// selected `k`. NaN scores are treated as `-∞`. Ties resolve by
    /// ascending row index (stable w.r.t. insertion order).
    ///
    /// # Errors
    /// Returns [`SearchError::DimensionMismatch`] if `query.len() != self.dimension()`.
    pub fn search(&self, query: &[f32], k: usize) -> SearchResult<Vec<VectorHit>> {
        if query.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }
        let n = self.vectors.len();
        if n == 0 || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, row)| {
                let score = dot_product(query, row);
                (idx, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();

        let k = k.min(n);
        if k < n {
            scored.select_nth_unstable_by(k - 1, rank_cmp);
            scored.truncate(k);
        }
        scored.sort_by(rank_cmp);

        Ok(scored
            .into_iter()
            .map(|(idx, score)| VectorHit {
                index: idx,
                score,
                doc_id: self.doc_ids[idx].clone(),
            })
            .collect())
    }

    /// Persist the index as `<base>.npz` (compressed vector payload) and
    /// `<base>.json` (metadata sidecar).
    ///
    /// # Errors
    /// Propagates I/O and JSON serialization failures.
    pub fn save(&self, base: &Path) -> SearchResult<()> {
        let npz_path = base.with_extension("npz");
        let json_path = base.with_extension("json");

        let raw: Vec<u8> = if self.use_half_precision {
            let mut buf = Vec::with_capacity(self.vectors.len() * self.dimension * 2);
            for row in &self.vectors {
                for &value in row {
                    buf.extend_from_slice(&f16::from_f32(value).to_le_bytes());
                }
            }
            buf
        } else {
            let mut buf = Vec::with_capacity(self.vectors.len() * self.dimension * 4);
            for row in &self.vectors {
                for &value in row {
                    buf.extend_from_slice(&value.to_le_bytes());
                }
            }
            buf
        };

        let file = std::fs::File::create(&npz_path)?;
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(&raw)?;
        encoder.finish()?;

        let meta = IndexMetadata {
            version: META_VERSION,
            embedder_id: self.embedder_id.clone(),
            dimension: self.dimension,
            quantization: if self.use_half_precision { "f16" } else { "f32" }.to_string(),
            record_count: self.doc_ids.len(),
            doc_ids: self.doc_ids.clone(),
        };
        let json = serde_json::to_string_pretty(&meta)?;
        std::fs::write(&json_path, json)?;
        Ok(())
    }

    /// Load an index previously written by [`VectorIndex::save`].
    ///
    /// Half-precision payloads are widened to f32 immediately; in-memory
    /// computation is always 32-bit.
    ///
    /// # Errors
    /// Returns [`SearchError::IndexCorrupted`] if either file is missing,
    /// the metadata is malformed, or the payload's shape disagrees with it.
    pub fn load(base: &Path) -> SearchResult<Self> {
        let npz_path = base.with_extension("npz");
        let json_path = base.with_extension("json");

        if !json_path.exists() {
            return Err(SearchError::IndexCorrupted {
                path: json_path.display().to_string(),
                detail: "metadata sidecar not found".to_string(),
            });
        }
        if !npz_path.exists() {
            return Err(SearchError::IndexCorrupted {
                path: npz_path.display().to_string(),
                detail: "vector payload not found".to_string(),
            });
        }

        let json_text = std::fs::read_to_string(&json_path)?;
        let meta: IndexMetadata = serde_json::from_str(&json_text).map_err(|e| SearchError::IndexCorrupted {
            path: json_path.display().to_string(),
            detail: format!("invalid metadata: {e}"),
        })?;

        if meta.doc_ids.len() != meta.record_count {
            return Err(SearchError::IndexCorrupted {
                path: json_path.display().to_string(),
                detail: format!(
                    "record_count {} does not match doc_ids length {}",
                    meta.record_count,
                    meta.doc_ids.len()
                ),
            });
        }

        let file = std::fs::File::open(&npz_path)?;
        let mut decoder = flate2::read::GzDecoder::new(file);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;

        let use_half = meta.quantization == "f16";
        let elem_size = if use_half { 2 } else { 4 };
        let expected_len = meta.record_count * meta.dimension * elem_size;
        if raw.len() != expected_len {
            return Err(SearchError::IndexCorrupted {
                path: npz_path.display().to_string(),
                detail: format!(
                    "payload length {} does not match expected {} for {} rows of dimension {}",
                    raw.len(),
                    expected_len,
                    meta.record_count,
                    meta.dimension
                ),
            });
        }

        let mut vectors = Vec::with_capacity(meta.record_count);
        for row_idx in 0..meta.record_count {
            let mut row = Vec::with_capacity(meta.dimension);
            for col in 0..meta.dimension {
                let offset = (row_idx * meta.dimension + col) * elem_size;
                let value = if use_half {
                    f16::from_le_bytes([raw[offset], raw[offset + 1]]).to_f32()
                } else {
                    f32::from_le_bytes([
                        raw[offset],
                        raw[offset + 1],
                        raw[offset + 2],
                        raw[offset + 3],
                    ])
                };
                row.push(value);
            }
            vectors.push(row);
        }

        Ok(Self {
            dimension: meta.dimension,
            embedder_id: meta.embedder_id,
            use_half_precision: use_half,
            doc_ids: meta.doc_ids,
            vectors,
        })
    }
}

fn rank_cmp(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0))
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
