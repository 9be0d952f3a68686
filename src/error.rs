//! Error types for the search subsystem.

use thiserror::Error;

/// Result type alias for search operations.
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Closed error taxonomy used throughout the crate.
///
/// Every fallible operation maps to exactly one of these kinds.
#[derive(Debug, Error)]
pub enum SearchError {
    /// An embedder could not be loaded (missing model, etc).
    #[error("embedder unavailable: model={model}, reason={reason}")]
    EmbedderUnavailable {
        /// Model identifier that failed to load.
        model: String,
        /// Human-readable reason.
        reason: String,
    },

    /// A loaded embedder failed on a specific input.
    #[error("embedding failed for model {model}{}", cause.as_ref().map(|c| format!(": {c}")).unwrap_or_default())]
    EmbeddingFailed {
        /// Model identifier that failed.
        model: String,
        /// Optional underlying cause description.
        cause: Option<String>,
    },

    /// Persisted index files are missing, truncated, or semantically inconsistent.
    #[error("index corrupted at {path}: {detail}")]
    IndexCorrupted {
        /// Base path of the index that failed to load.
        path: String,
        /// What specifically was wrong.
        detail: String,
    },

    /// An embedding or query vector width does not match the declared index dimension.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Dimension declared by the index.
        expected: usize,
        /// Dimension actually observed.
        found: usize,
    },

    /// Reserved for structured query parsing; unused by the core pipeline today.
    #[error("query parse error for '{query}': {detail}")]
    QueryParse {
        /// The offending query string.
        query: String,
        /// Parse failure detail.
        detail: String,
    },

    /// Reserved for timeout surfacing; advisory only in the core pipeline.
    #[error("search timeout: {elapsed_ms:.1}ms exceeded {budget_ms:.1}ms budget")]
    SearchTimeout {
        /// Elapsed time in milliseconds.
        elapsed_ms: f64,
        /// Configured budget in milliseconds.
        budget_ms: f64,
    },

    /// I/O error during index persistence.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error in the metadata sidecar.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SearchError {
    /// Returns a stable SCREAMING_SNAKE_CASE tag for structured log fields.
    #[must_use]
    pub const fn error_kind(&self) -> &'static str {
        match self {
            Self::EmbedderUnavailable { .. } => "EMBEDDER_UNAVAILABLE",
            Self::EmbeddingFailed { .. } => "EMBEDDING_FAILED",
            Self::IndexCorrupted { .. } => "INDEX_CORRUPTED",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::QueryParse { .. } => "QUERY_PARSE",
            Self::SearchTimeout { .. } => "SEARCH_TIMEOUT",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}
