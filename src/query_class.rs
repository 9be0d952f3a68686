//! Query classification and adaptive per-source candidate budgeting.

use std::sync::LazyLock;

use regex::Regex;

/// Classifies a trimmed query string for adaptive retrieval strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryClass {
    /// Empty (after trimming).
    Empty,
    /// A single token that looks like an identifier, path, or ticket id.
    Identifier,
    /// At most three whitespace-delimited tokens.
    ShortKeyword,
    /// Anything longer than [`QueryClass::ShortKeyword`].
    NaturalLanguage,
}

static TICKET_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-zA-Z]+-\d+$").unwrap());
static PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[/\\]").unwrap());
static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w./-]+$").unwrap());

const SHORT_KEYWORD_MAX_WORDS: usize = 3;

/// Classify a query for adaptive retrieval budgets.
///
/// `query` should already have been passed through [`crate::canonicalize::canonicalize_query`];
/// this function trims again defensively.
///
/// The `IDENTIFIER` branch deliberately accepts any single token matching
/// `^[\w./-]+$`, including short plain words like `"error"` — this biases
/// single-word queries toward the lexical signal and is intentional, not a
/// bug, even though it can surprise callers expecting word-length heuristics.
#[must_use]
pub fn classify(query: &str) -> QueryClass {
    let stripped = query.trim();
    if stripped.is_empty() {
        return QueryClass::Empty;
    }

    let words: Vec<&str> = stripped.split_whitespace().collect();
    if words.len() == 1 {
        let token = words[0];
        if TICKET_ID_RE.is_match(token) || PATH_RE.is_match(token) || IDENTIFIER_RE.is_match(token)
        {
            return QueryClass::Identifier;
        }
    }

    if words.len() <= SHORT_KEYWORD_MAX_WORDS {
        QueryClass::ShortKeyword
    } else {
        QueryClass::NaturalLanguage
    }
}

/// Per-source candidate multipliers derived from a query's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateBudget {
    /// Multiplier applied to `k` for the lexical backend's retrieval breadth.
    pub lexical_multiplier: usize,
    /// Multiplier applied to `k` for the vector index's retrieval breadth.
    pub semantic_multiplier: usize,
}

/// Compute per-source candidate multipliers for a query class.
///
/// `base_multiplier` is the configured `candidate_multiplier` (spec default 3).
#[must_use]
pub fn adaptive_budget(class: QueryClass, base_multiplier: usize) -> CandidateBudget {
    match class {
        QueryClass::Empty => CandidateBudget {
            lexical_multiplier: 0,
            semantic_multiplier: 0,
        },
        QueryClass::Identifier => CandidateBudget {
            lexical_multiplier: base_multiplier * 2,
            semantic_multiplier: (base_multiplier / 2).max(1),
        },
        QueryClass::ShortKeyword => CandidateBudget {
            lexical_multiplier: base_multiplier,
            semantic_multiplier: base_multiplier,
        },
        QueryClass::NaturalLanguage => CandidateBudget {
            lexical_multiplier: (base_multiplier / 2).max(1),
            semantic_multiplier: base_multiplier * 2,
        },
    }
}
