//! Deterministic text canonicalization pipeline used to normalize documents
//! (and, more lightly, queries) before embedding.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

const MAX_TEXT_LENGTH: usize = 2000;
const CODE_KEEP_HEAD: usize = 20;
const CODE_KEEP_TAIL: usize = 10;
const MAX_IMPORT_STREAK: usize = 2;
const DEFAULT_QUERY_MAX: usize = 500;

static MD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
// The `regex` crate has no backreferences, so each emphasis marker width
// gets its own pattern, applied longest-first so `***x***` doesn't get
// eaten by the `**` or `*` rule first.
static MD_EMPHASIS_RES: LazyLock<[Regex; 6]> = LazyLock::new(|| {
    [
        Regex::new(r"\*\*\*(.+?)\*\*\*").unwrap(),
        Regex::new(r"___(.+?)___").unwrap(),
        Regex::new(r"\*\*(.+?)\*\*").unwrap(),
        Regex::new(r"__(.+?)__").unwrap(),
        Regex::new(r"\*(.+?)\*").unwrap(),
        Regex::new(r"_(.+?)_").unwrap(),
    ]
});
static MD_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").unwrap());
static CODE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n]*\n(.*?)```").unwrap());
static URL_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*https?://\S+\s*$").unwrap());
static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(import |from \S+ import |use |#include |require\(|const .+ = require\()")
        .unwrap()
});

fn nfc(text: &str) -> String {
    text.nfc().collect()
}

fn strip_markdown(text: &str) -> String {
    let mut stripped = MD_LINK_RE.replace_all(text, "$1").into_owned();
    for re in MD_EMPHASIS_RES.iter() {
        stripped = re.replace_all(&stripped, "$1").into_owned();
    }
    MD_HEADING_RE.replace_all(&stripped, "").into_owned()
}

fn collapse_code_block(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    if lines.len() <= CODE_KEEP_HEAD + CODE_KEEP_TAIL {
        return code.to_string();
    }
    let head = &lines[..CODE_KEEP_HEAD];
    let tail = &lines[lines.len() - CODE_KEEP_TAIL..];
    let omitted = lines.len() - CODE_KEEP_HEAD - CODE_KEEP_TAIL;
    format!(
        "{}\n[... {omitted} lines omitted ...]\n{}",
        head.join("\n"),
        tail.join("\n")
    )
}

fn collapse_code_blocks(text: &str) -> String {
    CODE_BLOCK_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            collapse_code_block(&caps[1])
        })
        .into_owned()
}

fn filter_low_signal(text: &str) -> String {
    let cleaned = URL_LINE_RE.replace_all(text, "");
    let mut filtered = Vec::new();
    let mut import_streak = 0usize;
    for line in cleaned.lines() {
        if IMPORT_RE.is_match(line) {
            import_streak += 1;
        } else {
            import_streak = 0;
        }
        if import_streak <= MAX_IMPORT_STREAK {
            filtered.push(line);
        }
    }
    filtered.join("\n")
}

fn truncate_chars(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    text.chars().take(max_length).collect()
}

/// Full canonicalization pipeline for document text.
///
/// NFC normalize, strip markdown, collapse oversized fenced code blocks,
/// drop low-signal lines (bare URLs, long import streaks), then truncate.
/// Idempotent: `canonicalize(canonicalize(t)) == canonicalize(t)` for any
/// `t` not exceeding `max_length`.
#[must_use]
pub fn canonicalize(text: &str, max_length: usize) -> String {
    let normalized = nfc(text);
    let stripped = strip_markdown(&normalized);
    let collapsed = collapse_code_blocks(&stripped);
    let filtered = filter_low_signal(&collapsed);
    truncate_chars(&filtered, max_length)
}

/// [`canonicalize`] with a default `max_length` of 2000.
#[must_use]
pub fn canonicalize_default(text: &str) -> String {
    canonicalize(text, MAX_TEXT_LENGTH)
}

/// Lightweight canonicalization for query text: NFC normalize, trim, truncate.
///
/// No markdown or code-block rewriting — queries are short plain text and
/// document-oriented rewrites would discard signal from punctuation.
#[must_use]
pub fn canonicalize_query(text: &str, max_length: usize) -> String {
    truncate_chars(nfc(text.trim()).trim(), max_length)
}

/// [`canonicalize_query`] with a default `max_length` of 500.
#[must_use]
pub fn canonicalize_query_default(text: &str) -> String {
    canonicalize_query(text, DEFAULT_QUERY_MAX)
}
