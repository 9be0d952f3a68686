//! Immutable search configuration, resolved once at the outer boundary from
//! environment variables.

use std::path::PathBuf;

const DEFAULT_QUALITY_WEIGHT: f64 = 0.7;
const DEFAULT_RRF_K: f64 = 60.0;
const DEFAULT_TIMEOUT_MS: f64 = 500.0;
const DEFAULT_MULTIPLIER: usize = 3;
const DEFAULT_FAST_MODEL: &str = "potion-multilingual-128M";
const DEFAULT_QUALITY_MODEL: &str = "all-MiniLM-L6-v2";

/// Immutable configuration for a [`crate::two_tier::TwoTierSearcher`].
///
/// Built once per search instance. The core pipeline never reads the
/// environment itself — only [`Configuration::from_env`] does, at the
/// outer boundary (typically the CLI).
#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Weight given to the quality-tier score during blend, in `[0, 1]`.
    pub quality_weight: f64,
    /// RRF damping constant.
    pub rrf_k: f64,
    /// Base per-source candidate multiplier (`m` in the adaptive budget table).
    pub candidate_multiplier: usize,
    /// Advisory quality-phase time budget in milliseconds; logged, not enforced.
    pub quality_timeout_ms: f64,
    /// When true, skip the refinement phase entirely.
    pub fast_only: bool,
    /// Directory embedder implementations may use to cache model files.
    pub model_dir: PathBuf,
    /// Identifier of the configured fast-tier model.
    pub fast_model: String,
    /// Identifier of the configured quality-tier model.
    pub quality_model: String,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            quality_weight: DEFAULT_QUALITY_WEIGHT,
            rrf_k: DEFAULT_RRF_K,
            candidate_multiplier: DEFAULT_MULTIPLIER,
            quality_timeout_ms: DEFAULT_TIMEOUT_MS,
            fast_only: false,
            model_dir: default_model_dir(),
            fast_model: DEFAULT_FAST_MODEL.to_string(),
            quality_model: DEFAULT_QUALITY_MODEL.to_string(),
        }
    }
}

impl Configuration {
    /// Resolve a `Configuration` from `BRR_*` environment variables, falling
    /// back to defaults for anything absent or unparseable. Never panics.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            quality_weight: env_float("BRR_QUALITY_WEIGHT", defaults.quality_weight),
            rrf_k: env_float("BRR_RRF_K", defaults.rrf_k),
            candidate_multiplier: env_usize("BRR_CANDIDATE_MULTIPLIER", defaults.candidate_multiplier),
            quality_timeout_ms: env_float("BRR_QUALITY_TIMEOUT_MS", defaults.quality_timeout_ms),
            fast_only: env_bool("BRR_FAST_ONLY", defaults.fast_only),
            model_dir: std::env::var("BRR_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            fast_model: std::env::var("BRR_FAST_MODEL").unwrap_or(defaults.fast_model),
            quality_model: std::env::var("BRR_QUALITY_MODEL").unwrap_or(defaults.quality_model),
        }
    }

    /// A config with `fast_only = true`, convenient for fast-tier-only callers.
    #[must_use]
    pub fn fast_only() -> Self {
        Self {
            fast_only: true,
            ..Self::default()
        }
    }
}

#[cfg(feature = "cli")]
fn default_model_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("brr")
        .join("models")
}

#[cfg(not(feature = "cli"))]
fn default_model_dir() -> PathBuf {
    std::env::temp_dir().join("brr").join("models")
}

fn env_float(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|raw| raw.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|raw| raw.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).unwrap_or_default().to_lowercase().as_str() {
        "1" | "true" | "yes" => true,
        "0" | "false" | "no" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_match_spec() {
        let cfg = Configuration::default();
        assert!((cfg.quality_weight - 0.7).abs() < f64::EPSILON);
        assert!((cfg.rrf_k - 60.0).abs() < f64::EPSILON);
        assert_eq!(cfg.candidate_multiplier, 3);
        assert!((cfg.quality_timeout_ms - 500.0).abs() < f64::EPSILON);
        assert!(!cfg.fast_only);
    }

    #[test]
    fn from_env_falls_back_on_unparseable_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("BRR_RRF_K", "not-a-number");
        let cfg = Configuration::from_env();
        assert!((cfg.rrf_k - 60.0).abs() < f64::EPSILON);
        std::env::remove_var("BRR_RRF_K");
    }

    #[test]
    fn from_env_reads_valid_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("BRR_QUALITY_WEIGHT", "0.5");
        std::env::set_var("BRR_FAST_ONLY", "true");
        let cfg = Configuration::from_env();
        assert!((cfg.quality_weight - 0.5).abs() < f64::EPSILON);
        assert!(cfg.fast_only);
        std::env::remove_var("BRR_QUALITY_WEIGHT");
        std::env::remove_var("BRR_FAST_ONLY");
    }

    #[test]
    fn fast_only_constructor() {
        assert!(Configuration::fast_only().fast_only);
    }
}
