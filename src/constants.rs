//! Central Configuration Constants
//!
//! Single source of truth for all tunable defaults. To change a detection
//! threshold or training default, only edit this file.

/// App name
pub const APP_NAME: &str = "ai-log-core";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Scoring
// ============================================

/// Per-record anomaly score above which a record counts as high risk
pub const HIGH_RISK_THRESHOLD: f32 = 0.1;

// ============================================
// Fit-quality heuristic
// ============================================

/// Overfitting when val_loss > train_loss * OVERFIT_RATIO
pub const OVERFIT_RATIO: f32 = 1.5;

/// Underfitting ceiling for the reconstruction (autoencoder) backend
pub const AUTOENCODER_UNDERFIT_CEILING: f32 = 0.1;

/// Underfitting ceiling for the isolation-forest fallback backend
pub const FOREST_UNDERFIT_CEILING: f32 = 0.5;

// ============================================
// Training defaults (numeric path)
// ============================================

pub const DEFAULT_EPOCHS: usize = 20;
pub const DEFAULT_BATCH_SIZE: usize = 16;
pub const DEFAULT_DROPOUT: f32 = 0.1;

/// Classifier fine-tune is intentionally a single small-batch pass
/// to bound training latency.
pub const CLASSIFIER_EPOCHS: usize = 1;
pub const CLASSIFIER_BATCH_SIZE: usize = 4;

// ============================================
// Keyword vocabularies (fixed, closed)
// ============================================

pub const ERROR_KEYWORDS: &[&str] = &[
    "fail", "error", "timeout", "exception", "critical", "denied", "crash", "fatal",
];

pub const DB_KEYWORDS: &[&str] = &[
    "database", "sql", "query", "connection", "postgres", "db", "replicat",
];

/// Messages longer than this count as "overlong" in rule-based attribution
pub const LONG_MESSAGE_CHARS: usize = 100;

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Directory for persisted model artifacts.
///
/// Overridable via `AI_LOG_MODEL_DIR`; falls back to the platform data dir,
/// then `./models`.
pub fn model_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("AI_LOG_MODEL_DIR") {
        return dir.into();
    }
    dirs::data_local_dir()
        .map(|d| d.join("ai-log-core").join("models"))
        .unwrap_or_else(|| std::path::PathBuf::from("./models"))
}
