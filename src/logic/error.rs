//! Crate-wide error taxonomy.
//!
//! Recoverable conditions (missing optional runtime, insufficient validation
//! data, explainer failure) are handled locally with defined fallbacks and
//! never reach this type. Only caller-input errors and total fit failures
//! are surfaced.

#[derive(Debug)]
pub enum EngineError {
    /// Missing/empty required records or fields. Rejected immediately,
    /// no partial effects.
    InputInvalid(String),
    /// A requested backend cannot be fit and no fallback exists.
    BackendUnavailable(String),
    /// The chosen backend's training step failed. Registry left untouched.
    FitFailure(String),
    /// Scoring/classification requested before any successful training.
    ModelNotRegistered(String),
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InputInvalid(msg) => write!(f, "Invalid input: {}", msg),
            EngineError::BackendUnavailable(msg) => write!(f, "Backend unavailable: {}", msg),
            EngineError::FitFailure(msg) => write!(f, "Training failed: {}", msg),
            EngineError::ModelNotRegistered(msg) => write!(f, "Model not registered: {}", msg),
            EngineError::Io(e) => write!(f, "IO Error: {}", e),
            EngineError::Serialization(e) => write!(f, "Serialization Error: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err)
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err)
    }
}
