//! Engine API - the typed operation surface a transport layer binds to.
//!
//! Every operation takes plain request structs and returns serializable
//! reports, so an HTTP handler or IPC command is a thin shim around one
//! method call. The [`Engine`] owns all shared state: the model registry,
//! the corpus cache, the capability probe, and the artifact directory.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants;
use crate::logic::attribute::{self, AttributionReport};
use crate::logic::dataset::{parse_log_lines, CorpusStore};
use crate::logic::error::EngineError;
use crate::logic::features;
use crate::logic::model::classifier::CRITICAL_CLASS;
use crate::logic::model::tabular::{encode_input_row, TabularModelKind};
use crate::logic::model::{BackendKind, Capabilities};
use crate::logic::normalize::NormalizationProfile;
use crate::logic::record::LogRecord;
use crate::logic::registry::{load_classifier, ModelRegistry};
use crate::logic::score::{score_records, ScoreReport};
use crate::logic::train::{
    self, ClassifierTrainReport, Hyperparameters, NumericTrainReport, TabularTrainReport,
    TrainReport,
};

/// Initialize structured logging. Call once at process startup; respects
/// `RUST_LOG`, defaulting to info.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
    log::info!("{} v{} logging initialized", constants::APP_NAME, constants::APP_VERSION);
}

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TrainRequest {
    /// Requested backend name; unknown names are rejected.
    pub backend: String,
    /// Inline training records, for numeric backends and custom datasets.
    #[serde(default)]
    pub records: Option<Vec<LogRecord>>,
    #[serde(default)]
    pub hyperparameters: Hyperparameters,
    /// Classifier path only.
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub dataset_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TabularTrainRequest {
    pub csv_data: String,
    /// Subtype name, e.g. "random_forest".
    pub model_type: String,
    pub feature_columns: Vec<String>,
    pub target_column: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyRequest {
    pub text: String,
    /// "classifier" for the sequence classifier, or a tabular subtype name.
    pub backend: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyResult {
    pub label: String,
    pub confidence: f32,
    pub class_id: usize,
}

// ============================================================================
// ENGINE
// ============================================================================

pub struct Engine {
    registry: ModelRegistry,
    capabilities: Capabilities,
    corpora: CorpusStore,
    model_dir: PathBuf,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            registry: ModelRegistry::new(),
            capabilities: Capabilities::probe(),
            corpora: CorpusStore::new(),
            model_dir: constants::model_dir(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Startup hook: reload the persisted classifier, if any. A corrupt or
    /// missing artifact is not fatal; the engine starts untrained.
    pub fn init(&self) {
        match load_classifier(&self.model_dir) {
            Ok(Some(artifact)) => {
                log::info!(
                    "restored classifier '{}' (dataset '{}', accuracy {:.3})",
                    artifact.model_name,
                    artifact.dataset_name,
                    artifact.metrics.accuracy
                );
                self.registry.publish_classifier(artifact);
            }
            Ok(None) => log::info!("no persisted classifier found, starting untrained"),
            Err(e) => log::warn!("failed to restore persisted classifier: {}", e),
        }
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Encode records and normalize them, either against an existing
    /// profile or a fresh one fitted on this batch.
    pub fn encode_and_normalize(
        &self,
        records: &[LogRecord],
        profile: Option<&NormalizationProfile>,
    ) -> (Array2<f32>, NormalizationProfile) {
        let encoded = features::encode(records);
        let profile = match profile {
            Some(p) => p.clone(),
            None => NormalizationProfile::fit(&encoded),
        };
        (profile.apply(&encoded), profile)
    }

    pub fn train(&self, request: &TrainRequest) -> Result<TrainReport, EngineError> {
        let backend = BackendKind::parse(&request.backend).ok_or_else(|| {
            EngineError::InputInvalid(format!("unknown backend '{}'", request.backend))
        })?;

        match backend {
            BackendKind::SequenceClassifier => {
                let report = self.train_classifier_inner(request)?;
                Ok(TrainReport::Classifier(report))
            }
            _ => {
                let records = request.records.as_deref().ok_or_else(|| {
                    EngineError::InputInvalid("numeric training requires records".to_string())
                })?;
                let report = self.train_numeric_inner(records, backend, &request.hyperparameters)?;
                Ok(TrainReport::Numeric(report))
            }
        }
    }

    fn train_numeric_inner(
        &self,
        records: &[LogRecord],
        backend: BackendKind,
        hyperparameters: &Hyperparameters,
    ) -> Result<NumericTrainReport, EngineError> {
        train::train_numeric(
            records,
            backend,
            hyperparameters,
            &self.capabilities,
            &self.registry,
        )
    }

    fn train_classifier_inner(
        &self,
        request: &TrainRequest,
    ) -> Result<ClassifierTrainReport, EngineError> {
        let dataset_name = request
            .dataset_name
            .as_deref()
            .unwrap_or(train::CUSTOM_DATASET);
        let model_name = request.model_name.as_deref().unwrap_or("hashed-bow");
        train::train_classifier(
            dataset_name,
            model_name,
            request.records.as_deref(),
            &self.corpora,
            &self.capabilities,
            &self.registry,
            &self.model_dir,
        )
    }

    pub fn train_tabular(
        &self,
        request: &TabularTrainRequest,
    ) -> Result<TabularTrainReport, EngineError> {
        let kind = TabularModelKind::parse(&request.model_type).ok_or_else(|| {
            EngineError::InputInvalid(format!(
                "unknown tabular model type '{}'",
                request.model_type
            ))
        })?;
        train::train_tabular(
            &request.csv_data,
            kind,
            &request.feature_columns,
            &request.target_column,
            &self.registry,
        )
    }

    /// Score a batch against the active detector. Succeeds with zeroed
    /// placeholder scores when nothing is trained yet.
    pub fn score(&self, records: &[LogRecord]) -> Result<ScoreReport, EngineError> {
        let artifact = self.registry.detector();
        score_records(records, artifact.as_deref())
    }

    /// Explain one record's anomaly verdict.
    pub fn attribute(&self, record: &LogRecord) -> AttributionReport {
        attribute::attribute(record, &self.capabilities)
    }

    pub fn classify(&self, request: &ClassifyRequest) -> Result<ClassifyResult, EngineError> {
        match request.backend.as_str() {
            "classifier" | "sequence-classifier" => {
                let artifact = self.registry.classifier().ok_or_else(|| {
                    EngineError::ModelNotRegistered(
                        "no sequence classifier has been trained".to_string(),
                    )
                })?;
                let (class_id, confidence) = artifact.classifier.predict(&request.text);
                let label = if class_id == CRITICAL_CLASS {
                    "CRITICAL"
                } else {
                    "NORMAL"
                };
                Ok(ClassifyResult {
                    label: label.to_string(),
                    confidence,
                    class_id,
                })
            }
            other => {
                let kind = TabularModelKind::parse(other).ok_or_else(|| {
                    EngineError::InputInvalid(format!("unknown classify backend '{}'", other))
                })?;
                let artifact = self.registry.tabular(kind.as_str()).ok_or_else(|| {
                    EngineError::ModelNotRegistered(format!(
                        "no trained {} model",
                        kind.as_str()
                    ))
                })?;
                let row = encode_input_row(&request.text, &artifact.encoders)?;
                let (class_id, confidence) = artifact.model.predict(&row);
                let label = artifact
                    .classes
                    .get(class_id)
                    .cloned()
                    .unwrap_or_else(|| class_id.to_string());
                Ok(ClassifyResult {
                    label,
                    confidence,
                    class_id,
                })
            }
        }
    }

    /// Register a parsed corpus under a name for later classifier training.
    pub fn register_corpus(&self, name: &str, records: Vec<LogRecord>) {
        self.corpora.register(name, records);
    }

    /// Parse a raw log dump and register the result as a named corpus.
    /// Returns the number of records retained.
    pub fn ingest_log_text(&self, name: &str, raw: &str, max_samples: usize) -> usize {
        let records = parse_log_lines(raw, max_samples);
        let count = records.len();
        self.corpora.register(name, records);
        count
    }

    pub fn corpus_names(&self) -> Vec<String> {
        self.corpora.names()
    }
}
