//! Training orchestrator - the single entry point for all training runs.
//!
//! Each run is: resolve backend against capabilities, prepare data, ordered
//! 80/20 split, fit, compute train/validation metrics, then publish into
//! the registry. Publication is the last step; any failure before it leaves
//! the previously active model untouched.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::constants::{
    CLASSIFIER_BATCH_SIZE, CLASSIFIER_EPOCHS, DEFAULT_BATCH_SIZE, DEFAULT_DROPOUT, DEFAULT_EPOCHS,
};
use crate::logic::dataset::CorpusStore;
use crate::logic::error::EngineError;
use crate::logic::features;
use crate::logic::model::autoencoder::{Autoencoder, TrainOptions};
use crate::logic::model::classifier::TextClassifier;
use crate::logic::model::forest::{IsolationForest, DEFAULT_TREES};
use crate::logic::model::tabular::{parse_csv_dataset, TabularModel, TabularModelKind, TabularMetrics};
use crate::logic::model::{select_numeric_backend, BackendKind, Capabilities, DetectorModel};
use crate::logic::normalize::NormalizationProfile;
use crate::logic::record::{LogLevel, LogRecord};
use crate::logic::registry::{
    save_classifier, ClassifierArtifact, DetectorArtifact, FitQuality, ModelRegistry,
    TabularArtifact, TrainingMetrics,
};

/// Fits are seeded so a rerun over the same corpus reproduces the model.
const TRAIN_SEED: u64 = 42;

const CLASSIFIER_LEARNING_RATE: f32 = 0.5;

/// Dataset name that means "use the records in the request body".
pub const CUSTOM_DATASET: &str = "custom";

/// Records with a precomputed score above this are labeled anomalous when
/// deriving classifier labels from a cached corpus.
const LABEL_SCORE_CUTOFF: f32 = 0.5;

// ============================================================================
// REQUEST / REPORT TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub epochs: usize,
    pub batch_size: usize,
    pub dropout: f32,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            epochs: DEFAULT_EPOCHS,
            batch_size: DEFAULT_BATCH_SIZE,
            dropout: DEFAULT_DROPOUT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericTrainReport {
    pub backend_used: String,
    pub samples: usize,
    pub train_loss: f32,
    pub val_loss: f32,
    pub fit_quality: FitQuality,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierTrainReport {
    pub model_name: String,
    pub dataset_name: String,
    pub samples: usize,
    pub accuracy: f32,
    pub loss: f32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularTrainReport {
    pub model_type: String,
    pub target_column: String,
    pub classes: Vec<String>,
    pub metrics: TabularMetrics,
    pub message: String,
}

/// Union of the per-path reports, for callers that dispatch on backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrainReport {
    Numeric(NumericTrainReport),
    Classifier(ClassifierTrainReport),
    Tabular(TabularTrainReport),
}

// ============================================================================
// SPLITTING
// ============================================================================

/// Ordered 80/20 split. No shuffling: callers that want temporal holdout
/// submit records in time order. Small inputs degenerate to train-only.
fn split_index(n: usize) -> usize {
    let idx = n * 4 / 5;
    if idx == 0 {
        n
    } else {
        idx
    }
}

// ============================================================================
// NUMERIC DETECTORS
// ============================================================================

pub fn train_numeric(
    records: &[LogRecord],
    requested: BackendKind,
    hyperparameters: &Hyperparameters,
    capabilities: &Capabilities,
    registry: &ModelRegistry,
) -> Result<NumericTrainReport, EngineError> {
    if records.is_empty() {
        return Err(EngineError::InputInvalid(
            "training requires at least one record".to_string(),
        ));
    }

    let backend = select_numeric_backend(requested, capabilities);
    let encoded = features::encode(records);
    let profile = NormalizationProfile::fit(&encoded);
    let normalized = profile.apply(&encoded);

    let split = split_index(records.len());
    let train = normalized.slice(ndarray::s![..split, ..]).to_owned();
    let val = normalized.slice(ndarray::s![split.., ..]).to_owned();

    log::info!(
        "training {} on {} records ({} train / {} validation)",
        backend.as_str(),
        records.len(),
        train.nrows(),
        val.nrows()
    );

    let model = match backend {
        BackendKind::Autoencoder => {
            let opts = TrainOptions {
                epochs: hyperparameters.epochs,
                batch_size: hyperparameters.batch_size,
                dropout: hyperparameters.dropout,
                seed: TRAIN_SEED,
                ..TrainOptions::default()
            };
            DetectorModel::Autoencoder(Autoencoder::fit(&train, &opts)?)
        }
        BackendKind::IsolationForest => {
            DetectorModel::Forest(IsolationForest::fit(&train, DEFAULT_TREES, TRAIN_SEED)?)
        }
        BackendKind::SequenceClassifier => {
            return Err(EngineError::InputInvalid(
                "sequence classifier is not a numeric detector backend".to_string(),
            ));
        }
    };

    let train_loss = model.mean_loss(&train);
    // With no holdout the validation loss mirrors the training loss, which
    // makes the overfit check vacuous rather than spuriously triggered.
    let val_loss = if val.nrows() == 0 {
        train_loss
    } else {
        model.mean_loss(&val)
    };
    let fit_quality = FitQuality::classify(train_loss, val_loss, backend);

    let metrics = TrainingMetrics {
        train_loss,
        val_loss,
        fit_quality,
    };
    let artifact = DetectorArtifact::new(model, profile, metrics, records.len());
    let backend_used = artifact.backend.framework_label().to_string();
    registry.publish_detector(artifact);

    log::info!(
        "published {} detector: train_loss={:.4} val_loss={:.4} quality={}",
        backend_used,
        train_loss,
        val_loss,
        fit_quality.as_str()
    );

    Ok(NumericTrainReport {
        backend_used,
        samples: records.len(),
        train_loss,
        val_loss,
        fit_quality,
        message: format!("Model trained successfully on {} samples", records.len()),
    })
}

// ============================================================================
// SEQUENCE CLASSIFIER
// ============================================================================

/// Derive (text, label) pairs from a corpus. Uploaded records are labeled by
/// severity alone; cached corpora additionally treat a precomputed anomaly
/// score above the cutoff, or a WARN level, as anomalous.
fn labeled_samples(records: &[LogRecord], use_scores: bool) -> Vec<(String, u8)> {
    records
        .iter()
        .map(|r| {
            let scored = use_scores
                && (r.anomaly_score.map(|s| s > LABEL_SCORE_CUTOFF).unwrap_or(false)
                    || r.level == LogLevel::Warn);
            let label = if scored || r.level.is_severe() { 1 } else { 0 };
            (r.message.clone(), label)
        })
        .collect()
}

pub fn train_classifier(
    dataset_name: &str,
    model_name: &str,
    records: Option<&[LogRecord]>,
    corpora: &CorpusStore,
    capabilities: &Capabilities,
    registry: &ModelRegistry,
    model_dir: &Path,
) -> Result<ClassifierTrainReport, EngineError> {
    if !capabilities.classifier {
        return Err(EngineError::BackendUnavailable(
            "sequence classifier backend is disabled".to_string(),
        ));
    }

    let samples: Vec<(String, u8)> = if dataset_name == CUSTOM_DATASET {
        let records = records.ok_or_else(|| {
            EngineError::InputInvalid("custom dataset requires records in the request".to_string())
        })?;
        if records.is_empty() {
            return Err(EngineError::InputInvalid(
                "custom dataset contains no records".to_string(),
            ));
        }
        labeled_samples(records, false)
    } else {
        let corpus = corpora.load_named(dataset_name)?;
        labeled_samples(&corpus, true)
    };

    let split = split_index(samples.len());
    let (train, val) = samples.split_at(split);

    log::info!(
        "fine-tuning classifier '{}' on dataset '{}' ({} train / {} validation)",
        model_name,
        dataset_name,
        train.len(),
        val.len()
    );

    let classifier = TextClassifier::fit(
        train,
        CLASSIFIER_EPOCHS,
        CLASSIFIER_BATCH_SIZE,
        CLASSIFIER_LEARNING_RATE,
    )?;
    let metrics = classifier.evaluate(if val.is_empty() { train } else { val });

    let artifact = ClassifierArtifact::new(model_name, dataset_name, classifier, metrics.clone());
    // Persist before publishing so a restart never resurrects a model that
    // was active but never saved.
    save_classifier(model_dir, &artifact)?;
    registry.publish_classifier(artifact);

    Ok(ClassifierTrainReport {
        model_name: model_name.to_string(),
        dataset_name: dataset_name.to_string(),
        samples: samples.len(),
        accuracy: metrics.accuracy,
        loss: metrics.loss,
        message: format!(
            "Classifier trained on {} samples (accuracy {:.3})",
            samples.len(),
            metrics.accuracy
        ),
    })
}

// ============================================================================
// TABULAR CLASSIFIERS
// ============================================================================

pub fn train_tabular(
    csv: &str,
    kind: TabularModelKind,
    feature_columns: &[String],
    target_column: &str,
    registry: &ModelRegistry,
) -> Result<TabularTrainReport, EngineError> {
    let dataset = parse_csv_dataset(csv, feature_columns, target_column)?;
    let n = dataset.features.nrows();
    let split = split_index(n);

    let train_x = dataset.features.slice(ndarray::s![..split, ..]).to_owned();
    let train_y = &dataset.labels[..split];
    let test_x = dataset.features.slice(ndarray::s![split.., ..]).to_owned();
    let test_y = &dataset.labels[split..];

    let n_classes = dataset.classes.len();
    let model = TabularModel::fit(kind, &train_x, train_y, n_classes, TRAIN_SEED)?;

    let (eval_x, eval_y) = if test_y.is_empty() {
        (&train_x, train_y)
    } else {
        (&test_x, test_y)
    };
    let (accuracy, precision, recall, f1_score) = model.evaluate(eval_x, eval_y, n_classes);

    let metrics = TabularMetrics {
        accuracy,
        precision,
        recall,
        f1_score,
        train_samples: train_y.len(),
        test_samples: test_y.len(),
    };

    let artifact = TabularArtifact {
        id: uuid::Uuid::new_v4().to_string(),
        kind,
        model,
        feature_columns: feature_columns.to_vec(),
        target_column: target_column.to_string(),
        encoders: dataset.encoders,
        classes: dataset.classes.clone(),
        metrics: metrics.clone(),
        created_at: chrono::Utc::now(),
    };
    registry.publish_tabular(kind.as_str(), artifact);

    log::info!(
        "published tabular {} model: accuracy={:.3} over {} classes",
        kind.as_str(),
        accuracy,
        n_classes
    );

    Ok(TabularTrainReport {
        model_type: kind.as_str().to_string(),
        target_column: target_column.to_string(),
        classes: dataset.classes,
        metrics,
        message: format!("Tabular model trained on {} rows", n),
    })
}

#[cfg(test)]
mod tests;
