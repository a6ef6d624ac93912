//! Model Registry - process-wide store of active trained artifacts.
//!
//! One explicit object, passed by reference through the engine context.
//! Slots hold `Arc`-wrapped artifacts behind `parking_lot::RwLock`s:
//! training fits outside any lock, and only the final publish takes the
//! write lock, so a reader always observes either the complete previous
//! artifact or the complete new one. Slots are populated only by
//! successful training runs and are never cleared.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::constants::{AUTOENCODER_UNDERFIT_CEILING, FOREST_UNDERFIT_CEILING, OVERFIT_RATIO};
use crate::logic::error::EngineError;
use crate::logic::model::classifier::{ClassifierMetrics, TextClassifier};
use crate::logic::model::tabular::{TabularMetrics, TabularModel, TabularModelKind};
use crate::logic::model::{BackendKind, DetectorModel};
use crate::logic::normalize::NormalizationProfile;

/// File name for the persisted sequence classifier.
pub const CLASSIFIER_FILE: &str = "classifier.json";

// ============================================================================
// FIT QUALITY
// ============================================================================

/// Coarse train/validation-loss diagnostic. A heuristic, not a statistical
/// test; thresholds are part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitQuality {
    Balanced,
    Overfitting,
    Underfitting,
}

impl FitQuality {
    pub fn classify(train_loss: f32, val_loss: f32, backend: BackendKind) -> Self {
        let ceiling = match backend {
            BackendKind::Autoencoder => AUTOENCODER_UNDERFIT_CEILING,
            _ => FOREST_UNDERFIT_CEILING,
        };
        if val_loss > train_loss * OVERFIT_RATIO {
            FitQuality::Overfitting
        } else if train_loss > ceiling {
            FitQuality::Underfitting
        } else {
            FitQuality::Balanced
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FitQuality::Balanced => "Balanced",
            FitQuality::Overfitting => "Overfitting",
            FitQuality::Underfitting => "Underfitting",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub train_loss: f32,
    pub val_loss: f32,
    pub fit_quality: FitQuality,
}

// ============================================================================
// ARTIFACTS
// ============================================================================

/// A fitted numeric detector plus everything scoring needs: the
/// normalization profile captured at fit time and the training metrics.
/// Immutable after creation; superseded, never mutated.
#[derive(Debug, Clone)]
pub struct DetectorArtifact {
    pub id: String,
    pub backend: BackendKind,
    pub model: DetectorModel,
    pub profile: NormalizationProfile,
    pub metrics: TrainingMetrics,
    pub samples: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl DetectorArtifact {
    pub fn new(
        model: DetectorModel,
        profile: NormalizationProfile,
        metrics: TrainingMetrics,
        samples: usize,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            backend: model.kind(),
            model,
            profile,
            metrics,
            samples,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Active sequence classifier. JSON-persistable for startup preload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub id: String,
    pub model_name: String,
    pub dataset_name: String,
    pub classifier: TextClassifier,
    pub metrics: ClassifierMetrics,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ClassifierArtifact {
    pub fn new(
        model_name: &str,
        dataset_name: &str,
        classifier: TextClassifier,
        metrics: ClassifierMetrics,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            model_name: model_name.to_string(),
            dataset_name: dataset_name.to_string(),
            classifier,
            metrics,
            created_at: chrono::Utc::now(),
        }
    }
}

/// One named tabular classifier; several subtypes can be active at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularArtifact {
    pub id: String,
    pub kind: TabularModelKind,
    pub model: TabularModel,
    pub feature_columns: Vec<String>,
    pub target_column: String,
    pub encoders: Vec<Option<Vec<String>>>,
    pub classes: Vec<String>,
    pub metrics: TabularMetrics,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Debug, Default)]
pub struct ModelRegistry {
    detector: RwLock<Option<Arc<DetectorArtifact>>>,
    classifier: RwLock<Option<Arc<ClassifierArtifact>>>,
    tabular: RwLock<HashMap<String, Arc<TabularArtifact>>>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detector(&self) -> Option<Arc<DetectorArtifact>> {
        self.detector.read().clone()
    }

    /// Unconditional overwrite; last writer wins.
    pub fn publish_detector(&self, artifact: DetectorArtifact) {
        *self.detector.write() = Some(Arc::new(artifact));
    }

    pub fn classifier(&self) -> Option<Arc<ClassifierArtifact>> {
        self.classifier.read().clone()
    }

    pub fn publish_classifier(&self, artifact: ClassifierArtifact) {
        *self.classifier.write() = Some(Arc::new(artifact));
    }

    pub fn tabular(&self, name: &str) -> Option<Arc<TabularArtifact>> {
        self.tabular.read().get(name).cloned()
    }

    pub fn publish_tabular(&self, name: &str, artifact: TabularArtifact) {
        self.tabular.write().insert(name.to_string(), Arc::new(artifact));
    }

    pub fn tabular_names(&self) -> Vec<String> {
        self.tabular.read().keys().cloned().collect()
    }
}

// ============================================================================
// CLASSIFIER PERSISTENCE
// ============================================================================

pub fn save_classifier(dir: &Path, artifact: &ClassifierArtifact) -> Result<PathBuf, EngineError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(CLASSIFIER_FILE);
    let json = serde_json::to_string(artifact)?;
    std::fs::write(&path, json)?;
    Ok(path)
}

/// `Ok(None)` when no artifact has been persisted yet.
pub fn load_classifier(dir: &Path) -> Result<Option<ClassifierArtifact>, EngineError> {
    let path = dir.join(CLASSIFIER_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::model::classifier::TextClassifier;

    #[test]
    fn test_fit_quality_thresholds() {
        // 0.35 > 1.5 * 0.2 -> Overfitting.
        assert_eq!(
            FitQuality::classify(0.2, 0.35, BackendKind::Autoencoder),
            FitQuality::Overfitting
        );
        // Exactly at the boundary is not overfitting (0.375 = 0.25 * 1.5,
        // both exact in binary); the underfit ceiling still applies.
        assert_eq!(
            FitQuality::classify(0.25, 0.375, BackendKind::Autoencoder),
            FitQuality::Underfitting
        );
        assert_eq!(
            FitQuality::classify(0.05, 0.06, BackendKind::Autoencoder),
            FitQuality::Balanced
        );
        // Forest ceiling is looser.
        assert_eq!(
            FitQuality::classify(0.4, 0.45, BackendKind::IsolationForest),
            FitQuality::Balanced
        );
        assert_eq!(
            FitQuality::classify(0.6, 0.65, BackendKind::IsolationForest),
            FitQuality::Underfitting
        );
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = ModelRegistry::new();
        assert!(registry.detector().is_none());
        assert!(registry.classifier().is_none());
        assert!(registry.tabular("random_forest").is_none());
        assert!(registry.tabular_names().is_empty());
    }

    #[test]
    fn test_last_writer_wins() {
        let registry = ModelRegistry::new();
        let classifier = TextClassifier::fit(&[("ok".to_string(), 0)], 1, 1, 0.1).unwrap();
        let metrics = classifier.evaluate(&[("ok".to_string(), 0)]);

        let first = ClassifierArtifact::new("m1", "d1", classifier.clone(), metrics.clone());
        let first_id = first.id.clone();
        registry.publish_classifier(first);

        let second = ClassifierArtifact::new("m2", "d2", classifier, metrics);
        let second_id = second.id.clone();
        registry.publish_classifier(second);

        let active = registry.classifier().unwrap();
        assert_eq!(active.id, second_id);
        assert_ne!(active.id, first_id);
    }

    #[test]
    fn test_classifier_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_classifier(dir.path()).unwrap().is_none());

        let classifier =
            TextClassifier::fit(&[("timeout failure".to_string(), 1)], 1, 1, 0.5).unwrap();
        let metrics = classifier.evaluate(&[("timeout failure".to_string(), 1)]);
        let artifact = ClassifierArtifact::new("hashed-bow", "custom", classifier, metrics);

        save_classifier(dir.path(), &artifact).unwrap();
        let restored = load_classifier(dir.path()).unwrap().unwrap();
        assert_eq!(restored.id, artifact.id);
        assert_eq!(restored.model_name, "hashed-bow");
    }
}
