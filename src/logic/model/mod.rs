//! Model backends and backend selection.
//!
//! Backend availability is a capability probe, not an exception path:
//! absence of the preferred reconstruction runtime is an expected branch
//! that falls back to the isolation forest.

pub mod autoencoder;
pub mod classifier;
pub mod forest;
pub mod tabular;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use autoencoder::Autoencoder;
use forest::IsolationForest;

/// Requestable backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    Autoencoder,
    IsolationForest,
    SequenceClassifier,
}

impl BackendKind {
    /// Parse a request string; `None` for unknown backends.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autoencoder" | "reconstruction" => Some(BackendKind::Autoencoder),
            "isolation-forest" | "isolation_forest" => Some(BackendKind::IsolationForest),
            "classifier" | "sequence-classifier" => Some(BackendKind::SequenceClassifier),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Autoencoder => "autoencoder",
            BackendKind::IsolationForest => "isolation-forest",
            BackendKind::SequenceClassifier => "classifier",
        }
    }

    /// Human-readable tag reported alongside scores and train reports.
    pub fn framework_label(self) -> &'static str {
        match self {
            BackendKind::Autoencoder => "autoencoder-v1",
            BackendKind::IsolationForest => "isolation-forest-v1",
            BackendKind::SequenceClassifier => "sequence-classifier-v1",
        }
    }
}

/// Runtime availability of the optional backends.
///
/// Probed once at engine construction. Everything defaults to available;
/// embedders (and tests) can switch a capability off to exercise the
/// fallback branches.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub autoencoder: bool,
    pub classifier: bool,
    pub explainer: bool,
}

impl Capabilities {
    pub fn probe() -> Self {
        Self {
            autoencoder: true,
            classifier: true,
            explainer: true,
        }
    }

    pub fn without_autoencoder(mut self) -> Self {
        self.autoencoder = false;
        self
    }

    pub fn without_classifier(mut self) -> Self {
        self.classifier = false;
        self
    }

    pub fn without_explainer(mut self) -> Self {
        self.explainer = false;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::probe()
    }
}

/// Resolve the numeric backend that will actually be fit.
///
/// Never fails: an unavailable reconstruction runtime degrades to the
/// isolation forest.
pub fn select_numeric_backend(requested: BackendKind, caps: &Capabilities) -> BackendKind {
    match requested {
        BackendKind::Autoencoder if caps.autoencoder => BackendKind::Autoencoder,
        BackendKind::Autoencoder => {
            log::warn!("reconstruction runtime unavailable, falling back to isolation forest");
            BackendKind::IsolationForest
        }
        other => other,
    }
}

/// A fitted numeric detector, tagged by backend.
#[derive(Debug, Clone)]
pub enum DetectorModel {
    Autoencoder(Autoencoder),
    Forest(IsolationForest),
}

impl DetectorModel {
    pub fn kind(&self) -> BackendKind {
        match self {
            DetectorModel::Autoencoder(_) => BackendKind::Autoencoder,
            DetectorModel::Forest(_) => BackendKind::IsolationForest,
        }
    }

    /// Per-record anomaly score over normalized rows.
    ///
    /// Autoencoder: mean squared reconstruction error per row. Forest: the
    /// isolation anomaly score, the equivalent negative outlier score.
    pub fn record_scores(&self, x: &Array2<f32>) -> Array1<f32> {
        match self {
            DetectorModel::Autoencoder(model) => model.reconstruction_errors(x),
            DetectorModel::Forest(model) => model.anomaly_scores(x),
        }
    }

    /// Mean loss over a split, for train/validation metrics.
    pub fn mean_loss(&self, x: &Array2<f32>) -> f32 {
        if x.nrows() == 0 {
            return 0.0;
        }
        self.record_scores(x).mean().unwrap_or(0.0)
    }
}
