use serde::{Deserialize, Serialize};

/// Names of the attribution feature space, in column order.
pub const ATTRIBUTION_FEATURES: [&str; 5] = [
    "Log Level",
    "Source Service",
    "Message Length",
    "Has Error Keywords",
    "Has DB Keywords",
];

/// Whether a feature pushed the record toward or away from anomalous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Increases,
    Decreases,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Increases => "increases",
            Direction::Decreases => "decreases",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f32,
    /// Share of total absolute importance, 0..=100.
    pub percentage: f32,
    pub direction: Direction,
    /// The record's encoded value for this feature.
    pub actual_value: f32,
}

/// Explanation for one record's anomaly score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributionReport {
    pub feature_importances: Vec<FeatureImportance>,
    pub primary_cause: String,
    /// Human-readable notes, one per contributing factor.
    pub details: Vec<String>,
    pub anomaly_score: f32,
    pub confidence: f32,
    /// Which attribution path produced this report.
    pub method: String,
}
