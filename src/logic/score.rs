//! Scoring engine - batch anomaly scoring against the active detector.

use serde::{Deserialize, Serialize};

use crate::constants::HIGH_RISK_THRESHOLD;
use crate::logic::error::EngineError;
use crate::logic::features;
use crate::logic::record::LogRecord;
use crate::logic::registry::DetectorArtifact;

/// Batch scoring summary. `individual_scores[i]` corresponds to the i-th
/// input record; ordering is preserved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreReport {
    pub individual_scores: Vec<f32>,
    pub mean_score: f32,
    pub high_risk_count: usize,
    pub total_processed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Score a batch of records. With no active detector the call still
/// succeeds: every score is 0.0 and the report carries an explanatory
/// message, so callers need no trained-state branching.
pub fn score_records(
    records: &[LogRecord],
    artifact: Option<&DetectorArtifact>,
) -> Result<ScoreReport, EngineError> {
    let artifact = match artifact {
        Some(a) => a,
        None => {
            return Ok(ScoreReport {
                individual_scores: vec![0.0; records.len()],
                mean_score: 0.0,
                high_risk_count: 0,
                total_processed: records.len(),
                model: None,
                message: Some("Model not trained".to_string()),
            });
        }
    };

    // An artifact fit against a different feature layout cannot score
    // current encodings; surface it as an unusable slot.
    if let Err(e) =
        features::validate_layout(artifact.profile.feature_version, artifact.profile.layout_hash)
    {
        return Err(EngineError::ModelNotRegistered(e.to_string()));
    }

    let encoded = features::encode(records);
    let normalized = artifact.profile.apply(&encoded);
    let scores = artifact.model.record_scores(&normalized).to_vec();

    let mean_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f32>() / scores.len() as f32
    };
    let high_risk_count = scores.iter().filter(|&&s| s > HIGH_RISK_THRESHOLD).count();

    log::debug!(
        "scored {} records with {}: mean={:.4} high_risk={}",
        records.len(),
        artifact.backend.as_str(),
        mean_score,
        high_risk_count
    );

    Ok(ScoreReport {
        individual_scores: scores,
        mean_score,
        high_risk_count,
        total_processed: records.len(),
        model: Some(artifact.backend.framework_label().to_string()),
        message: None,
    })
}
