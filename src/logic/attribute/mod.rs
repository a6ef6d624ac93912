//! Attribution engine - explains why a record scored anomalous.
//!
//! Two paths with one output shape. The statistical path fits an isolation
//! forest over a seeded synthetic background and measures each feature's
//! effect by substituting the background mean (a single-feature ablation
//! under the forest's decision function). When the explainer capability is
//! off, or the statistical path fails, the rule-based fallback fires a
//! fixed ordered rule list instead. Callers always get a report; only the
//! `method` tag reveals which path produced it.

pub mod types;

pub use types::{AttributionReport, Direction, FeatureImportance, ATTRIBUTION_FEATURES};

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::{DB_KEYWORDS, ERROR_KEYWORDS, LONG_MESSAGE_CHARS};
use crate::logic::error::EngineError;
use crate::logic::features::source_ordinal;
use crate::logic::model::forest::IsolationForest;
use crate::logic::model::Capabilities;
use crate::logic::record::LogRecord;

/// Rows in the synthetic background population.
const BACKGROUND_ROWS: usize = 200;

/// Background generation and forest fitting are fully seeded so the same
/// record always receives the same explanation.
const BACKGROUND_SEED: u64 = 42;

const BACKGROUND_TREES: usize = 50;

pub const METHOD_STATISTICAL: &str = "forest-substitution";
pub const METHOD_FALLBACK: &str = "rule-based-fallback";

// ============================================================================
// ATTRIBUTION FEATURE SPACE
// ============================================================================

fn matched_error_keyword(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    ERROR_KEYWORDS.iter().find(|kw| lower.contains(*kw)).copied()
}

fn matched_db_keyword(message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    DB_KEYWORDS.iter().find(|kw| lower.contains(*kw)).copied()
}

/// Encode a record into the 5-dimensional attribution space. Wider than the
/// detector's feature row: keyword indicators only matter for explanation.
pub fn encode_attribution_row(record: &LogRecord) -> [f32; 5] {
    [
        record.level.ordinal(),
        source_ordinal(&record.source),
        record.message.len() as f32,
        if matched_error_keyword(&record.message).is_some() { 1.0 } else { 0.0 },
        if matched_db_keyword(&record.message).is_some() { 1.0 } else { 0.0 },
    ]
}

fn sample_normal(rng: &mut StdRng, mean: f32, std_dev: f32) -> f32 {
    // Box-Muller transform over two uniforms.
    let u1: f32 = rng.gen_range(f32::EPSILON..1.0);
    let u2: f32 = rng.gen::<f32>();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos();
    mean + std_dev * z
}

/// Synthetic population of plausible log feature rows. Level skews INFO,
/// message lengths are normal around 40 chars, keyword indicators fire at
/// their rough observed base rates.
fn background_population(rng: &mut StdRng) -> Array2<f32> {
    const LEVEL_POOL: [f32; 5] = [0.0, 1.0, 1.0, 1.0, 2.0];
    const ERROR_KW_POOL: [f32; 5] = [0.0, 0.0, 0.0, 0.0, 1.0];
    const DB_KW_POOL: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

    let mut data = Vec::with_capacity(BACKGROUND_ROWS * 5);
    for _ in 0..BACKGROUND_ROWS {
        data.push(LEVEL_POOL[rng.gen_range(0..LEVEL_POOL.len())]);
        data.push(rng.gen_range(0..5) as f32);
        data.push(sample_normal(rng, 40.0, 15.0).clamp(5.0, 200.0));
        data.push(ERROR_KW_POOL[rng.gen_range(0..ERROR_KW_POOL.len())]);
        data.push(DB_KW_POOL[rng.gen_range(0..DB_KW_POOL.len())]);
    }
    Array2::from_shape_vec((BACKGROUND_ROWS, 5), data)
        .unwrap_or_else(|_| Array2::zeros((0, 5)))
}

// ============================================================================
// STATISTICAL PATH
// ============================================================================

/// Render an encoded feature value the way a person reads it.
fn describe_value(feature: usize, value: f32) -> String {
    match feature {
        0 => match value as u32 {
            0 => "DEBUG".to_string(),
            1 => "INFO".to_string(),
            2 => "WARN".to_string(),
            3 => "ERROR".to_string(),
            _ => "FATAL".to_string(),
        },
        1 => crate::logic::features::source_vocabulary()
            .get(value as usize)
            .copied()
            .unwrap_or("unknown")
            .to_string(),
        2 => format!("{} chars", value as u32),
        3 | 4 => if value > 0.0 { "yes" } else { "no" }.to_string(),
        _ => format!("{}", value),
    }
}

fn statistical_attribution(record: &LogRecord) -> Result<AttributionReport, EngineError> {
    let mut rng = StdRng::seed_from_u64(BACKGROUND_SEED);
    let background = background_population(&mut rng);
    let forest = IsolationForest::fit(&background, BACKGROUND_TREES, BACKGROUND_SEED)?;

    let column_means: Vec<f32> = (0..5)
        .map(|col| {
            background.column(col).mean().unwrap_or(0.0)
        })
        .collect();

    let row = Array1::from_iter(encode_attribution_row(record));
    let base = forest.decision_function_row(row.view());

    // Ablate one feature at a time toward the background mean. A negative
    // delta means the actual value pulled the decision function down, i.e.
    // pushed the record toward anomalous.
    let mut importances = Vec::with_capacity(5);
    for (i, name) in ATTRIBUTION_FEATURES.iter().enumerate() {
        let mut ablated = row.clone();
        ablated[i] = column_means[i];
        let delta = base - forest.decision_function_row(ablated.view());
        importances.push((name.to_string(), delta));
    }

    let total_abs: f32 = importances.iter().map(|(_, v)| v.abs()).sum();
    let mut ranked: Vec<(usize, FeatureImportance)> = importances
        .iter()
        .enumerate()
        .map(|(i, (name, value))| {
            let entry = FeatureImportance {
                feature: name.clone(),
                importance: *value,
                percentage: if total_abs > 0.0 {
                    value.abs() / total_abs * 100.0
                } else {
                    0.0
                },
                direction: if *value < 0.0 {
                    Direction::Increases
                } else {
                    Direction::Decreases
                },
                actual_value: row[i],
            };
            (i, entry)
        })
        .collect();
    // Ranked by impact; the top entry names the primary cause.
    ranked.sort_by(|(_, a), (_, b)| {
        b.importance
            .abs()
            .partial_cmp(&a.importance.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let primary_cause = ranked
        .first()
        .map(|(i, f)| format!("{} ({})", f.feature, describe_value(*i, f.actual_value)))
        .unwrap_or_else(|| "Unexpected Pattern".to_string());
    let feature_importances: Vec<FeatureImportance> =
        ranked.into_iter().map(|(_, f)| f).collect();
    let details = feature_importances
        .iter()
        .map(|f| {
            format!(
                "{} {} the anomaly score ({:.1}%)",
                f.feature,
                f.direction.as_str(),
                f.percentage
            )
        })
        .collect();

    let anomaly_score = forest.anomaly_score_row(row.view());

    Ok(AttributionReport {
        feature_importances,
        primary_cause,
        details,
        anomaly_score,
        confidence: anomaly_score.clamp(0.0, 1.0),
        method: METHOD_STATISTICAL.to_string(),
    })
}

// ============================================================================
// RULE-BASED FALLBACK
// ============================================================================

fn rule_attribution(record: &LogRecord) -> AttributionReport {
    // Fixed rule order doubles as a priority order: the first fired rule
    // names the primary cause.
    let mut fired: Vec<(usize, f32, f32, String)> = Vec::new();

    if record.level.is_severe() {
        fired.push((
            0,
            0.4,
            record.level.ordinal(),
            format!(
                "Level is {} (severity {}/4)",
                record.level.as_str(),
                record.level.ordinal() as u32
            ),
        ));
    }
    if let Some(kw) = matched_error_keyword(&record.message) {
        fired.push((3, 0.3, 1.0, format!("Message contains '{}'", kw)));
    }
    if record.message.len() > LONG_MESSAGE_CHARS {
        fired.push((
            2,
            0.2,
            record.message.len() as f32,
            format!("Message is {} characters long", record.message.len()),
        ));
    }
    if let Some(kw) = matched_db_keyword(&record.message) {
        fired.push((4, 0.1, 1.0, format!("Mentions database term '{}'", kw)));
    }

    if fired.is_empty() {
        return AttributionReport {
            feature_importances: vec![FeatureImportance {
                feature: "Unexpected Pattern".to_string(),
                importance: 0.5,
                percentage: 100.0,
                direction: Direction::Increases,
                actual_value: 0.0,
            }],
            primary_cause: "Unexpected Pattern".to_string(),
            details: vec!["No known risk factor matched this record".to_string()],
            anomaly_score: 0.5,
            confidence: 0.5,
            method: METHOD_FALLBACK.to_string(),
        };
    }

    let total: f32 = fired.iter().map(|(_, w, _, _)| w).sum();
    let feature_importances = fired
        .iter()
        .map(|(idx, weight, actual, _)| FeatureImportance {
            feature: ATTRIBUTION_FEATURES[*idx].to_string(),
            importance: *weight,
            percentage: weight / total * 100.0,
            direction: Direction::Increases,
            actual_value: *actual,
        })
        .collect();
    let details = fired.iter().map(|(_, _, _, d)| d.clone()).collect();
    let confidence = total.min(1.0);
    let (idx, _, actual, _) = &fired[0];
    let primary_cause = format!(
        "{} ({})",
        ATTRIBUTION_FEATURES[*idx],
        describe_value(*idx, *actual)
    );

    AttributionReport {
        feature_importances,
        primary_cause,
        details,
        anomaly_score: confidence,
        confidence,
        method: METHOD_FALLBACK.to_string(),
    }
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Explain one record. Never fails: a statistical-path error downgrades to
/// the rule-based fallback with a warning.
pub fn attribute(record: &LogRecord, capabilities: &Capabilities) -> AttributionReport {
    if capabilities.explainer {
        match statistical_attribution(record) {
            Ok(report) => return report,
            Err(e) => {
                log::warn!("statistical attribution failed, using rules: {}", e);
            }
        }
    }
    rule_attribution(record)
}

#[cfg(test)]
mod tests;
