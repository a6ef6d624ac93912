//! Feature Encoder - log records to fixed-size numeric vectors.
//!
//! Pure and total: the same record always yields the same vector, and
//! unknown categorical values map to defined defaults instead of erroring.

pub mod layout;
#[cfg(test)]
mod tests;

pub use layout::{
    feature_name, layout_hash, validate_layout, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION,
    LayoutMismatchError,
};

use ndarray::Array2;
use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::logic::record::LogRecord;

/// Closed source vocabulary. Unknown sources take ordinal 0.
static SOURCE_VOCAB: Lazy<HashMap<&'static str, f32>> = Lazy::new(|| {
    HashMap::from([
        ("api-gateway", 0.0),
        ("user-service", 1.0),
        ("db-replicator", 2.0),
        ("frontend-logger", 3.0),
        ("auth-service", 4.0),
    ])
});

pub fn source_ordinal(source: &str) -> f32 {
    SOURCE_VOCAB.get(source).copied().unwrap_or(0.0)
}

/// Known source names, in ordinal order.
pub fn source_vocabulary() -> Vec<&'static str> {
    let mut names: Vec<_> = SOURCE_VOCAB.iter().collect();
    names.sort_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal));
    names.into_iter().map(|(name, _)| *name).collect()
}

/// Encode one record into its feature row.
pub fn encode_record(record: &LogRecord) -> [f32; FEATURE_COUNT] {
    [
        record.level.ordinal(),
        source_ordinal(&record.source),
        record.message.len() as f32,
    ]
}

/// Encode a batch of records, one row per record, preserving order.
pub fn encode(records: &[LogRecord]) -> Array2<f32> {
    let mut data = Vec::with_capacity(records.len() * FEATURE_COUNT);
    for record in records {
        data.extend_from_slice(&encode_record(record));
    }
    // Shape is consistent by construction; from_shape_vec cannot fail here.
    Array2::from_shape_vec((records.len(), FEATURE_COUNT), data)
        .unwrap_or_else(|_| Array2::zeros((0, FEATURE_COUNT)))
}
