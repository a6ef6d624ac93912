use super::*;
use crate::logic::record::{LogLevel, LogRecord};

#[test]
fn test_encoding_is_deterministic() {
    let record = LogRecord::new(LogLevel::Error, "auth-service", "login denied");
    assert_eq!(encode_record(&record), encode_record(&record));
    assert_eq!(encode_record(&record), [3.0, 4.0, 12.0]);
}

#[test]
fn test_unknown_categoricals_use_defaults() {
    let record = LogRecord::new(LogLevel::Info, "unheard-of-service", "ok");
    let features = encode_record(&record);
    assert_eq!(features[0], 1.0); // INFO ordinal
    assert_eq!(features[1], 0.0); // unknown source
}

#[test]
fn test_batch_preserves_order() {
    let records = vec![
        LogRecord::new(LogLevel::Debug, "api-gateway", "a"),
        LogRecord::new(LogLevel::Fatal, "db-replicator", "bbb"),
    ];
    let x = encode(&records);
    assert_eq!(x.nrows(), 2);
    assert_eq!(x.ncols(), FEATURE_COUNT);
    assert_eq!(x.row(0).to_vec(), vec![0.0, 0.0, 1.0]);
    assert_eq!(x.row(1).to_vec(), vec![4.0, 2.0, 3.0]);
}

#[test]
fn test_empty_batch() {
    let x = encode(&[]);
    assert_eq!(x.nrows(), 0);
    assert_eq!(x.ncols(), FEATURE_COUNT);
}

#[test]
fn test_layout_validation() {
    assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());

    let result = validate_layout(FEATURE_VERSION + 1, layout_hash());
    match result {
        Err(e) => {
            assert_eq!(e.expected_version, FEATURE_VERSION);
            assert_eq!(e.actual_version, FEATURE_VERSION + 1);
        }
        Ok(_) => panic!("expected layout mismatch"),
    }

    assert!(validate_layout(FEATURE_VERSION, !layout_hash()).is_err());
}

#[test]
fn test_feature_names() {
    assert_eq!(feature_name(0), Some("level"));
    assert_eq!(feature_name(FEATURE_COUNT), None);
}
