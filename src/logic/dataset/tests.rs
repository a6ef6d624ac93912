use super::*;

const RAW_SAMPLE: &str = "\
2024-03-01 10:00:01 INFO api-gateway request handled in 9ms

short line
2024-03-01 10:00:02 ERROR database connection timeout during replication
2024-03-01 10:00:03 FATAL auth token validation crashed hard
noise
2024-03-01 10:00:04 WARN user quota nearly exhausted
";

#[test]
fn test_parse_skips_blank_and_short_lines() {
    let records = parse_log_lines(RAW_SAMPLE, 100);
    assert_eq!(records.len(), 4);
}

#[test]
fn test_parse_infers_levels_from_content() {
    let records = parse_log_lines(RAW_SAMPLE, 100);
    assert_eq!(records[0].level, LogLevel::Info);
    assert_eq!(records[1].level, LogLevel::Error);
    assert_eq!(records[2].level, LogLevel::Fatal);
    assert_eq!(records[3].level, LogLevel::Warn);
}

#[test]
fn test_parse_scores_track_severity_bands() {
    let records = parse_log_lines(RAW_SAMPLE, 100);
    let score = |i: usize| records[i].anomaly_score.unwrap();
    assert!(score(0) < 0.2);
    assert!(score(1) >= 0.7 && score(1) < 0.9);
    assert!(score(2) >= 0.9 && score(2) <= 1.0);
    assert!(score(3) >= 0.3 && score(3) < 0.6);
}

#[test]
fn test_parse_error_keywords_outrank_fatal() {
    let line = "2024-03-01 10:00:06 FATAL disk error persisting journal";
    let records = parse_log_lines(line, 10);
    assert_eq!(records[0].level, LogLevel::Error);
}

#[test]
fn test_parse_respects_max_samples() {
    let records = parse_log_lines(RAW_SAMPLE, 2);
    assert_eq!(records.len(), 2);
}

#[test]
fn test_parse_truncates_long_messages() {
    let line = format!("2024-03-01 10:00:05 INFO gateway {}", "a".repeat(600));
    let records = parse_log_lines(&line, 10);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message.chars().count(), 500);
}

#[test]
fn test_parse_synthesizes_timestamps() {
    let records = parse_log_lines(RAW_SAMPLE, 100);
    assert_eq!(records[0].timestamp.as_deref(), Some("2024-01-01T00:00:00Z"));
    assert_eq!(records[1].timestamp.as_deref(), Some("2024-01-01T00:01:00Z"));
}

#[test]
fn test_parse_is_deterministic() {
    let first = parse_log_lines(RAW_SAMPLE, 100);
    let second = parse_log_lines(RAW_SAMPLE, 100);
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.anomaly_score, b.anomaly_score);
    }
}

#[test]
fn test_store_register_and_lookup() {
    let store = CorpusStore::new();
    assert!(store.get("uploads").is_none());
    store.register("uploads", parse_log_lines(RAW_SAMPLE, 100));
    assert_eq!(store.get("uploads").unwrap().len(), 4);
    assert_eq!(store.names(), vec!["uploads".to_string()]);
}

#[test]
fn test_store_unknown_dataset_rejected() {
    let store = CorpusStore::new();
    assert!(matches!(
        store.load_named("no-such-corpus"),
        Err(EngineError::InputInvalid(_))
    ));
}

#[test]
fn test_synthetic_corpus_generated_on_demand() {
    let store = CorpusStore::new();
    let records = store.load_named(SYNTHETIC_DATASET).unwrap();
    assert_eq!(records.len(), 400);
    // Cached after first load.
    assert_eq!(store.names(), vec![SYNTHETIC_DATASET.to_string()]);
    let again = store.load_named(SYNTHETIC_DATASET).unwrap();
    assert!(Arc::ptr_eq(&records, &again));
}

#[test]
fn test_synthetic_corpus_mixes_severities() {
    let records = synthetic_corpus(400);
    let severe = records.iter().filter(|r| r.level.is_severe()).count();
    assert!(severe > 20 && severe < 200);
    assert!(records.iter().all(|r| r.anomaly_score.is_some()));
}
