use super::*;
use crate::logic::record::{LogLevel, LogRecord};

fn fatal_timeout() -> LogRecord {
    LogRecord::new(LogLevel::Fatal, "db-replicator", "replication timeout on primary")
}

#[test]
fn test_attribution_row_encoding() {
    let row = encode_attribution_row(&fatal_timeout());
    assert_eq!(row[0], 4.0); // FATAL
    assert_eq!(row[1], 2.0); // db-replicator
    assert_eq!(row[2], 30.0);
    assert_eq!(row[3], 1.0); // "timeout"
    assert_eq!(row[4], 1.0); // "replicat"
}

#[test]
fn test_values_render_human_readable() {
    assert_eq!(describe_value(0, 4.0), "FATAL");
    assert_eq!(describe_value(1, 2.0), "db-replicator");
    assert_eq!(describe_value(2, 30.0), "30 chars");
    assert_eq!(describe_value(3, 1.0), "yes");
    assert_eq!(describe_value(4, 0.0), "no");
}

#[test]
fn test_statistical_path_is_deterministic() {
    let caps = Capabilities::probe();
    let first = attribute(&fatal_timeout(), &caps);
    let second = attribute(&fatal_timeout(), &caps);
    assert_eq!(first.method, METHOD_STATISTICAL);
    assert_eq!(first.primary_cause, second.primary_cause);
    for (a, b) in first
        .feature_importances
        .iter()
        .zip(second.feature_importances.iter())
    {
        assert_eq!(a.importance, b.importance);
    }
}

#[test]
fn test_statistical_percentages_sum_to_one_hundred() {
    let report = attribute(&fatal_timeout(), &Capabilities::probe());
    assert_eq!(report.feature_importances.len(), 5);
    let total: f32 = report.feature_importances.iter().map(|f| f.percentage).sum();
    assert!((total - 100.0).abs() < 0.01 || total == 0.0);
    assert!(report.confidence >= 0.0 && report.confidence <= 1.0);
    assert_eq!(report.details.len(), 5);
    // The record's encoded values travel with the explanation.
    let level = report
        .feature_importances
        .iter()
        .find(|f| f.feature == "Log Level")
        .unwrap();
    assert_eq!(level.actual_value, 4.0);
}

#[test]
fn test_statistical_importances_ranked_by_impact() {
    let report = attribute(&fatal_timeout(), &Capabilities::probe());
    assert_eq!(report.method, METHOD_STATISTICAL);
    for pair in report.feature_importances.windows(2) {
        assert!(pair[0].importance.abs() >= pair[1].importance.abs());
        assert!(pair[0].percentage >= pair[1].percentage);
    }
    // The primary cause names the highest-ranked feature.
    assert!(report
        .primary_cause
        .starts_with(report.feature_importances[0].feature.as_str()));
}

#[test]
fn test_fallback_fires_severity_and_keyword_rules() {
    let caps = Capabilities::probe().without_explainer();
    let report = attribute(&fatal_timeout(), &caps);
    assert_eq!(report.method, METHOD_FALLBACK);
    // 0.4 (severe level) + 0.3 (error keyword) + 0.1 (db keyword)
    assert!((report.confidence - 0.8).abs() < 1e-6);
    // Primary cause names the feature, not the rule text.
    assert_eq!(report.primary_cause, "Log Level (FATAL)");
    let names: Vec<_> = report
        .feature_importances
        .iter()
        .map(|f| f.feature.as_str())
        .collect();
    assert!(names.contains(&"Log Level"));
    assert!(names.contains(&"Has Error Keywords"));
    assert!(names.contains(&"Has DB Keywords"));
    assert!(!names.contains(&"Message Length"));
    assert_eq!(report.details.len(), 3);
    assert!(report.details[0].contains("severity 4/4"));
}

#[test]
fn test_fallback_severe_plus_keyword_exceeds_half() {
    // An obviously anomalous record must not be reported with low confidence.
    let record = LogRecord::new(LogLevel::Fatal, "api-gateway", "connection timeout");
    let caps = Capabilities::probe().without_explainer();
    let report = attribute(&record, &caps);
    assert!(report.confidence > 0.5);
}

#[test]
fn test_fallback_long_message_rule() {
    let record = LogRecord::new(LogLevel::Info, "user-service", &"x".repeat(150));
    let caps = Capabilities::probe().without_explainer();
    let report = attribute(&record, &caps);
    assert_eq!(report.feature_importances.len(), 1);
    assert_eq!(report.feature_importances[0].feature, "Message Length");
    assert!((report.confidence - 0.2).abs() < 1e-6);
    assert_eq!(report.feature_importances[0].percentage, 100.0);
}

#[test]
fn test_fallback_unremarkable_record_is_unexpected_pattern() {
    let record = LogRecord::new(LogLevel::Info, "api-gateway", "request handled");
    let caps = Capabilities::probe().without_explainer();
    let report = attribute(&record, &caps);
    assert_eq!(report.primary_cause, "Unexpected Pattern");
    assert_eq!(report.confidence, 0.5);
}

#[test]
fn test_fallback_confidence_caps_at_one() {
    let record = LogRecord::new(
        LogLevel::Fatal,
        "db-replicator",
        &format!("fatal database replication failure: {}", "x".repeat(120)),
    );
    let caps = Capabilities::probe().without_explainer();
    let report = attribute(&record, &caps);
    // All four rules fire: 0.4 + 0.3 + 0.2 + 0.1 = 1.0.
    assert!((report.confidence - 1.0).abs() < 1e-6);
}
