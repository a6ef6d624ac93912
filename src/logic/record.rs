//! Log record boundary types.
//!
//! Records are validated/defaulted at the boundary: unknown levels collapse
//! to INFO rather than erroring, so downstream feature encoding stays total.

use serde::{Deserialize, Deserializer, Serialize};

/// Log severity level. Ordinals 0..=4 feed the feature encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Total parse: unknown strings map to the INFO default.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => LogLevel::Debug,
            "WARN" | "WARNING" => LogLevel::Warn,
            "ERROR" => LogLevel::Error,
            "FATAL" | "CRITICAL" => LogLevel::Fatal,
            _ => LogLevel::Info,
        }
    }

    pub fn ordinal(self) -> f32 {
        match self {
            LogLevel::Debug => 0.0,
            LogLevel::Info => 1.0,
            LogLevel::Warn => 2.0,
            LogLevel::Error => 3.0,
            LogLevel::Fatal => 4.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// ERROR and FATAL count as severe for labeling and attribution rules.
    pub fn is_severe(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Fatal)
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(LogLevel::parse(&raw))
    }
}

/// One structured log record. Immutable once received.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// ISO-8601 timestamp string, if the producer supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(default)]
    pub level: LogLevel,

    /// Free-text service identifier.
    #[serde(default)]
    pub source: String,

    #[serde(default)]
    pub message: String,

    /// Precomputed anomaly score, when the corpus carries labels.
    #[serde(rename = "anomalyScore", default, skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f32>,
}

impl LogRecord {
    pub fn new(level: LogLevel, source: &str, message: &str) -> Self {
        Self {
            timestamp: None,
            level,
            source: source.to_string(),
            message: message.to_string(),
            anomaly_score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse_defaults_to_info() {
        assert_eq!(LogLevel::parse("TRACE"), LogLevel::Info);
        assert_eq!(LogLevel::parse("error"), LogLevel::Error);
        assert_eq!(LogLevel::parse("CRITICAL"), LogLevel::Fatal);
    }

    #[test]
    fn test_record_deserialization_defaults() {
        let record: LogRecord =
            serde_json::from_str(r#"{"message":"hello","level":"NONSENSE"}"#).unwrap();
        assert_eq!(record.level, LogLevel::Info);
        assert!(record.timestamp.is_none());
        assert!(record.anomaly_score.is_none());
        assert_eq!(record.source, "");
    }

    #[test]
    fn test_record_anomaly_score_alias() {
        let record: LogRecord =
            serde_json::from_str(r#"{"message":"x","anomalyScore":0.8}"#).unwrap();
        assert_eq!(record.anomaly_score, Some(0.8));
    }
}
