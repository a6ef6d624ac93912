use super::*;
use crate::logic::record::{LogLevel, LogRecord};

fn mixed_records(n: usize) -> Vec<LogRecord> {
    let mut records = Vec::with_capacity(n);
    for i in 0..n {
        if i % 5 == 4 {
            records.push(LogRecord::new(
                LogLevel::Error,
                "db-replicator",
                &format!("replication timeout on shard {} after repeated connection failures", i),
            ));
        } else {
            records.push(LogRecord::new(
                LogLevel::Info,
                "api-gateway",
                &format!("request {} handled", i),
            ));
        }
    }
    records
}

#[test]
fn test_split_index_degenerates_for_tiny_inputs() {
    assert_eq!(split_index(1), 1);
    assert_eq!(split_index(2), 1);
    assert_eq!(split_index(5), 4);
    assert_eq!(split_index(25), 20);
}

#[test]
fn test_empty_training_set_rejected() {
    let registry = ModelRegistry::new();
    let result = train_numeric(
        &[],
        BackendKind::IsolationForest,
        &Hyperparameters::default(),
        &Capabilities::probe(),
        &registry,
    );
    assert!(matches!(result, Err(EngineError::InputInvalid(_))));
    assert!(registry.detector().is_none());
}

#[test]
fn test_forest_training_publishes_detector() {
    let registry = ModelRegistry::new();
    let report = train_numeric(
        &mixed_records(25),
        BackendKind::IsolationForest,
        &Hyperparameters::default(),
        &Capabilities::probe(),
        &registry,
    )
    .unwrap();
    assert_eq!(report.backend_used, "isolation-forest-v1");
    assert_eq!(report.samples, 25);
    assert!(report.train_loss > 0.0);
    let artifact = registry.detector().unwrap();
    assert_eq!(artifact.samples, 25);
    assert_eq!(artifact.backend, BackendKind::IsolationForest);
}

#[test]
fn test_autoencoder_training_publishes_detector() {
    let registry = ModelRegistry::new();
    let report = train_numeric(
        &mixed_records(25),
        BackendKind::Autoencoder,
        &Hyperparameters::default(),
        &Capabilities::probe(),
        &registry,
    )
    .unwrap();
    assert_eq!(report.backend_used, "autoencoder-v1");
    assert!(report.train_loss.is_finite());
    assert!(report.val_loss.is_finite());
}

#[test]
fn test_autoencoder_request_falls_back_when_unavailable() {
    let registry = ModelRegistry::new();
    let caps = Capabilities::probe().without_autoencoder();
    let report = train_numeric(
        &mixed_records(25),
        BackendKind::Autoencoder,
        &Hyperparameters::default(),
        &caps,
        &registry,
    )
    .unwrap();
    assert_eq!(report.backend_used, "isolation-forest-v1");
}

#[test]
fn test_tiny_corpus_trains_without_holdout() {
    let registry = ModelRegistry::new();
    let report = train_numeric(
        &mixed_records(1),
        BackendKind::IsolationForest,
        &Hyperparameters::default(),
        &Capabilities::probe(),
        &registry,
    )
    .unwrap();
    // Mirrored validation loss keeps the overfit ratio vacuous.
    assert_eq!(report.train_loss, report.val_loss);
    assert_ne!(report.fit_quality, FitQuality::Overfitting);
}

#[test]
fn test_retraining_replaces_active_detector() {
    let registry = ModelRegistry::new();
    train_numeric(
        &mixed_records(25),
        BackendKind::IsolationForest,
        &Hyperparameters::default(),
        &Capabilities::probe(),
        &registry,
    )
    .unwrap();
    let first_id = registry.detector().unwrap().id.clone();
    train_numeric(
        &mixed_records(30),
        BackendKind::IsolationForest,
        &Hyperparameters::default(),
        &Capabilities::probe(),
        &registry,
    )
    .unwrap();
    let active = registry.detector().unwrap();
    assert_ne!(active.id, first_id);
    assert_eq!(active.samples, 30);
}

#[test]
fn test_classifier_requires_capability() {
    let registry = ModelRegistry::new();
    let corpora = CorpusStore::new();
    let dir = tempfile::tempdir().unwrap();
    let caps = Capabilities::probe().without_classifier();
    let result = train_classifier(
        "synthetic",
        "hashed-bow",
        None,
        &corpora,
        &caps,
        &registry,
        dir.path(),
    );
    assert!(matches!(result, Err(EngineError::BackendUnavailable(_))));
}

#[test]
fn test_classifier_custom_dataset_requires_records() {
    let registry = ModelRegistry::new();
    let corpora = CorpusStore::new();
    let dir = tempfile::tempdir().unwrap();
    let result = train_classifier(
        CUSTOM_DATASET,
        "hashed-bow",
        None,
        &corpora,
        &Capabilities::probe(),
        &registry,
        dir.path(),
    );
    assert!(matches!(result, Err(EngineError::InputInvalid(_))));
}

#[test]
fn test_classifier_trains_on_custom_records_and_persists() {
    let registry = ModelRegistry::new();
    let corpora = CorpusStore::new();
    let dir = tempfile::tempdir().unwrap();
    let records = mixed_records(25);
    let report = train_classifier(
        CUSTOM_DATASET,
        "hashed-bow",
        Some(&records),
        &corpora,
        &Capabilities::probe(),
        &registry,
        dir.path(),
    )
    .unwrap();
    assert_eq!(report.samples, 25);
    assert!(registry.classifier().is_some());
    assert!(dir.path().join("classifier.json").exists());
}

#[test]
fn test_classifier_trains_on_synthetic_corpus() {
    let registry = ModelRegistry::new();
    let corpora = CorpusStore::new();
    let dir = tempfile::tempdir().unwrap();
    let report = train_classifier(
        "synthetic",
        "hashed-bow",
        None,
        &corpora,
        &Capabilities::probe(),
        &registry,
        dir.path(),
    )
    .unwrap();
    assert_eq!(report.samples, 400);
    assert!(report.accuracy >= 0.0 && report.accuracy <= 1.0);
}

const TABULAR_CSV: &str = "\
size,kind,label
1.0,alpha,ok
2.0,alpha,ok
3.0,beta,bad
4.0,beta,bad
1.5,alpha,ok
3.5,beta,bad
2.5,alpha,ok
4.5,beta,bad
1.2,alpha,ok
3.8,beta,bad
";

#[test]
fn test_tabular_training_publishes_named_slot() {
    let registry = ModelRegistry::new();
    let features = vec!["size".to_string(), "kind".to_string()];
    let report = train_tabular(
        TABULAR_CSV,
        TabularModelKind::LogisticRegression,
        &features,
        "label",
        &registry,
    )
    .unwrap();
    assert_eq!(report.model_type, "logistic_regression");
    assert_eq!(report.classes, vec!["bad".to_string(), "ok".to_string()]);
    assert!(registry.tabular("logistic_regression").is_some());
    assert!(registry.tabular("random_forest").is_none());
}

#[test]
fn test_tabular_subtypes_occupy_distinct_slots() {
    let registry = ModelRegistry::new();
    let features = vec!["size".to_string(), "kind".to_string()];
    for kind in [TabularModelKind::RandomForest, TabularModelKind::Svm] {
        train_tabular(TABULAR_CSV, kind, &features, "label", &registry).unwrap();
    }
    let mut names = registry.tabular_names();
    names.sort();
    assert_eq!(names, vec!["random_forest".to_string(), "svm".to_string()]);
}

#[test]
fn test_tabular_missing_column_rejected() {
    let registry = ModelRegistry::new();
    let features = vec!["missing".to_string()];
    let result = train_tabular(
        TABULAR_CSV,
        TabularModelKind::RandomForest,
        &features,
        "label",
        &registry,
    );
    assert!(matches!(result, Err(EngineError::InputInvalid(_))));
    assert!(registry.tabular_names().is_empty());
}
