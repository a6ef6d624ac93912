//! Binary sequence classifier for log message text.
//!
//! Bag-of-hashed-tokens logistic model. Fine-tuning is deliberately a
//! single small-batch pass over the corpus so a training request stays
//! interactive; the model is JSON-persistable so a fitted classifier can be
//! reloaded at process start.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::logic::error::EngineError;

/// Hashed vocabulary size
pub const VOCAB_BUCKETS: usize = 4096;

/// Class index emitted for severe/anomalous text
pub const CRITICAL_CLASS: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextClassifier {
    weights: Vec<f32>,
    bias: f32,
    buckets: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierMetrics {
    pub accuracy: f32,
    pub loss: f32,
    pub eval_samples: usize,
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

/// FNV-1a over the token bytes, folded into the bucket range.
fn hash_token(token: &str) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in token.bytes() {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash % VOCAB_BUCKETS as u64) as usize
}

/// Lowercase, split on non-alphanumerics, hash into the fixed vocabulary.
pub fn tokenize(text: &str) -> Vec<usize> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(hash_token)
        .collect()
}

/// Token counts as a sparse feature map.
fn token_counts(text: &str) -> HashMap<usize, f32> {
    let mut counts = HashMap::new();
    for bucket in tokenize(text) {
        *counts.entry(bucket).or_insert(0.0) += 1.0;
    }
    counts
}

impl TextClassifier {
    fn new() -> Self {
        Self {
            weights: vec![0.0; VOCAB_BUCKETS],
            bias: 0.0,
            buckets: VOCAB_BUCKETS,
        }
    }

    fn raw_score(&self, counts: &HashMap<usize, f32>) -> f32 {
        let mut score = self.bias;
        for (&bucket, &count) in counts {
            score += self.weights[bucket % self.buckets] * count;
        }
        score
    }

    /// Fit with mini-batch gradient steps on logistic loss.
    pub fn fit(
        samples: &[(String, u8)],
        epochs: usize,
        batch_size: usize,
        learning_rate: f32,
    ) -> Result<Self, EngineError> {
        if samples.is_empty() {
            return Err(EngineError::FitFailure(
                "classifier requires a non-empty training set".to_string(),
            ));
        }

        let mut model = Self::new();
        let batch = batch_size.max(1);

        for _ in 0..epochs.max(1) {
            for chunk in samples.chunks(batch) {
                let mut weight_grads: HashMap<usize, f32> = HashMap::new();
                let mut bias_grad = 0.0;

                for (text, label) in chunk {
                    let counts = token_counts(text);
                    let error = sigmoid(model.raw_score(&counts)) - f32::from(*label);
                    bias_grad += error;
                    for (&bucket, &count) in &counts {
                        *weight_grads.entry(bucket).or_insert(0.0) += error * count;
                    }
                }

                let scale = learning_rate / chunk.len() as f32;
                model.bias -= scale * bias_grad;
                for (bucket, grad) in weight_grads {
                    model.weights[bucket] -= scale * grad;
                }
            }
        }

        Ok(model)
    }

    /// Predicted class and its probability.
    pub fn predict(&self, text: &str) -> (usize, f32) {
        let p = sigmoid(self.raw_score(&token_counts(text)));
        if p >= 0.5 {
            (CRITICAL_CLASS, p)
        } else {
            (0, 1.0 - p)
        }
    }

    pub fn evaluate(&self, samples: &[(String, u8)]) -> ClassifierMetrics {
        if samples.is_empty() {
            return ClassifierMetrics {
                accuracy: 0.0,
                loss: 0.0,
                eval_samples: 0,
            };
        }

        let mut correct = 0usize;
        let mut loss = 0.0f32;
        for (text, label) in samples {
            let p = sigmoid(self.raw_score(&token_counts(text)));
            let predicted = usize::from(p >= 0.5);
            if predicted == *label as usize {
                correct += 1;
            }
            let p_true = if *label == 1 { p } else { 1.0 - p };
            loss -= p_true.clamp(1e-6, 1.0 - 1e-6).ln();
        }

        ClassifierMetrics {
            accuracy: correct as f32 / samples.len() as f32,
            loss: loss / samples.len() as f32,
            eval_samples: samples.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<(String, u8)> {
        let mut samples = Vec::new();
        for i in 0..20 {
            samples.push((format!("request {} completed successfully", i), 0));
            samples.push((format!("database connection timeout failure {}", i), 1));
        }
        samples
    }

    #[test]
    fn test_tokenize_is_stable() {
        assert_eq!(tokenize("Connection TIMEOUT!"), tokenize("connection timeout"));
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_fit_separates_classes() {
        let samples = corpus();
        // More passes than the production default so the margin is clear.
        let model = TextClassifier::fit(&samples, 5, 4, 0.5).unwrap();

        let (class, confidence) = model.predict("fatal timeout contacting database");
        assert_eq!(class, CRITICAL_CLASS);
        assert!(confidence > 0.5);

        let (class, _) = model.predict("request completed successfully");
        assert_eq!(class, 0);
    }

    #[test]
    fn test_evaluate_reports_accuracy() {
        let samples = corpus();
        let model = TextClassifier::fit(&samples, 5, 4, 0.5).unwrap();
        let metrics = model.evaluate(&samples);
        assert!(metrics.accuracy > 0.8);
        assert_eq!(metrics.eval_samples, samples.len());
    }

    #[test]
    fn test_empty_corpus_rejected() {
        assert!(matches!(
            TextClassifier::fit(&[], 1, 4, 0.1),
            Err(EngineError::FitFailure(_))
        ));
    }

    #[test]
    fn test_roundtrip_serialization() {
        let samples = corpus();
        let model = TextClassifier::fit(&samples, 2, 4, 0.5).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: TextClassifier = serde_json::from_str(&json).unwrap();
        assert_eq!(
            model.predict("database timeout"),
            restored.predict("database timeout")
        );
    }
}
