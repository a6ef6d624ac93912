//! Tabular classifiers trained from CSV data.
//!
//! Several subtypes can be active at once in the registry's name-indexed
//! slot. Subtypes: a bagged-stump forest, one-vs-rest logistic regression,
//! and a linear SVM (hinge loss). Categorical columns are label-encoded;
//! the encoders travel with the artifact so later classification requests
//! can encode raw rows the same way.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::logic::error::EngineError;

const STUMP_COUNT: usize = 100;
const LINEAR_EPOCHS: usize = 50;
const LINEAR_LEARNING_RATE: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabularModelKind {
    RandomForest,
    LogisticRegression,
    Svm,
}

impl TabularModelKind {
    /// Parse a requested subtype; unknown names are a rejected request.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" => Some(TabularModelKind::RandomForest),
            "logistic_regression" => Some(TabularModelKind::LogisticRegression),
            "svm" | "linear_svm" => Some(TabularModelKind::Svm),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TabularModelKind::RandomForest => "random_forest",
            TabularModelKind::LogisticRegression => "logistic_regression",
            TabularModelKind::Svm => "svm",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stump {
    feature: usize,
    threshold: f32,
    left_class: usize,
    right_class: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TabularModel {
    StumpForest {
        stumps: Vec<Stump>,
        n_classes: usize,
    },
    Linear {
        weights: Vec<Vec<f32>>,
        bias: Vec<f32>,
        hinge: bool,
    },
}

/// Parsed + encoded CSV training data.
#[derive(Debug, Clone)]
pub struct TabularDataset {
    pub features: Array2<f32>,
    pub labels: Vec<usize>,
    /// Target class names, index = class id.
    pub classes: Vec<String>,
    /// Per-feature label encoders; `None` for numeric columns.
    pub encoders: Vec<Option<Vec<String>>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularMetrics {
    pub accuracy: f32,
    pub precision: f32,
    pub recall: f32,
    pub f1_score: f32,
    pub train_samples: usize,
    pub test_samples: usize,
}

fn split_line(line: &str) -> Vec<String> {
    line.trim_end_matches('\r')
        .split(',')
        .map(|f| f.trim().to_string())
        .collect()
}

/// Parse CSV text and encode the requested columns.
///
/// Plain comma splitting (no quoted-field support); malformed rows are
/// skipped.
pub fn parse_csv_dataset(
    csv: &str,
    feature_columns: &[String],
    target_column: &str,
) -> Result<TabularDataset, EngineError> {
    let mut lines = csv.lines().filter(|l| !l.trim().is_empty());
    let header = split_line(
        lines
            .next()
            .ok_or_else(|| EngineError::InputInvalid("empty CSV data".to_string()))?,
    );

    let column_index = |name: &str| -> Result<usize, EngineError> {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| EngineError::InputInvalid(format!("column '{}' not found in CSV", name)))
    };

    let feature_idx: Vec<usize> = feature_columns
        .iter()
        .map(|c| column_index(c))
        .collect::<Result<_, _>>()?;
    let target_idx = column_index(target_column)?;

    let mut raw_features: Vec<Vec<String>> = Vec::new();
    let mut raw_targets: Vec<String> = Vec::new();
    for line in lines {
        let fields = split_line(line);
        if fields.len() != header.len() {
            continue;
        }
        raw_features.push(feature_idx.iter().map(|&i| fields[i].clone()).collect());
        raw_targets.push(fields[target_idx].clone());
    }

    if raw_features.len() < 2 {
        return Err(EngineError::InputInvalid(
            "CSV must contain at least two data rows".to_string(),
        ));
    }

    // Encode target classes.
    let mut classes: Vec<String> = raw_targets.clone();
    classes.sort();
    classes.dedup();
    let labels: Vec<usize> = raw_targets
        .iter()
        .map(|t| classes.iter().position(|c| c == t).unwrap_or(0))
        .collect();

    // Encode feature columns: numeric when every value parses, else labeled.
    let n_rows = raw_features.len();
    let n_cols = feature_idx.len();
    let mut encoders: Vec<Option<Vec<String>>> = Vec::with_capacity(n_cols);
    let mut data = vec![0.0f32; n_rows * n_cols];

    for col in 0..n_cols {
        let numeric: Option<Vec<f32>> = raw_features
            .iter()
            .map(|row| row[col].parse::<f32>().ok())
            .collect();

        match numeric {
            Some(values) => {
                for (row, v) in values.into_iter().enumerate() {
                    data[row * n_cols + col] = v;
                }
                encoders.push(None);
            }
            None => {
                let mut values: Vec<String> =
                    raw_features.iter().map(|row| row[col].clone()).collect();
                values.sort();
                values.dedup();
                for (row, raw) in raw_features.iter().enumerate() {
                    let idx = values.iter().position(|v| v == &raw[col]).unwrap_or(0);
                    data[row * n_cols + col] = idx as f32;
                }
                encoders.push(Some(values));
            }
        }
    }

    let features = Array2::from_shape_vec((n_rows, n_cols), data)
        .map_err(|e| EngineError::InputInvalid(format!("CSV shape error: {}", e)))?;

    Ok(TabularDataset {
        features,
        labels,
        classes,
        encoders,
    })
}

/// Encode one comma-separated input row with the artifact's encoders.
pub fn encode_input_row(
    text: &str,
    encoders: &[Option<Vec<String>>],
) -> Result<Vec<f32>, EngineError> {
    let fields = split_line(text);
    if fields.len() != encoders.len() {
        return Err(EngineError::InputInvalid(format!(
            "expected {} feature values, got {}",
            encoders.len(),
            fields.len()
        )));
    }

    fields
        .iter()
        .zip(encoders.iter())
        .map(|(field, encoder)| match encoder {
            Some(values) => values
                .iter()
                .position(|v| v == field)
                .map(|i| i as f32)
                .ok_or_else(|| {
                    EngineError::InputInvalid(format!("unknown categorical value '{}'", field))
                }),
            None => field.parse::<f32>().map_err(|_| {
                EngineError::InputInvalid(format!("'{}' is not a numeric feature value", field))
            }),
        })
        .collect()
}

fn majority(labels: &[usize], rows: &[usize], n_classes: usize) -> usize {
    let mut counts = vec![0usize; n_classes];
    for &r in rows {
        counts[labels[r]] += 1;
    }
    counts
        .iter()
        .enumerate()
        .max_by_key(|(_, c)| **c)
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

impl TabularModel {
    pub fn fit(
        kind: TabularModelKind,
        x: &Array2<f32>,
        y: &[usize],
        n_classes: usize,
        seed: u64,
    ) -> Result<Self, EngineError> {
        if x.nrows() == 0 || x.nrows() != y.len() {
            return Err(EngineError::FitFailure(
                "tabular training data is empty or misaligned".to_string(),
            ));
        }
        match kind {
            TabularModelKind::RandomForest => Ok(Self::fit_stumps(x, y, n_classes, seed)),
            TabularModelKind::LogisticRegression => Ok(Self::fit_linear(x, y, n_classes, false)),
            TabularModelKind::Svm => Ok(Self::fit_linear(x, y, n_classes, true)),
        }
    }

    fn fit_stumps(x: &Array2<f32>, y: &[usize], n_classes: usize, seed: u64) -> Self {
        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut stumps = Vec::with_capacity(STUMP_COUNT);

        for _ in 0..STUMP_COUNT {
            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let feature = rng.gen_range(0..x.ncols());

            let mut lo = f32::INFINITY;
            let mut hi = f32::NEG_INFINITY;
            for &r in &rows {
                let v = x[[r, feature]];
                lo = lo.min(v);
                hi = hi.max(v);
            }

            let overall = majority(y, &rows, n_classes);
            let stump = if hi > lo {
                let threshold = rng.gen_range(lo..hi);
                let (left, right): (Vec<usize>, Vec<usize>) =
                    rows.iter().partition(|&&r| x[[r, feature]] < threshold);
                Stump {
                    feature,
                    threshold,
                    left_class: if left.is_empty() {
                        overall
                    } else {
                        majority(y, &left, n_classes)
                    },
                    right_class: if right.is_empty() {
                        overall
                    } else {
                        majority(y, &right, n_classes)
                    },
                }
            } else {
                Stump {
                    feature,
                    threshold: lo,
                    left_class: overall,
                    right_class: overall,
                }
            };
            stumps.push(stump);
        }

        TabularModel::StumpForest { stumps, n_classes }
    }

    /// One-vs-rest linear models; hinge loss for the SVM subtype.
    fn fit_linear(x: &Array2<f32>, y: &[usize], n_classes: usize, hinge: bool) -> Self {
        let dim = x.ncols();
        let mut weights = vec![vec![0.0f32; dim]; n_classes];
        let mut bias = vec![0.0f32; n_classes];

        for class in 0..n_classes {
            for _ in 0..LINEAR_EPOCHS {
                for (row, &label) in x.rows().into_iter().zip(y.iter()) {
                    let margin: f32 = bias[class]
                        + weights[class]
                            .iter()
                            .zip(row.iter())
                            .map(|(w, v)| w * v)
                            .sum::<f32>();

                    if hinge {
                        let signed = if label == class { 1.0 } else { -1.0 };
                        if signed * margin < 1.0 {
                            for (w, v) in weights[class].iter_mut().zip(row.iter()) {
                                *w += LINEAR_LEARNING_RATE * signed * v;
                            }
                            bias[class] += LINEAR_LEARNING_RATE * signed;
                        }
                    } else {
                        let target = if label == class { 1.0 } else { 0.0 };
                        let error = sigmoid(margin) - target;
                        for (w, v) in weights[class].iter_mut().zip(row.iter()) {
                            *w -= LINEAR_LEARNING_RATE * error * v;
                        }
                        bias[class] -= LINEAR_LEARNING_RATE * error;
                    }
                }
            }
        }

        TabularModel::Linear {
            weights,
            bias,
            hinge,
        }
    }

    /// Predicted class id and a confidence in [0, 1].
    pub fn predict(&self, row: &[f32]) -> (usize, f32) {
        match self {
            TabularModel::StumpForest { stumps, n_classes } => {
                let mut votes = vec![0usize; (*n_classes).max(1)];
                for stump in stumps {
                    let class = if row.get(stump.feature).copied().unwrap_or(0.0) < stump.threshold
                    {
                        stump.left_class
                    } else {
                        stump.right_class
                    };
                    votes[class] += 1;
                }
                let (class, count) = votes
                    .iter()
                    .enumerate()
                    .max_by_key(|(_, c)| **c)
                    .map(|(i, c)| (i, *c))
                    .unwrap_or((0, 0));
                (class, count as f32 / stumps.len().max(1) as f32)
            }
            TabularModel::Linear { weights, bias, .. } => {
                let scores: Vec<f32> = weights
                    .iter()
                    .zip(bias.iter())
                    .map(|(w, b)| {
                        b + w
                            .iter()
                            .zip(row.iter())
                            .map(|(wi, vi)| wi * vi)
                            .sum::<f32>()
                    })
                    .collect();

                let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
                let exp_sum: f32 = scores.iter().map(|s| (s - max).exp()).sum();
                let (class, score) = scores
                    .iter()
                    .enumerate()
                    .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                    .map(|(i, s)| (i, *s))
                    .unwrap_or((0, 0.0));
                let confidence = if exp_sum > 0.0 {
                    (score - max).exp() / exp_sum
                } else {
                    0.5
                };
                (class, confidence)
            }
        }
    }

    /// Accuracy plus support-weighted precision/recall/F1.
    pub fn evaluate(&self, x: &Array2<f32>, y: &[usize], n_classes: usize) -> (f32, f32, f32, f32) {
        if y.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let predictions: Vec<usize> = x
            .rows()
            .into_iter()
            .map(|row| self.predict(row.to_vec().as_slice()).0)
            .collect();

        let correct = predictions.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
        let accuracy = correct as f32 / y.len() as f32;

        let mut precision = 0.0f32;
        let mut recall = 0.0f32;
        let mut f1 = 0.0f32;
        for class in 0..n_classes {
            let tp = predictions
                .iter()
                .zip(y.iter())
                .filter(|(p, t)| **p == class && **t == class)
                .count() as f32;
            let fp = predictions
                .iter()
                .zip(y.iter())
                .filter(|(p, t)| **p == class && **t != class)
                .count() as f32;
            let fn_ = predictions
                .iter()
                .zip(y.iter())
                .filter(|(p, t)| **p != class && **t == class)
                .count() as f32;
            let support = y.iter().filter(|t| **t == class).count() as f32 / y.len() as f32;

            let p = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
            let r = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
            let f = if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 };

            precision += support * p;
            recall += support * r;
            f1 += support * f;
        }

        (accuracy, precision, recall, f1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
size,kind,label
1.0,small,ok
1.2,small,ok
1.1,small,ok
0.9,small,ok
9.0,large,bad
9.5,large,bad
8.8,large,bad
9.2,large,bad
";

    fn dataset() -> TabularDataset {
        parse_csv_dataset(
            CSV,
            &["size".to_string(), "kind".to_string()],
            "label",
        )
        .unwrap()
    }

    #[test]
    fn test_csv_parsing_and_encoding() {
        let ds = dataset();
        assert_eq!(ds.features.nrows(), 8);
        assert_eq!(ds.classes, vec!["bad".to_string(), "ok".to_string()]);
        assert!(ds.encoders[0].is_none()); // numeric column
        assert!(ds.encoders[1].is_some()); // categorical column
    }

    #[test]
    fn test_missing_column_rejected() {
        let result = parse_csv_dataset(CSV, &["nonexistent".to_string()], "label");
        assert!(matches!(result, Err(EngineError::InputInvalid(_))));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!(
            TabularModelKind::parse("random-forest"),
            Some(TabularModelKind::RandomForest)
        );
        assert_eq!(
            TabularModelKind::parse("logistic_regression"),
            Some(TabularModelKind::LogisticRegression)
        );
        assert_eq!(TabularModelKind::parse("svm"), Some(TabularModelKind::Svm));
        assert_eq!(TabularModelKind::parse("quantum"), None);
    }

    #[test]
    fn test_all_subtypes_learn_separable_data() {
        let ds = dataset();
        for kind in [
            TabularModelKind::RandomForest,
            TabularModelKind::LogisticRegression,
            TabularModelKind::Svm,
        ] {
            let model =
                TabularModel::fit(kind, &ds.features, &ds.labels, ds.classes.len(), 42).unwrap();
            let (accuracy, _, _, f1) =
                model.evaluate(&ds.features, &ds.labels, ds.classes.len());
            assert!(accuracy > 0.7, "{:?} accuracy {}", kind, accuracy);
            assert!(f1 > 0.0);
        }
    }

    #[test]
    fn test_input_row_encoding() {
        let ds = dataset();
        let row = encode_input_row("1.5, small", &ds.encoders).unwrap();
        assert_eq!(row, vec![1.5, ds.encoders[1].as_ref().unwrap()
            .iter().position(|v| v == "small").unwrap() as f32]);

        assert!(encode_input_row("1.5", &ds.encoders).is_err()); // arity
        assert!(encode_input_row("1.5, unseen", &ds.encoders).is_err());
    }
}
