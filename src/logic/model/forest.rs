//! Isolation forest - density/isolation-based outlier model.
//!
//! Fallback backend when the reconstruction runtime is unavailable, and the
//! background model for attribution. Anomaly scores follow the standard
//! isolation-forest formulation s(x) = 2^(-E[h(x)] / c(n)) in [0, 1];
//! `score_samples` / `decision_function` keep the sign conventions the
//! scoring and attribution paths expect (higher = more normal).

use ndarray::{Array1, Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::logic::error::EngineError;

/// Default tree count
pub const DEFAULT_TREES: usize = 100;

/// Per-tree subsample ceiling
const SUBSAMPLE: usize = 256;

const EULER_MASCHERONI: f32 = 0.577_215_7;

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
}

/// Average unsuccessful-search path length in a BST of n nodes.
fn c_factor(n: usize) -> f32 {
    if n <= 1 {
        return 0.0;
    }
    let nf = n as f32;
    2.0 * ((nf - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (nf - 1.0) / nf
}

fn build_node(
    x: &Array2<f32>,
    rows: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if rows.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: rows.len() };
    }

    let feature = rng.gen_range(0..x.ncols());
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for &r in rows {
        let v = x[[r, feature]];
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !(hi > lo) {
        return Node::Leaf { size: rows.len() };
    }

    let threshold = rng.gen_range(lo..hi);
    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.iter().partition(|&&r| x[[r, feature]] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_node(x, &left_rows, depth + 1, max_depth, rng)),
        right: Box::new(build_node(x, &right_rows, depth + 1, max_depth, rng)),
    }
}

fn path_length(row: ArrayView1<f32>, node: &Node, depth: usize) -> f32 {
    match node {
        Node::Leaf { size } => depth as f32 + c_factor(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] < *threshold {
                path_length(row, left, depth + 1)
            } else {
                path_length(row, right, depth + 1)
            }
        }
    }
}

impl IsolationForest {
    pub fn fit(x: &Array2<f32>, n_estimators: usize, seed: u64) -> Result<Self, EngineError> {
        let n = x.nrows();
        if n == 0 || x.ncols() == 0 {
            return Err(EngineError::FitFailure(
                "isolation forest requires a non-empty training matrix".to_string(),
            ));
        }

        let sample_size = n.min(SUBSAMPLE);
        let max_depth = ((sample_size as f32).log2().ceil() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(seed);

        let trees = (0..n_estimators.max(1))
            .map(|_| {
                let rows: Vec<usize> = (0..sample_size).map(|_| rng.gen_range(0..n)).collect();
                build_node(x, &rows, 0, max_depth, &mut rng)
            })
            .collect();

        Ok(Self { trees, sample_size })
    }

    /// Anomaly score in [0, 1]; higher = more anomalous.
    pub fn anomaly_score_row(&self, row: ArrayView1<f32>) -> f32 {
        let c = c_factor(self.sample_size);
        if c <= 0.0 {
            return 0.5;
        }
        let total: f32 = self
            .trees
            .iter()
            .map(|tree| path_length(row, tree, 0))
            .sum();
        let avg = total / self.trees.len() as f32;
        2.0f32.powf(-avg / c)
    }

    pub fn anomaly_scores(&self, x: &Array2<f32>) -> Array1<f32> {
        Array1::from_iter(x.rows().into_iter().map(|row| self.anomaly_score_row(row)))
    }

    /// Negative outlier score per sample; higher = more normal.
    pub fn score_samples(&self, x: &Array2<f32>) -> Array1<f32> {
        self.anomaly_scores(x).mapv(|s| -s)
    }

    /// Signed decision value; positive = normal side, negative = anomalous.
    pub fn decision_function_row(&self, row: ArrayView1<f32>) -> f32 {
        0.5 - self.anomaly_score_row(row)
    }
}
