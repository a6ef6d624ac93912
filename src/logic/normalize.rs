//! Normalizer - per-feature scale factors captured at training time.
//!
//! A profile is fit once per training run and owned by the artifact that
//! was fit with it. Inference must reuse the profile unmodified; applying a
//! profile to vectors with a different column count is a contract violation
//! and panics rather than degrading silently.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::features::layout::{layout_hash, FEATURE_VERSION};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationProfile {
    pub feature_version: u8,
    pub layout_hash: u32,
    /// Per-column maximum absolute value seen during fit; zeros replaced by 1.
    pub max_abs: Vec<f32>,
}

impl NormalizationProfile {
    /// Compute per-column maxima over the training vectors.
    pub fn fit(x: &Array2<f32>) -> Self {
        let max_abs = x
            .axis_iter(Axis(1))
            .map(|col| {
                let max = col.iter().fold(0.0f32, |acc, v| acc.max(v.abs()));
                if max == 0.0 {
                    1.0
                } else {
                    max
                }
            })
            .collect();

        Self {
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            max_abs,
        }
    }

    pub fn feature_count(&self) -> usize {
        self.max_abs.len()
    }

    /// Elementwise division by the fitted maxima.
    ///
    /// Panics when the column count differs from the fitted layout; that is
    /// a programming error, not a recoverable runtime condition.
    pub fn apply(&self, x: &Array2<f32>) -> Array2<f32> {
        assert_eq!(
            x.ncols(),
            self.max_abs.len(),
            "normalization profile fit on {} columns applied to {} columns",
            self.max_abs.len(),
            x.ncols()
        );

        let mut normalized = x.clone();
        for (mut col, &max) in normalized.axis_iter_mut(Axis(1)).zip(self.max_abs.iter()) {
            col.mapv_inplace(|v| v / max);
        }
        normalized
    }
}
