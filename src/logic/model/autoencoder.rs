//! Reconstruction autoencoder - the preferred anomaly backend.
//!
//! Dense 3-8-4-8-3 network trained to reproduce its own normalized input;
//! anomaly score = mean squared reconstruction error per record. Training
//! is seeded mini-batch SGD, so the same records and hyperparameters always
//! produce the same fitted model.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::logic::error::EngineError;

const HIDDEN_1: usize = 8;
const BOTTLENECK: usize = 4;

#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub dropout: f32,
    pub learning_rate: f32,
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: crate::constants::DEFAULT_EPOCHS,
            batch_size: crate::constants::DEFAULT_BATCH_SIZE,
            dropout: crate::constants::DEFAULT_DROPOUT,
            learning_rate: 0.1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Autoencoder {
    w1: Array2<f32>,
    b1: Array1<f32>,
    w2: Array2<f32>,
    b2: Array1<f32>,
    w3: Array2<f32>,
    b3: Array1<f32>,
    w4: Array2<f32>,
    b4: Array1<f32>,
    input_dim: usize,
}

fn relu(v: f32) -> f32 {
    v.max(0.0)
}

fn relu_grad(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else {
        0.0
    }
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

fn glorot(rng: &mut StdRng, fan_in: usize, fan_out: usize) -> Array2<f32> {
    let limit = (6.0 / (fan_in + fan_out) as f32).sqrt();
    Array2::from_shape_fn((fan_in, fan_out), |_| rng.gen_range(-limit..limit))
}

impl Autoencoder {
    fn init(input_dim: usize, rng: &mut StdRng) -> Self {
        Self {
            w1: glorot(rng, input_dim, HIDDEN_1),
            b1: Array1::zeros(HIDDEN_1),
            w2: glorot(rng, HIDDEN_1, BOTTLENECK),
            b2: Array1::zeros(BOTTLENECK),
            w3: glorot(rng, BOTTLENECK, HIDDEN_1),
            b3: Array1::zeros(HIDDEN_1),
            w4: glorot(rng, HIDDEN_1, input_dim),
            b4: Array1::zeros(input_dim),
            input_dim,
        }
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Fit on normalized training rows.
    pub fn fit(train: &Array2<f32>, opts: &TrainOptions) -> Result<Self, EngineError> {
        let n = train.nrows();
        if n == 0 || train.ncols() == 0 {
            return Err(EngineError::FitFailure(
                "autoencoder requires a non-empty training matrix".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(opts.seed);
        let mut model = Self::init(train.ncols(), &mut rng);
        let batch = opts.batch_size.max(1);

        for _ in 0..opts.epochs {
            let mut start = 0;
            while start < n {
                let end = (start + batch).min(n);
                let xb = train.slice(ndarray::s![start..end, ..]).to_owned();
                model.train_step(&xb, opts.dropout, opts.learning_rate, &mut rng);
                start = end;
            }
        }

        Ok(model)
    }

    fn train_step(&mut self, x: &Array2<f32>, dropout: f32, lr: f32, rng: &mut StdRng) {
        let batch = x.nrows() as f32;
        let dim = x.ncols() as f32;

        // Forward
        let z1 = x.dot(&self.w1) + &self.b1;
        let h1 = z1.mapv(relu);
        let mask = if dropout > 0.0 {
            let keep = 1.0 - dropout;
            Array2::from_shape_fn(h1.raw_dim(), |_| {
                if rng.gen::<f32>() < dropout {
                    0.0
                } else {
                    1.0 / keep
                }
            })
        } else {
            Array2::ones(h1.raw_dim())
        };
        let h1d = &h1 * &mask;
        let z2 = h1d.dot(&self.w2) + &self.b2;
        let h2 = z2.mapv(relu);
        let z3 = h2.dot(&self.w3) + &self.b3;
        let h3 = z3.mapv(relu);
        let z4 = h3.dot(&self.w4) + &self.b4;
        let out = z4.mapv(sigmoid);

        // Backward (MSE against the input itself)
        let dout = (&out - x) * (2.0 / (batch * dim));
        let dz4 = &dout * &out.mapv(|v| v * (1.0 - v));
        let dw4 = h3.t().dot(&dz4);
        let db4 = dz4.sum_axis(Axis(0));

        let dh3 = dz4.dot(&self.w4.t());
        let dz3 = &dh3 * &z3.mapv(relu_grad);
        let dw3 = h2.t().dot(&dz3);
        let db3 = dz3.sum_axis(Axis(0));

        let dh2 = dz3.dot(&self.w3.t());
        let dz2 = &dh2 * &z2.mapv(relu_grad);
        let dw2 = h1d.t().dot(&dz2);
        let db2 = dz2.sum_axis(Axis(0));

        let dh1 = dz2.dot(&self.w2.t()) * &mask;
        let dz1 = &dh1 * &z1.mapv(relu_grad);
        let dw1 = x.t().dot(&dz1);
        let db1 = dz1.sum_axis(Axis(0));

        self.w4.scaled_add(-lr, &dw4);
        self.b4.scaled_add(-lr, &db4);
        self.w3.scaled_add(-lr, &dw3);
        self.b3.scaled_add(-lr, &db3);
        self.w2.scaled_add(-lr, &dw2);
        self.b2.scaled_add(-lr, &db2);
        self.w1.scaled_add(-lr, &dw1);
        self.b1.scaled_add(-lr, &db1);
    }

    /// Inference forward pass (no dropout).
    pub fn reconstruct(&self, x: &Array2<f32>) -> Array2<f32> {
        let h1 = (x.dot(&self.w1) + &self.b1).mapv(relu);
        let h2 = (h1.dot(&self.w2) + &self.b2).mapv(relu);
        let h3 = (h2.dot(&self.w3) + &self.b3).mapv(relu);
        (h3.dot(&self.w4) + &self.b4).mapv(sigmoid)
    }

    /// Mean squared reconstruction error per row.
    pub fn reconstruction_errors(&self, x: &Array2<f32>) -> Array1<f32> {
        let out = self.reconstruct(x);
        let sq = (&out - x).mapv(|v| v * v);
        sq.mean_axis(Axis(1))
            .unwrap_or_else(|| Array1::zeros(x.nrows()))
    }
}
