//! Multi-layer perceptron over fixed-size mini-batches.
//!
//! Every buffer is allocated once, sized by the batch size and the layer
//! widths, and reused by each [`Network::forward`] / [`Network::backward`]
//! call. Both calls take `&mut self`, so one network is driven by one caller at
//! a time; sharing it across threads means wrapping it in a lock.

mod config;
mod propagate;
mod snapshot;
mod types;

pub use config::{LayerWeights, NetworkConfig};
pub use snapshot::NetworkSnapshot;
pub use types::GradientRetention;

use log::debug;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};

use crate::activation::Activations;
use crate::error::{NetworkError, Result};
use crate::f;
use crate::layers::Layer;

#[derive(Debug, Clone)]
pub struct Network {
    layers: Vec<Layer>,
    /// `(batch_size, input_count)`, rows past the last forward batch keep
    /// their previous values.
    input: Array2<f64>,
    node_counts: Vec<usize>,
    split_factor: usize,
    batch_size: usize,
    trainable: bool,
    learn_rate: f64,
    momentum: f64,
    gradient_retention: GradientRetention,
}

impl Network {
    pub fn new(config: &NetworkConfig) -> Result<Network> {
        let activations = config.validate()?;

        let layers = match (&config.weights, config.seed) {
            (Some(weights), _) => Network::imported(config, &activations, weights)?,
            (None, Some(seed)) => {
                Network::weave(config, &activations, &mut StdRng::seed_from_u64(seed))
            }
            (None, None) => Network::weave(config, &activations, &mut thread_rng()),
        };

        debug!(
            "wove network {:?} ({}), batch size {}, trainable {}",
            config.node_counts,
            config.activations.join(", "),
            config.batch_size,
            config.trainable
        );

        Ok(Network {
            layers,
            input: Array2::zeros((config.batch_size, config.node_counts[0])),
            node_counts: config.node_counts.clone(),
            split_factor: config.split_factor,
            batch_size: config.batch_size,
            trainable: config.trainable,
            learn_rate: 0.,
            momentum: 0.,
            gradient_retention: GradientRetention::default(),
        })
    }

    fn weave<R: Rng + ?Sized>(
        config: &NetworkConfig,
        activations: &[Activations],
        rng: &mut R,
    ) -> Vec<Layer> {
        config
            .weight_shapes()
            .into_iter()
            .zip(activations)
            .map(|(w_shape, activation)| {
                Layer::random(
                    config.batch_size,
                    w_shape,
                    *activation,
                    config.trainable,
                    &mut *rng,
                )
            })
            .collect()
    }

    fn imported(
        config: &NetworkConfig,
        activations: &[Activations],
        weights: &[LayerWeights],
    ) -> Result<Vec<Layer>> {
        let mut layers = Vec::with_capacity(weights.len());
        for (layer, ((w_shape, activation), w)) in config
            .weight_shapes()
            .into_iter()
            .zip(activations)
            .zip(weights)
            .enumerate()
        {
            let matrix = Array2::from_shape_vec(w_shape, w.weights.clone()).map_err(|e| {
                NetworkError::WeightMismatch {
                    layer,
                    reason: e.to_string(),
                }
            })?;
            layers.push(Layer::new(
                config.batch_size,
                matrix,
                Array1::from(w.bias.clone()),
                *activation,
                config.trainable,
            ));
        }
        Ok(layers)
    }

    pub fn set_learn_rate(&mut self, learn_rate: f64) -> &mut Self {
        self.learn_rate = learn_rate;
        self
    }

    pub fn set_momentum(&mut self, momentum: f64) -> &mut Self {
        self.momentum = momentum;
        self
    }

    pub fn set_gradient_retention(&mut self, method: GradientRetention) -> &mut Self {
        self.gradient_retention = method;
        self
    }

    pub fn learn_rate(&self) -> f64 {
        self.learn_rate
    }

    pub fn momentum(&self) -> f64 {
        self.momentum
    }

    pub fn gradient_retention(&self) -> GradientRetention {
        self.gradient_retention
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn is_trainable(&self) -> bool {
        self.trainable
    }

    pub fn node_counts(&self) -> &[usize] {
        &self.node_counts
    }

    pub fn split_factor(&self) -> usize {
        self.split_factor
    }

    pub fn input_count(&self) -> usize {
        self.node_counts[0]
    }

    pub fn output_count(&self) -> usize {
        self.layers[self.output_layer()].width()
    }

    pub fn output_layer(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn input(&self) -> ArrayView2<f64> {
        self.input.view()
    }

    /// Activated output layer, one row per batch slot.
    pub fn output(&self) -> ArrayView2<f64> {
        self.layers[self.output_layer()].nodes.view()
    }

    pub fn output_rows(&self) -> Vec<Vec<f64>> {
        self.output().outer_iter().map(|row| row.to_vec()).collect()
    }

    /// Index of the largest output in every row.
    pub fn predictions(&self) -> Vec<usize> {
        self.output().outer_iter().map(f::argmax).collect()
    }

    /// Loss of the output activation against a full batch of targets.
    pub fn loss(&self, target: &[Vec<f64>]) -> Result<f64> {
        let target = self.target_batch(target)?;
        let activation = self.layers[self.output_layer()].activation;
        activation.layer_loss(self.output(), target.view())
    }

    /// Loss of the output activation over the first `target.len()` output
    /// rows, for batches the targets do not fill.
    pub fn batch_loss(&self, target: &[Vec<f64>]) -> Result<f64> {
        let target = self.target_batch(target)?;
        let activation = self.layers[self.output_layer()].activation;
        activation.layer_loss(
            self.output().slice(s![..target.nrows(), ..]),
            target.view(),
        )
    }

    /// Squared error of the first `target.len()` output rows, averaged over
    /// those rows.
    pub fn mean_squared_error(&self, target: &[Vec<f64>]) -> Result<f64> {
        let target = self.target_batch(target)?;
        let output = self.output();
        Ok(f::mean_squared_error(
            output.slice(s![..target.nrows(), ..]),
            target.view(),
        ))
    }

    /// Largest absolute difference between the first `target.len()` output
    /// rows and the targets.
    pub fn max_error(&self, target: &[Vec<f64>]) -> Result<f64> {
        let target = self.target_batch(target)?;
        let output = self.output();
        Ok(f::max_absolute_error(
            output.slice(s![..target.nrows(), ..]),
            target.view(),
        ))
    }

    fn target_batch(&self, target: &[Vec<f64>]) -> Result<Array2<f64>> {
        self.batch(target, self.output_count(), "target")
    }

    /// Packs up to `batch_size` rows of `width` values into a matrix.
    fn batch(&self, rows: &[Vec<f64>], width: usize, context: &str) -> Result<Array2<f64>> {
        if rows.len() > self.batch_size {
            return Err(NetworkError::BatchOverflow {
                rows: rows.len(),
                batch_size: self.batch_size,
            });
        }

        let mut batch = Array2::zeros((rows.len(), width));
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(NetworkError::DimensionMismatch(format!(
                    "{} row {} has {} values, expected {}",
                    context,
                    i,
                    row.len(),
                    width
                )));
            }
            batch.row_mut(i).assign(&ArrayView1::from(row.as_slice()));
        }
        Ok(batch)
    }
}
