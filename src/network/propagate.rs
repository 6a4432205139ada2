use ndarray::linalg::general_mat_mul;
use ndarray::s;

use super::Network;
use crate::error::{NetworkError, Result};

impl Network {
    /// Runs `batch` through every layer. Batch slots past `batch.len()` keep
    /// the input of earlier calls and are recomputed from it.
    pub fn forward(&mut self, batch: &[Vec<f64>]) -> Result<()> {
        let x = self.batch(batch, self.input_count(), "input")?;
        self.input.slice_mut(s![..x.nrows(), ..]).assign(&x);

        for i in 0..self.layers.len() {
            let (done, rest) = self.layers.split_at_mut(i);
            let x = match done.last() {
                Some(prev) => prev.nodes.view(),
                None => self.input.view(),
            };
            rest[0].forward(x)?;
        }
        Ok(())
    }

    /// One gradient step against `target`, which lines up with the rows of the
    /// preceding forward pass. Slots without a target row do not contribute.
    pub fn backward(&mut self, target: &[Vec<f64>]) -> Result<()> {
        if !self.trainable {
            return Err(NetworkError::NotTrainable);
        }
        if target.len() > self.batch_size {
            return Err(NetworkError::BatchOverflow {
                rows: target.len(),
                batch_size: self.batch_size,
            });
        }
        if !(self.learn_rate > 0.) {
            return Err(NetworkError::LearnRate(self.learn_rate));
        }

        let target = self.target_batch(target)?;
        let rows = target.nrows();
        let output_layer = self.output_layer();

        {
            let layer = &mut self.layers[output_layer];
            let grads = layer.gradients.as_mut().ok_or(NetworkError::NotTrainable)?;
            grads.errors.fill(0.);
            let mut errors = grads.errors.slice_mut(s![.., ..rows]);
            errors.assign(&target.t());
            errors -= &layer.nodes.slice(s![..rows, ..]).t();
        }

        for i in (0..=output_layer).rev() {
            let activation = self.layers[i].activation;
            activation.backpropagate_error(self, i)?;

            let (done, rest) = self.layers.split_at_mut(i);
            let x = match done.last() {
                Some(prev) => prev.nodes.view(),
                None => self.input.view(),
            };
            rest[0].accumulate(x, self.learn_rate, self.momentum, self.gradient_retention)?;
        }

        for layer in self.layers.iter_mut().rev() {
            layer.update_weights()?;
        }
        Ok(())
    }

    /// Pulls the error of `layer + 1` back through its weights (unless `layer`
    /// is the output) and scales it by this layer's activation derivative.
    pub(crate) fn logistic_backprop(&mut self, layer: usize) -> Result<()> {
        let output_layer = self.output_layer();
        let (head, tail) = self.layers.split_at_mut(layer + 1);
        let current = &mut head[layer];
        let grads = current
            .gradients
            .as_mut()
            .ok_or(NetworkError::NotTrainable)?;

        if layer != output_layer {
            let next = &tail[0];
            let next_grads = next.gradients.as_ref().ok_or(NetworkError::NotTrainable)?;
            general_mat_mul(1., &next.weights, &next_grads.errors, 0., &mut grads.errors);
        }

        current
            .activation
            .apply(current.nodes.view(), grads.derivative.view_mut(), true, true)?;
        grads.errors *= &grads.derivative;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use crate::error::NetworkError;
    use crate::network::{LayerWeights, Network, NetworkConfig};

    fn single_layer(trainable: bool) -> Network {
        let mut config = NetworkConfig::new(vec![2, 1], vec!["sigmoid"], 2);
        config.set_trainable(trainable).set_weights(vec![LayerWeights {
            weights: vec![0.5, -0.5],
            bias: vec![0.],
        }]);
        Network::new(&config).unwrap()
    }

    #[test]
    fn forward_is_repeatable() {
        let mut config = NetworkConfig::new(vec![3, 4, 2], vec!["tanh", "softmax"], 2);
        config.set_seed(5);
        let mut nn = Network::new(&config).unwrap();
        let batch = vec![vec![1., 0.5, -1.], vec![0., 2., 1.]];

        nn.forward(&batch).unwrap();
        let first = nn.output_rows();
        nn.forward(&batch).unwrap();
        assert_eq!(first, nn.output_rows());
    }

    #[test]
    fn short_batch_keeps_trailing_rows() {
        let mut nn = single_layer(false);
        nn.forward(&[vec![1., 0.], vec![0., 1.]]).unwrap();
        let trailing = nn.output()[[1, 0]];

        nn.forward(&[vec![2., 2.]]).unwrap();
        assert_eq!(nn.input().row(1).to_vec(), vec![0., 1.]);
        assert_eq!(nn.output()[[1, 0]], trailing);
        assert_abs_diff_eq!(nn.output()[[0, 0]], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn forward_rejects_oversized_batches() {
        let mut nn = single_layer(false);
        assert!(matches!(
            nn.forward(&vec![vec![1., 0.]; 3]),
            Err(NetworkError::BatchOverflow { rows: 3, batch_size: 2 })
        ));
        assert!(matches!(
            nn.forward(&[vec![1., 0., 0.]]),
            Err(NetworkError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn backward_guards() {
        let mut nn = single_layer(false);
        nn.set_learn_rate(0.1);
        assert!(matches!(nn.backward(&[vec![1.]]), Err(NetworkError::NotTrainable)));

        let mut nn = single_layer(true);
        assert!(matches!(nn.backward(&[vec![1.]]), Err(NetworkError::LearnRate(_))));

        nn.set_learn_rate(0.1);
        assert!(matches!(
            nn.backward(&vec![vec![1.]; 3]),
            Err(NetworkError::BatchOverflow { .. })
        ));
    }

    #[test]
    fn single_step_matches_hand_computation() {
        let mut nn = single_layer(true);
        nn.set_learn_rate(0.5);
        nn.forward(&[vec![1., 1.], vec![0., 0.]]).unwrap();
        nn.backward(&[vec![1.], vec![0.]]).unwrap();

        // Both samples sit at sigmoid(0) = 0.5, derivative 0.25.
        let delta = [0.5 * 0.25, -0.5 * 0.25];
        let layer = &nn.layers()[0];
        assert_abs_diff_eq!(layer.bias[0], delta[0] + delta[1], epsilon = 1e-12);
        assert_abs_diff_eq!(layer.weights[[0, 0]], 0.5 + 0.5 * delta[0], epsilon = 1e-12);
        assert_abs_diff_eq!(layer.weights[[1, 0]], -0.5 + 0.5 * delta[0], epsilon = 1e-12);
    }

    #[test]
    fn missing_target_rows_do_not_contribute() {
        let mut nn = single_layer(true);
        nn.set_learn_rate(0.5);
        nn.forward(&[vec![1., 1.], vec![3., -1.]]).unwrap();
        nn.backward(&[vec![1.]]).unwrap();

        let layer = &nn.layers()[0];
        assert_abs_diff_eq!(layer.bias[0], 0.125, epsilon = 1e-12);
        assert_eq!(
            layer.gradients.as_ref().unwrap().errors.column(1).to_vec(),
            vec![0.]
        );
        assert_abs_diff_eq!(layer.weights[[0, 0]], 0.5625, epsilon = 1e-12);
        assert_abs_diff_eq!(layer.weights[[1, 0]], -0.4375, epsilon = 1e-12);
    }
}
