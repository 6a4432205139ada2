use ndarray::linalg::general_mat_mul;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;

use crate::activation::Activations;
use crate::error::{NetworkError, Result};
use crate::network::GradientRetention;

/// Buffers only a trainable layer carries. Matrices indexed by sample keep the
/// samples as columns.
#[derive(Debug, Clone)]
pub struct Gradients {
    /// `(width, prev_width)`, the transpose of the weights.
    pub delta_weights: Array2<f64>,
    pub delta_weights_prev: Array2<f64>,
    /// `(width, batch_size)`
    pub errors: Array2<f64>,
    /// `(width, batch_size)`
    pub derivative: Array2<f64>,
}

impl Gradients {
    fn new(batch_size: usize, w_shape: (usize, usize)) -> Gradients {
        let (prev, width) = w_shape;
        Gradients {
            delta_weights: Array2::zeros((width, prev)),
            delta_weights_prev: Array2::zeros((width, prev)),
            errors: Array2::zeros((width, batch_size)),
            derivative: Array2::zeros((width, batch_size)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    /// `(batch_size, width)`, pre-activation scratch and then the activated
    /// output of the last forward pass.
    pub nodes: Array2<f64>,
    /// `(prev_width, width)`
    pub weights: Array2<f64>,
    pub bias: Array1<f64>,
    pub activation: Activations,
    pub gradients: Option<Gradients>,
}

impl Layer {
    pub fn new(
        batch_size: usize,
        weights: Array2<f64>,
        bias: Array1<f64>,
        activation: Activations,
        trainable: bool,
    ) -> Layer {
        let w_shape = weights.dim();
        Layer {
            nodes: Array2::zeros((batch_size, w_shape.1)),
            weights,
            bias,
            activation,
            gradients: trainable.then(|| Gradients::new(batch_size, w_shape)),
        }
    }

    /// Layer with weights and bias drawn uniformly from `[-1, 1]`.
    pub fn random<R: Rng + ?Sized>(
        batch_size: usize,
        w_shape: (usize, usize),
        activation: Activations,
        trainable: bool,
        rng: &mut R,
    ) -> Layer {
        let distribution = Uniform::new_inclusive(-1., 1.);
        let bias = Array1::random_using(w_shape.1, distribution, rng);
        let weights = Array2::random_using(w_shape, distribution, rng);
        Layer::new(batch_size, weights, bias, activation, trainable)
    }

    pub fn width(&self) -> usize {
        self.weights.ncols()
    }

    pub fn prev_width(&self) -> usize {
        self.weights.nrows()
    }

    /// `nodes = activation(x . weights + bias)`
    pub fn forward(&mut self, x: ArrayView2<f64>) -> Result<()> {
        general_mat_mul(1., &x, &self.weights, 0., &mut self.nodes);
        self.nodes += &self.bias;
        self.activation.activate(&mut self.nodes)
    }

    /// Turns the layer's delta into a weight step against the input `x` the
    /// layer saw on the forward pass, and moves the bias by the raw delta.
    pub fn accumulate(
        &mut self,
        x: ArrayView2<f64>,
        learn_rate: f64,
        momentum: f64,
        retention: GradientRetention,
    ) -> Result<()> {
        let grads = self.gradients.as_mut().ok_or(NetworkError::NotTrainable)?;

        general_mat_mul(1., &grads.errors, &x, 0., &mut grads.delta_weights);
        grads.delta_weights *= learn_rate;

        // Bias follows the unscaled error of every sample.
        self.bias += &grads.errors.sum_axis(Axis(1));

        match retention {
            GradientRetention::Zero => {
                if momentum > 0. {
                    grads.delta_weights_prev.assign(&grads.delta_weights);
                    grads.delta_weights_prev *= momentum;
                    grads.delta_weights += &grads.delta_weights_prev;
                }
            }
            GradientRetention::Roll => {
                if momentum > 0. {
                    grads
                        .delta_weights
                        .scaled_add(momentum, &grads.delta_weights_prev);
                }
                grads.delta_weights_prev.assign(&grads.delta_weights);
            }
        }
        Ok(())
    }

    pub fn update_weights(&mut self) -> Result<()> {
        let grads = self.gradients.as_ref().ok_or(NetworkError::NotTrainable)?;
        self.weights += &grads.delta_weights.t();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn random_layer_is_shaped_and_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        let layer = Layer::random(4, (3, 5), Activations::Tanh, true, &mut rng);

        assert_eq!(layer.weights.dim(), (3, 5));
        assert_eq!(layer.bias.len(), 5);
        assert_eq!(layer.nodes.dim(), (4, 5));
        assert!(layer.weights.iter().all(|w| (-1. ..=1.).contains(w)));

        let grads = layer.gradients.as_ref().unwrap();
        assert_eq!(grads.delta_weights.dim(), (5, 3));
        assert_eq!(grads.errors.dim(), (5, 4));
        assert_eq!(grads.derivative.dim(), (5, 4));
    }

    #[test]
    fn inference_layer_has_no_gradients() {
        let layer = Layer::new(2, Array2::zeros((2, 2)), Array1::zeros(2), Activations::Sigmoid, false);
        assert!(layer.gradients.is_none());
    }

    #[test]
    fn forward_adds_bias_before_activation() {
        let weights = array![[1., 0.], [0., 1.]];
        let mut layer = Layer::new(1, weights, array![0.5, -0.5], Activations::Sigmoid, false);
        layer.forward(array![[0.5, 0.5]].view()).unwrap();

        assert_abs_diff_eq!(layer.nodes[[0, 0]], 1. / (1. + (-1f64).exp()), epsilon = 1e-12);
        assert_abs_diff_eq!(layer.nodes[[0, 1]], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn momentum_modes() {
        let x = array![[1., 2.]];
        let mut layer = Layer::new(1, Array2::zeros((2, 1)), Array1::zeros(1), Activations::Tanh, true);
        layer.gradients.as_mut().unwrap().errors.fill(1.);

        layer.accumulate(x.view(), 0.1, 0.5, GradientRetention::Zero).unwrap();
        let grads = layer.gradients.as_ref().unwrap();
        assert_abs_diff_eq!(grads.delta_weights[[0, 1]], 0.3, epsilon = 1e-12);
        assert_abs_diff_eq!(layer.bias[0], 1.);

        let mut rolled = Layer::new(1, Array2::zeros((2, 1)), Array1::zeros(1), Activations::Tanh, true);
        rolled.gradients.as_mut().unwrap().errors.fill(1.);
        rolled.accumulate(x.view(), 0.1, 0.5, GradientRetention::Roll).unwrap();
        rolled.accumulate(x.view(), 0.1, 0.5, GradientRetention::Roll).unwrap();
        // 0.2 on the first step, then 0.2 + 0.5 * 0.2
        let grads = rolled.gradients.as_ref().unwrap();
        assert_abs_diff_eq!(grads.delta_weights[[0, 1]], 0.3, epsilon = 1e-12);

        rolled.update_weights().unwrap();
        assert_abs_diff_eq!(rolled.weights[[1, 0]], 0.3, epsilon = 1e-12);
    }
}
