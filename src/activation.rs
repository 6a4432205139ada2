use ndarray::{Array2, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{NetworkError, Result};
use crate::f;
use crate::network::Network;

/// Activation applied by a layer after its affine step.
///
/// Every variant is stateless, so one value is freely copied into each layer
/// that uses it. Derivatives are expressed in terms of the activated output.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activations {
    Tanh,
    Sigmoid,
    Softmax,
    /// Softmax over `split` equal, contiguous slices of each row.
    SplitSoftmax { split: usize },
}

impl Activations {
    pub fn from_name(name: &str, split_factor: usize) -> Result<Activations> {
        match name {
            "tanh" => Ok(Activations::Tanh),
            "sigmoid" => Ok(Activations::Sigmoid),
            "softmax" => Ok(Activations::Softmax),
            "splitsoftmax" | "split_softmax" => Ok(Activations::SplitSoftmax {
                split: split_factor,
            }),
            _ => Err(NetworkError::UnknownActivation(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activations::Tanh => "tanh",
            Activations::Sigmoid => "sigmoid",
            Activations::Softmax => "softmax",
            Activations::SplitSoftmax { .. } => "splitsoftmax",
        }
    }

    fn fits(&self, width: usize) -> bool {
        match *self {
            Activations::SplitSoftmax { split } => split != 0 && width % split == 0,
            _ => true,
        }
    }

    /// Checks that the activation of `layer` can run over rows of `width`
    /// values.
    pub fn validate(&self, layer: usize, width: usize) -> Result<()> {
        match *self {
            Activations::SplitSoftmax { split } if !self.fits(width) => {
                Err(NetworkError::SplitFactor {
                    layer,
                    width,
                    split,
                })
            }
            _ => Ok(()),
        }
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if self.fits(width) {
            return Ok(());
        }
        Err(NetworkError::DimensionMismatch(format!(
            "{} cannot run over rows of {} values",
            self.name(),
            width
        )))
    }

    pub fn has_loss(&self) -> bool {
        matches!(
            self,
            Activations::Softmax | Activations::SplitSoftmax { .. }
        )
    }

    fn transform(&self, mut row: ArrayViewMut1<f64>, derivative: bool) {
        match *self {
            Activations::Tanh if derivative => row.mapv_inplace(f::tanh_derivative),
            Activations::Tanh => row.mapv_inplace(f::tanh),
            Activations::Sigmoid if derivative => row.mapv_inplace(f::sigmoid_derivative),
            Activations::Sigmoid => row.mapv_inplace(f::sigmoid),
            Activations::Softmax if derivative => f::softmax_prime(row),
            Activations::Softmax => f::softmax(row),
            Activations::SplitSoftmax { split } => {
                let slice = row.len() / split;
                for chunk in row.axis_chunks_iter_mut(Axis(0), slice) {
                    if derivative {
                        f::softmax_prime(chunk);
                    } else {
                        f::softmax(chunk);
                    }
                }
            }
        }
    }

    /// Activates every row of `nodes` in place.
    pub fn activate(&self, nodes: &mut Array2<f64>) -> Result<()> {
        self.check_width(nodes.ncols())?;
        for row in nodes.rows_mut() {
            self.transform(row, false);
        }
        Ok(())
    }

    /// Writes the activation (or its derivative) of each row of `input` to
    /// `output`. With `transpose`, row `i` of `input` lands in column `i` of
    /// `output`, so `output` must be shaped as the transpose of `input`.
    pub fn apply(
        &self,
        input: ArrayView2<f64>,
        mut output: ArrayViewMut2<f64>,
        derivative: bool,
        transpose: bool,
    ) -> Result<()> {
        let (rows, cols) = input.dim();
        let expected = if transpose { (cols, rows) } else { (rows, cols) };
        if output.dim() != expected {
            return Err(NetworkError::shape("activation output", expected, output.dim()));
        }
        self.check_width(cols)?;

        for (i, row) in input.outer_iter().enumerate() {
            let mut row = row.to_owned();
            self.transform(row.view_mut(), derivative);
            if transpose {
                output.column_mut(i).assign(&row);
            } else {
                output.row_mut(i).assign(&row);
            }
        }
        Ok(())
    }

    /// Turns the error signal of `layer` (already holding the output error
    /// or ready to receive the next layer's) into its delta.
    pub fn backpropagate_error(&self, network: &mut Network, layer: usize) -> Result<()> {
        match self {
            Activations::Tanh
            | Activations::Sigmoid
            | Activations::Softmax
            | Activations::SplitSoftmax { .. } => network.logistic_backprop(layer),
        }
    }

    /// Batch loss of `output` against `target`; zero where the activation has
    /// no natural loss.
    pub fn layer_loss(&self, output: ArrayView2<f64>, target: ArrayView2<f64>) -> Result<f64> {
        if !self.has_loss() {
            return Ok(0.);
        }
        if output.dim() != target.dim() {
            return Err(NetworkError::shape("loss target", output.dim(), target.dim()));
        }
        Ok(f::cross_entropy(output, target))
    }
}
