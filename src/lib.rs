mod activation;
pub mod error;
pub mod f;
pub mod layers;
pub mod network;
pub mod optimizers;

pub use activation::Activations;
pub use error::{NetworkError, Result};
pub use network::{GradientRetention, LayerWeights, Network, NetworkConfig, NetworkSnapshot};
pub use optimizers::{Hyper, MiniBatchGradientDescent};

/// Input rows paired with target rows.
pub type Dataset = (Vec<Vec<f64>>, Vec<Vec<f64>>);
