use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::activation::Activations;
use crate::error::{NetworkError, Result};

/// Weights and bias of one layer. `weights` is row-major with shape
/// `(prev_width, width)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LayerWeights {
    pub weights: Vec<f64>,
    pub bias: Vec<f64>,
}

pub(crate) fn default_split_factor() -> usize {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NetworkConfig {
    /// Input width followed by the width of every layer.
    pub node_counts: Vec<usize>,
    /// One activation name per layer.
    pub activations: Vec<String>,
    pub batch_size: usize,
    #[serde(default)]
    pub trainable: bool,
    #[serde(default = "default_split_factor")]
    pub split_factor: usize,
    #[serde(default)]
    pub weights: Option<Vec<LayerWeights>>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl NetworkConfig {
    pub fn new<S: Into<String>>(
        node_counts: Vec<usize>,
        activations: Vec<S>,
        batch_size: usize,
    ) -> NetworkConfig {
        NetworkConfig {
            node_counts,
            activations: activations.into_iter().map(Into::into).collect(),
            batch_size,
            trainable: false,
            split_factor: default_split_factor(),
            weights: None,
            seed: None,
        }
    }

    pub fn from_json(serialized: &str) -> Result<NetworkConfig> {
        Ok(serde_json::from_str(serialized)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<NetworkConfig> {
        NetworkConfig::from_json(&fs::read_to_string(path)?)
    }

    pub fn set_trainable(&mut self, trainable: bool) -> &mut Self {
        self.trainable = trainable;
        self
    }

    pub fn set_split_factor(&mut self, split_factor: usize) -> &mut Self {
        self.split_factor = split_factor;
        self
    }

    pub fn set_weights(&mut self, weights: Vec<LayerWeights>) -> &mut Self {
        self.weights = Some(weights);
        self
    }

    pub fn set_seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// `(prev_width, width)` of every layer.
    pub fn weight_shapes(&self) -> Vec<(usize, usize)> {
        self.node_counts.windows(2).map(|w| (w[0], w[1])).collect()
    }

    /// Runs every construction check in order and resolves the activation
    /// names. Nothing is allocated until this passes.
    pub fn validate(&self) -> Result<Vec<Activations>> {
        if self.node_counts.len() < 2 {
            return Err(NetworkError::LayersCount {
                count: self.node_counts.len(),
            });
        }

        let layers = self.node_counts.len() - 1;
        if self.activations.len() != layers {
            return Err(NetworkError::ActivationCount {
                expected: layers,
                actual: self.activations.len(),
            });
        }

        if self.batch_size == 0 {
            return Err(NetworkError::BatchSize {
                batch_size: self.batch_size,
            });
        }

        for (i, count) in self.node_counts.iter().enumerate() {
            if *count == 0 {
                return Err(NetworkError::PositiveValue {
                    name: format!("node count {}", i),
                    value: *count,
                });
            }
        }
        if self.split_factor == 0 {
            return Err(NetworkError::PositiveValue {
                name: "split factor".to_string(),
                value: self.split_factor,
            });
        }

        let activations = self
            .activations
            .iter()
            .map(|name| Activations::from_name(name, self.split_factor))
            .collect::<Result<Vec<Activations>>>()?;

        for (layer, (activation, width)) in activations
            .iter()
            .zip(self.node_counts[1..].iter())
            .enumerate()
        {
            activation.validate(layer, *width)?;
        }

        if let Some(weights) = &self.weights {
            self.validate_weights(weights)?;
        }

        Ok(activations)
    }

    fn validate_weights(&self, weights: &[LayerWeights]) -> Result<()> {
        let shapes = self.weight_shapes();
        if weights.len() != shapes.len() {
            return Err(NetworkError::WeightMismatch {
                layer: weights.len().min(shapes.len()),
                reason: format!("expected {} layers, got {}", shapes.len(), weights.len()),
            });
        }

        for (layer, (w, (prev, width))) in weights.iter().zip(shapes).enumerate() {
            if w.weights.len() != prev * width {
                return Err(NetworkError::WeightMismatch {
                    layer,
                    reason: format!(
                        "expected {} weights for {}x{}, got {}",
                        prev * width,
                        prev,
                        width,
                        w.weights.len()
                    ),
                });
            }
            if w.bias.len() != width {
                return Err(NetworkError::WeightMismatch {
                    layer,
                    reason: format!("expected {} biases, got {}", width, w.bias.len()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_order() {
        let config = NetworkConfig::new(vec![5], Vec::<String>::new(), 0);
        assert!(matches!(config.validate(), Err(NetworkError::LayersCount { count: 1 })));

        let config = NetworkConfig::new(vec![3, 2], Vec::<String>::new(), 0);
        assert!(matches!(
            config.validate(),
            Err(NetworkError::ActivationCount { expected: 1, actual: 0 })
        ));

        let config = NetworkConfig::new(vec![3, 0], vec!["relu6000"], 0);
        assert!(matches!(config.validate(), Err(NetworkError::BatchSize { .. })));

        let config = NetworkConfig::new(vec![3, 0], vec!["relu6000"], 1);
        assert!(matches!(config.validate(), Err(NetworkError::PositiveValue { .. })));

        let config = NetworkConfig::new(vec![3, 2], vec!["relu6000"], 1);
        assert!(matches!(config.validate(), Err(NetworkError::UnknownActivation(_))));
    }

    #[test]
    fn split_factor_checks() {
        let mut config = NetworkConfig::new(vec![3, 4], vec!["splitsoftmax"], 1);
        config.set_split_factor(0);
        assert!(matches!(config.validate(), Err(NetworkError::PositiveValue { .. })));

        config.set_split_factor(3);
        assert!(matches!(
            config.validate(),
            Err(NetworkError::SplitFactor { layer: 0, width: 4, split: 3 })
        ));

        config.set_split_factor(2);
        assert_eq!(
            config.validate().unwrap(),
            vec![Activations::SplitSoftmax { split: 2 }]
        );
    }

    #[test]
    fn imported_weights_must_match_topology() {
        let mut config = NetworkConfig::new(vec![2, 1], vec!["sigmoid"], 1);
        config.set_weights(vec![LayerWeights {
            weights: vec![0.5, 0.5, 0.5],
            bias: vec![0.],
        }]);
        assert!(matches!(
            config.validate(),
            Err(NetworkError::WeightMismatch { layer: 0, .. })
        ));

        config.set_weights(vec![LayerWeights {
            weights: vec![0.5, 0.5],
            bias: vec![0., 1.],
        }]);
        assert!(matches!(config.validate(), Err(NetworkError::WeightMismatch { .. })));

        config.set_weights(vec![]);
        assert!(matches!(config.validate(), Err(NetworkError::WeightMismatch { .. })));
    }

    #[test]
    fn parses_json_with_defaults() {
        let config = NetworkConfig::from_json(
            r#"{"node_counts": [3, 4, 2], "activations": ["tanh", "softmax"], "batch_size": 3}"#,
        )
        .unwrap();
        assert!(!config.trainable);
        assert_eq!(config.split_factor, 1);
        assert!(config.weights.is_none());
        assert_eq!(config.weight_shapes(), vec![(3, 4), (4, 2)]);
    }
}
