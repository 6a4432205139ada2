use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use super::config::default_split_factor;
use super::{LayerWeights, Network, NetworkConfig};
use crate::error::{NetworkError, Result};

/// Topology and weights of a network. Batch size and trainability are chosen
/// again on import.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NetworkSnapshot {
    pub node_counts: Vec<usize>,
    pub activations: Vec<String>,
    #[serde(default = "default_split_factor")]
    pub split_factor: usize,
    pub layers: Vec<LayerWeights>,
}

impl NetworkSnapshot {
    pub fn dump(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(serialized: &str) -> Result<NetworkSnapshot> {
        Ok(serde_json::from_str(serialized)?)
    }

    /// Checks the stored arrays against the stored topology.
    pub fn validate(&self) -> Result<()> {
        if self.node_counts.len() < 2 {
            return Err(NetworkError::LayersCount {
                count: self.node_counts.len(),
            });
        }

        let expected = self.node_counts.len() - 1;
        if self.activations.len() != expected {
            return Err(NetworkError::ActivationCount {
                expected,
                actual: self.activations.len(),
            });
        }
        if self.layers.len() != expected {
            return Err(NetworkError::LayerMismatch {
                expected,
                actual: self.layers.len(),
            });
        }

        for (i, (layer, w)) in self
            .layers
            .iter()
            .zip(self.node_counts.windows(2))
            .enumerate()
        {
            let (prev, width) = (w[0], w[1]);
            if layer.weights.len() != prev * width {
                return Err(NetworkError::DimensionMismatch(format!(
                    "layer {} stores {} weights, topology needs {}x{}",
                    i,
                    layer.weights.len(),
                    prev,
                    width
                )));
            }
            if layer.bias.len() != width {
                return Err(NetworkError::DimensionMismatch(format!(
                    "layer {} stores {} biases, topology needs {}",
                    i,
                    layer.bias.len(),
                    width
                )));
            }
        }
        Ok(())
    }

    pub fn into_config(self, batch_size: usize, trainable: bool) -> NetworkConfig {
        let mut config = NetworkConfig::new(self.node_counts, self.activations, batch_size);
        config
            .set_trainable(trainable)
            .set_split_factor(self.split_factor)
            .set_weights(self.layers);
        config
    }
}

impl Network {
    pub fn export_state(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            node_counts: self.node_counts.clone(),
            activations: self
                .layers
                .iter()
                .map(|l| l.activation.name().to_string())
                .collect(),
            split_factor: self.split_factor,
            layers: self
                .layers
                .iter()
                .map(|l| LayerWeights {
                    weights: l.weights.iter().cloned().collect(),
                    bias: l.bias.to_vec(),
                })
                .collect(),
        }
    }

    pub fn import_state(
        snapshot: &NetworkSnapshot,
        batch_size: usize,
        trainable: bool,
    ) -> Result<Network> {
        snapshot.validate()?;
        Network::new(&snapshot.clone().into_config(batch_size, trainable))
    }

    pub fn export<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), self.export_state().dump()?)?;
        info!("exported network to {}", path.as_ref().display());
        Ok(())
    }

    pub fn import<P: AsRef<Path>>(path: P, batch_size: usize, trainable: bool) -> Result<Network> {
        let snapshot = NetworkSnapshot::load(&fs::read_to_string(path.as_ref())?)?;
        info!("imported network from {}", path.as_ref().display());
        Network::import_state(&snapshot, batch_size, trainable)
    }
}
