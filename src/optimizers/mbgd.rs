use log::{debug, info};
use rand::seq::SliceRandom;
use rand::thread_rng;

use super::Hyper;
use crate::error::{NetworkError, Result};
use crate::f;
use crate::network::Network;
use crate::Dataset;

/// Drives a network over a dataset in chunks of its batch size.
pub struct MiniBatchGradientDescent<'a> {
    network: &'a mut Network,
    hyper: Hyper,
    early_terminate: Box<dyn Fn(&[f64]) -> bool>,
    verbose: bool,
    pub losses: Vec<f64>,
}

impl MiniBatchGradientDescent<'_> {
    pub fn new(network: &mut Network) -> MiniBatchGradientDescent<'_> {
        MiniBatchGradientDescent {
            network,
            hyper: Hyper::new(),
            early_terminate: Box::new(|_| false),
            verbose: false,
            losses: vec![],
        }
    }

    pub fn override_hyper(&mut self, hyper: Hyper) -> &mut Self {
        self.hyper = hyper;
        self
    }

    pub fn hyper(&self) -> &Hyper {
        &self.hyper
    }

    pub fn verbose(&mut self) -> &mut Self {
        self.verbose = true;
        self
    }

    pub fn set_learning_rate(&mut self, rate: f64) -> &mut Self {
        self.hyper.learning_rate = rate;
        self
    }

    pub fn set_momentum(&mut self, momentum: f64) -> &mut Self {
        self.hyper.momentum = momentum;
        self
    }

    pub fn set_decay(&mut self, decay: f64) -> &mut Self {
        self.hyper.decay = decay;
        self
    }

    pub fn set_epochs(&mut self, epochs: usize) -> &mut Self {
        self.hyper.epochs = epochs;
        self
    }

    pub fn set_patience(&mut self, patience: usize) -> &mut Self {
        self.hyper.patience = patience;
        self
    }

    pub fn set_min_delta(&mut self, min_delta: f64) -> &mut Self {
        self.hyper.min_delta = min_delta;
        self
    }

    pub fn set_shuffle(&mut self, shuffle: bool) -> &mut Self {
        self.hyper.shuffle = shuffle;
        self
    }

    /// Stops once the mean improvement over the last `patience` epochs falls
    /// below `min_delta`.
    pub fn until(&mut self) -> &mut Self {
        let patience = self.hyper.patience;
        let min_delta = self.hyper.min_delta;

        self.early_terminate = Box::new(move |losses: &[f64]| {
            if patience == 0 || losses.len() < patience + 1 {
                return false;
            }

            let recent = &losses[losses.len() - patience - 1..];
            let avg_delta = recent.windows(2).map(|w| w[0] - w[1]).sum::<f64>() / patience as f64;

            debug!("avg delta {}", avg_delta);
            avg_delta < min_delta
        });
        self
    }

    pub fn until_some(&mut self, early_terminate: impl Fn(&[f64]) -> bool + 'static) -> &mut Self {
        self.early_terminate = Box::new(early_terminate);
        self
    }

    pub fn train(&mut self, data: &Dataset) -> Result<&mut Self> {
        let (x, y) = data;
        check_dataset(data)?;

        let batch_size = self.network.batch_size();
        let uses_loss = self
            .network
            .layers()
            .last()
            .map_or(false, |l| l.activation.has_loss());

        let mut order: Vec<usize> = (0..x.len()).collect();
        let mut rng = thread_rng();

        for epoch in 0..self.hyper.epochs {
            self.network
                .set_learn_rate(self.hyper.learning_rate)
                .set_momentum(self.hyper.momentum);

            if self.hyper.shuffle {
                order.shuffle(&mut rng);
            }

            let mut chunk_losses = Vec::with_capacity(x.len() / batch_size + 1);
            for chunk in order.chunks(batch_size) {
                let batch_x = chunk.iter().map(|&i| x[i].clone()).collect::<Vec<_>>();
                let batch_y = chunk.iter().map(|&i| y[i].clone()).collect::<Vec<_>>();

                self.network.forward(&batch_x)?;
                let loss = if uses_loss {
                    self.network.batch_loss(&batch_y)?
                } else {
                    self.network.mean_squared_error(&batch_y)?
                };
                chunk_losses.push(loss);

                self.network.backward(&batch_y)?;
            }

            let avg_loss = chunk_losses.iter().sum::<f64>() / chunk_losses.len() as f64;
            self.losses.push(avg_loss);
            self.hyper.learning_rate *= self.hyper.decay;

            if self.verbose {
                info!("({}/{}) Loss = {}", epoch + 1, self.hyper.epochs, avg_loss);
            }

            if (self.early_terminate)(&self.losses) {
                info!("early termination condition met after {} epochs", epoch + 1);
                break;
            }
        }

        Ok(self)
    }

    /// Share of samples whose largest output matches the largest target.
    pub fn accuracy(&mut self, data: &Dataset) -> Result<f64> {
        let (x, y) = data;
        check_dataset(data)?;

        let mut correct = 0;
        for (xs, ys) in x
            .chunks(self.network.batch_size())
            .zip(y.chunks(self.network.batch_size()))
        {
            self.network.forward(xs)?;
            correct += self
                .network
                .predictions()
                .into_iter()
                .zip(ys)
                .filter(|(p, t)| *p == f::argmax(t.as_slice().into()))
                .count();
        }

        Ok(correct as f64 / x.len() as f64)
    }
}

fn check_dataset((x, y): &Dataset) -> Result<()> {
    if x.is_empty() || x.len() != y.len() {
        return Err(NetworkError::DimensionMismatch(format!(
            "dataset needs matching non-empty inputs and targets, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NetworkConfig;

    fn network() -> Network {
        let mut config = NetworkConfig::new(vec![2, 4, 2], vec!["tanh", "softmax"], 2);
        config.set_trainable(true).set_seed(3);
        Network::new(&config).unwrap()
    }

    fn dataset() -> Dataset {
        (
            vec![vec![0., 1.], vec![1., 0.], vec![1., 1.]],
            vec![vec![1., 0.], vec![0., 1.], vec![1., 0.]],
        )
    }

    #[test]
    fn records_one_loss_per_epoch() {
        let mut nn = network();
        let mut mbgd = MiniBatchGradientDescent::new(&mut nn);
        mbgd.set_epochs(7).set_decay(0.5).train(&dataset()).unwrap();

        assert_eq!(mbgd.losses.len(), 7);
        assert!(mbgd.losses.iter().all(|l| l.is_finite()));
        assert_eq!(mbgd.hyper().learning_rate, 0.1 * 0.5f64.powi(7));
    }

    #[test]
    fn early_termination_stops_training() {
        let mut nn = network();
        let mut mbgd = MiniBatchGradientDescent::new(&mut nn);
        mbgd.set_epochs(50)
            .until_some(|losses| losses.len() == 3)
            .train(&dataset())
            .unwrap();
        assert_eq!(mbgd.losses.len(), 3);
    }

    #[test]
    fn patience_window() {
        let mut nn = network();
        let mut mbgd = MiniBatchGradientDescent::new(&mut nn);
        mbgd.set_patience(2).set_min_delta(0.1).until();

        assert!(!(mbgd.early_terminate)(&[1.0, 0.5]));
        assert!(!(mbgd.early_terminate)(&[1.0, 0.8, 0.6]));
        assert!((mbgd.early_terminate)(&[1.0, 0.95, 0.9]));
    }

    #[test]
    fn partial_chunks_record_the_same_loss() {
        let mut reference = network();
        reference.set_learn_rate(0.1).set_momentum(0.);
        let (x, y) = dataset();

        reference.forward(&x[..2]).unwrap();
        let full = reference.loss(&y[..2]).unwrap();
        reference.backward(&y[..2]).unwrap();

        reference.forward(&x[2..]).unwrap();
        let hot = ndarray::array![[1., 0.]];
        let partial = f::cross_entropy(reference.output().slice(ndarray::s![..1, ..]), hot.view());
        reference.backward(&y[2..]).unwrap();

        let mut nn = network();
        let mut mbgd = MiniBatchGradientDescent::new(&mut nn);
        mbgd.set_epochs(1).train(&dataset()).unwrap();
        assert_eq!(mbgd.losses, vec![(full + partial) / 2.]);
    }

    #[test]
    fn rejects_ragged_datasets() {
        let mut nn = network();
        let mut mbgd = MiniBatchGradientDescent::new(&mut nn);
        let (x, mut y) = dataset();
        y.pop();
        assert!(matches!(
            mbgd.train(&(x, y)),
            Err(NetworkError::DimensionMismatch(_))
        ));
        assert!(matches!(
            mbgd.accuracy(&(vec![], vec![])),
            Err(NetworkError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn untrainable_networks_fail() {
        let config = NetworkConfig::new(vec![2, 2], vec!["sigmoid"], 2);
        let mut nn = Network::new(&config).unwrap();
        let mut mbgd = MiniBatchGradientDescent::new(&mut nn);
        assert!(matches!(
            mbgd.set_epochs(1).train(&dataset()),
            Err(NetworkError::NotTrainable)
        ));
    }
}
