mod mbgd;

pub use mbgd::MiniBatchGradientDescent;

#[derive(Clone, Debug, PartialEq)]
pub struct Hyper {
    pub epochs: usize,
    pub learning_rate: f64,
    pub momentum: f64,
    /// Multiplies the learning rate after every epoch.
    pub decay: f64,
    pub patience: usize,
    pub min_delta: f64,
    pub shuffle: bool,
}

impl Hyper {
    pub fn new() -> Hyper {
        Hyper {
            epochs: 1000,
            learning_rate: 0.1,
            momentum: 0.,
            decay: 1.,
            patience: 0,
            min_delta: 0.,
            shuffle: false,
        }
    }
}

impl Default for Hyper {
    fn default() -> Self {
        Hyper::new()
    }
}
