use thiserror::Error;

pub type Result<T> = std::result::Result<T, NetworkError>;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("the number of layers should be greater than 1, got {count}")]
    LayersCount { count: usize },

    #[error("the layers need {expected} activation functions, got {actual}")]
    ActivationCount { expected: usize, actual: usize },

    #[error("batch size should be bigger than 0, got {batch_size}")]
    BatchSize { batch_size: usize },

    #[error("all values have to be positive, {name} is {value}")]
    PositiveValue { name: String, value: usize },

    #[error("unknown activation function {0:?}")]
    UnknownActivation(String),

    #[error("split factor {split} does not divide layer {layer} of width {width}")]
    SplitFactor {
        layer: usize,
        width: usize,
        split: usize,
    },

    #[error("imported weights for layer {layer} mismatch: {reason}")]
    WeightMismatch { layer: usize, reason: String },

    #[error("{rows} rows do not fit in a batch of {batch_size}")]
    BatchOverflow { rows: usize, batch_size: usize },

    #[error("network does not support training")]
    NotTrainable,

    #[error("learn rate has to be greater than 0, got {0}")]
    LearnRate(f64),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("network layers mismatch: expected {expected}, got {actual}")]
    LayerMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl NetworkError {
    pub(crate) fn shape(context: &str, expected: (usize, usize), actual: (usize, usize)) -> Self {
        NetworkError::DimensionMismatch(format!(
            "{} expected {}x{}, got {}x{}",
            context, expected.0, expected.1, actual.0, actual.1
        ))
    }
}
