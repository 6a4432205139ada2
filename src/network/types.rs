use serde::{Deserialize, Serialize};

/// How the momentum buffer evolves between backward passes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradientRetention {
    /// Carry the previous step's weight delta into the next one.
    Roll,
    /// Rebuild the momentum term from the current gradient on every step, so
    /// each step is the gradient scaled by `1 + momentum`.
    #[default]
    Zero,
}
