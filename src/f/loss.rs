use ndarray::{ArrayView2, Zip};

/// Negative log-likelihood of the classes marked with exactly 1.0, averaged
/// over the rows.
pub fn cross_entropy(output: ArrayView2<f64>, target: ArrayView2<f64>) -> f64 {
    let mut loss = 0.;
    Zip::from(&output).and(&target).for_each(|p, t| {
        if *t == 1. {
            loss -= p.ln();
        }
    });
    loss / output.nrows() as f64
}

/// Summed squared difference, averaged over the rows.
pub fn mean_squared_error(output: ArrayView2<f64>, target: ArrayView2<f64>) -> f64 {
    let mut loss = 0.;
    Zip::from(&output).and(&target).for_each(|p, t| {
        loss += (p - t).powi(2);
    });
    loss / output.nrows() as f64
}

pub fn max_absolute_error(output: ArrayView2<f64>, target: ArrayView2<f64>) -> f64 {
    let mut max: f64 = 0.;
    Zip::from(&output).and(&target).for_each(|p, t| {
        max = max.max((t - p).abs());
    });
    max
}
