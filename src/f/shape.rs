use ndarray::{ArrayView1, ArrayViewMut1};
use ndarray_stats::QuantileExt;

use super::{prevent_overflow, softmax_derivative, softmax_exp};

/// Smallest positive subnormal double, substituted for `NaN` quotients.
pub const MIN_POSITIVE_SUBNORMAL: f64 = 4.940656458412465e-324;

pub fn guarded_division(a: f64, b: f64) -> f64 {
    let q = a / b;
    if q.is_nan() {
        return MIN_POSITIVE_SUBNORMAL;
    }
    q
}

/// Scales `row` so it sums to 1.
pub fn normalize(mut row: ArrayViewMut1<f64>) {
    let sum = row.sum();
    row.mapv_inplace(|v| guarded_division(v, sum));
}

pub fn softmax(mut row: ArrayViewMut1<f64>) {
    let max = row.fold(f64::MIN, |a, v| {
        let v = prevent_overflow(*v);
        if v > a {
            return v;
        }
        a
    });
    row.mapv_inplace(|v| softmax_exp(v, max));
    normalize(row);
}

pub fn softmax_prime(mut row: ArrayViewMut1<f64>) {
    row.mapv_inplace(softmax_derivative);
    normalize(row);
}

pub fn argmax(row: ArrayView1<f64>) -> usize {
    row.argmax().unwrap_or(0)
}
