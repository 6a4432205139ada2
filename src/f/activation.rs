/// Largest argument for which `exp` stays finite.
pub const EXP_MAX: f64 = 709.782712893384;
/// Smallest argument for which `exp` stays above zero.
pub const EXP_MIN: f64 = -745.1332191019411;

pub fn prevent_overflow(x: f64) -> f64 {
    x.clamp(EXP_MIN, EXP_MAX)
}

pub fn sigmoid(x: f64) -> f64 {
    1. / (1. + (-x).exp())
}

pub fn sigmoid_derivative(y: f64) -> f64 {
    y * (1. - y)
}

/// Rational approximation of tanh, saturating to +-1 beyond |x| > 3.
pub fn tanh(x: f64) -> f64 {
    if x < -3. {
        return -1.;
    }
    if x > 3. {
        return 1.;
    }
    let sq = x * x;
    x * (27. + sq) / (27. + 9. * sq)
}

pub fn tanh_derivative(y: f64) -> f64 {
    1. - y * y
}

/// `exp` of a clamped value, shifted by the (already clamped) row maximum.
pub fn softmax_exp(x: f64, max: f64) -> f64 {
    (prevent_overflow(x) - max).exp()
}

pub fn softmax_derivative(y: f64) -> f64 {
    y * (1. - y)
}
