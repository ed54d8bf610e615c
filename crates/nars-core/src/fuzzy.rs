//! Fuzzy combinators on values in [0, 1].
//!
//! `or` pulls toward 1 in proportion to the remaining headroom, `and` pulls
//! toward 0 in proportion to the current value. Both are closed on [0, 1].

/// Probabilistic sum: `a + b - a·b`.
pub fn or(a: f32, b: f32) -> f32 {
    1.0 - (1.0 - a) * (1.0 - b)
}

/// Product.
pub fn and(a: f32, b: f32) -> f32 {
    a * b
}

/// Arithmetic mean.
pub fn ave_ari(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Geometric mean. Any zero component yields zero.
pub fn ave_geo(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let product: f32 = values.iter().product();
    product.max(0.0).powf(1.0 / values.len() as f32)
}

/// Clamp into [0, 1], mapping NaN to 0.
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
