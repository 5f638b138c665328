/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the weighted mean `Σwᵢvᵢ / Σwᵢ`. Returns 0.0 when the total
/// weight is zero.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let w_sum: f64 = weights.iter().sum();
    if w_sum == 0.0 {
        return 0.0;
    }
    values
        .iter()
        .zip(weights)
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / w_sum
}
