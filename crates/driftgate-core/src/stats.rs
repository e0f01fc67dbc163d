//! Shared numeric kernel.
//!
//! Every statistic the engine reports flows through this module: compensated
//! summation, population mean/variance, the linear-interpolation quantile,
//! median absolute deviation, Pearson correlation, and the 12-decimal
//! rounding applied to all serialized numbers.

/// Decimal digits kept on every serialized numeric output.
pub const REPORT_DECIMALS: i32 = 12;

/// Round to 12 decimal digits for bit-stable reports across platforms.
pub fn round12(x: f64) -> f64 {
    if !x.is_finite() {
        return x;
    }
    let scale = 10f64.powi(REPORT_DECIMALS);
    (x * scale).round() / scale
}

/// Neumaier-compensated sum. Keeps fingerprint statistics stable on long,
/// mixed-magnitude columns.
pub fn compensated_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut comp = 0.0;
    for &v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            comp += (sum - t) + v;
        } else {
            comp += (v - t) + sum;
        }
        sum = t;
    }
    sum + comp
}

/// Arithmetic mean with compensated summation. Returns 0.0 on empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    compensated_sum(values) / values.len() as f64
}

/// Population variance (divides by n) with compensated summation.
pub fn population_variance(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sq: Vec<f64> = values.iter().map(|&x| (x - mean) * (x - mean)).collect();
    compensated_sum(&sq) / values.len() as f64
}

/// Quantile with linear interpolation between order statistics.
///
/// Input must be sorted ascending. `q <= 0` returns the minimum, `q >= 1`
/// the maximum; interior quantiles interpolate the two nearest ranked values
/// at position `(n - 1) * q`.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if q <= 0.0 {
        return sorted[0];
    }
    if q >= 1.0 {
        return sorted[sorted.len() - 1];
    }
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let w = pos - lo as f64;
    sorted[lo] * (1.0 - w) + sorted[hi] * w
}

/// Median absolute deviation: the median of `|x - median|`.
pub fn mad(values: &[f64], median: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut dev: Vec<f64> = values.iter().map(|&x| (x - median).abs()).collect();
    dev.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    quantile(&dev, 0.5)
}

/// Sort a copy ascending. NaN-tolerant comparator, matching the rest of the
/// kernel.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    out
}

/// Pearson correlation over the common prefix of `x` and `y`.
///
/// Fewer than two shared points, or a zero-variance side, yields exactly 0.0
/// rather than a division error.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let x = &x[..n];
    let y = &y[..n];
    let mx = x.iter().sum::<f64>() / n as f64;
    let my = y.iter().sum::<f64>() / n as f64;
    let vx: f64 = x.iter().map(|&a| (a - mx) * (a - mx)).sum();
    let vy: f64 = y.iter().map(|&b| (b - my) * (b - my)).sum();
    if vx <= 0.0 || vy <= 0.0 {
        return 0.0;
    }
    let cov: f64 = x.iter().zip(y).map(|(&a, &b)| (a - mx) * (b - my)).sum();
    cov / (vx * vy).sqrt()
}
