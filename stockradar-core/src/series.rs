//! Rolling series math shared by factors, strategies and the market data processor.
//!
//! Every function returns a vector the same length as its input. Positions
//! without a full window (warmup) or touching a NaN input are NaN; no value at
//! index t depends on inputs after t.

/// Simple moving average over `window` values.
pub fn sma(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    let mut sum = 0.0;
    let mut nan_count = 0usize;
    for (i, &entering) in values.iter().enumerate() {
        if entering.is_nan() {
            nan_count += 1;
        } else {
            sum += entering;
        }
        if i >= window {
            let leaving = values[i - window];
            if leaving.is_nan() {
                nan_count -= 1;
            } else {
                sum -= leaving;
            }
        }
        if i + 1 >= window && nan_count == 0 {
            result[i] = sum / window as f64;
        }
    }
    result
}

/// Percentage change over `period` values:
/// `(x[t] - x[t-period]) / x[t-period] * 100`.
pub fn rate_of_change(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }
    for i in period..n {
        let prev = values[i - period];
        let curr = values[i];
        if !(prev.is_nan() || curr.is_nan() || prev == 0.0) {
            result[i] = (curr - prev) / prev * 100.0;
        }
    }
    result
}

/// One-step fractional change: `x[t] / x[t-1] - 1`. First value is NaN.
///
/// A zero previous value yields an infinite change, which the processor's
/// quality check is there to catch.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        let prev = values[i - 1];
        let curr = values[i];
        if !(prev.is_nan() || curr.is_nan()) {
            result[i] = curr / prev - 1.0;
        }
    }
    result
}

/// Rolling sample standard deviation (n - 1 denominator) over `window` values.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window < 2 || n < window {
        return result;
    }
    for i in (window - 1)..n {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        result[i] = var.sqrt();
    }
    result
}

/// Assert two f64 values are approximately equal.
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
