//! Small numeric helpers shared by the price-only analyzers.

use crate::error::AnalyzerError;
use core_types::PriceBar;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

pub const TRADING_DAYS: f64 = 252.0;

pub fn to_f64(value: Decimal, field: &str) -> Result<f64, AnalyzerError> {
    value
        .to_f64()
        .ok_or_else(|| AnalyzerError::IndicatorError(format!("Failed to convert {field} to f64")))
}

pub fn closes(bars: &[PriceBar]) -> Result<Vec<f64>, AnalyzerError> {
    bars.iter().map(|b| to_f64(b.close, "close")).collect()
}

/// Day-over-day fractional changes. The output is one shorter than the input.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] != 0.0 { w[1] / w[0] - 1.0 } else { 0.0 })
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). Zero when fewer than two values exist.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

pub fn sample_cov(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (ma, mb) = (mean(&a[..n]), mean(&b[..n]));
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - ma) * (y - mb))
        .sum::<f64>()
        / (n - 1) as f64
}

/// Linear-interpolated percentile, `q` in [0, 100].
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn annualized_volatility(returns: &[f64]) -> f64 {
    sample_std(returns) * TRADING_DAYS.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pct_changes_of_doubling_series() {
        assert_eq!(pct_changes(&[1.0, 2.0, 4.0]), vec![1.0, 1.0]);
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        assert_relative_eq!(sample_std(&[1.0, 2.0, 3.0, 4.0]), 1.2909944487358056);
        assert_eq!(sample_std(&[5.0]), 0.0);
    }

    #[test]
    fn percentile_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&data, 5.0), 1.2);
        assert_relative_eq!(percentile(&data, 50.0), 3.0);
    }
}
