//! Gamma distribution fitting for daily spend
//!
//! Daily discretionary spend is non-negative and right-skewed, so it is
//! modelled as Gamma(shape k, loc 0, scale θ). The shape is the maximum
//! likelihood estimate, i.e. the root of
//!
//! ```text
//! ln k − ψ(k) = ln(mean(x)) − mean(ln x)
//! ```
//!
//! and the scale follows as `mean(x) / k`. Any failure to fit (too few points,
//! non-positive data, identical values, no convergence) yields `None` so the
//! caller can fall back to a coarser model. Near-identical values are a valid
//! fit with a very large shape and a tight band.

use statrs::distribution::{ContinuousCDF, Gamma};
use statrs::function::erf::erf_inv;
use statrs::function::gamma::digamma;
use tracing::debug;

use crate::config::FitConfig;

/// Above this shape the Wilson–Hilferty cube-root normal approximation is used
/// for quantiles, since the incomplete gamma series converges too slowly
const LARGE_SHAPE: f64 = 1e5;
const MAX_SHAPE_ITERATIONS: usize = 100;
const MAX_BRACKET_STEPS: usize = 200;
const SHAPE_TOLERANCE: f64 = 1e-10;
const QUANTILE_ITERATIONS: usize = 200;
const QUANTILE_TOLERANCE: f64 = 1e-12;

/// Point estimate with low/high percentile bounds for one day
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpendEstimate {
    pub mean: f64,
    pub low: f64,
    pub high: f64,
}

impl SpendEstimate {
    pub const ZERO: SpendEstimate = SpendEstimate {
        mean: 0.0,
        low: 0.0,
        high: 0.0,
    };

    /// Flat estimate from a raw mean and fixed percentile factors
    pub fn flat(mean: f64, low_factor: f64, high_factor: f64) -> Self {
        Self {
            mean,
            low: mean * low_factor,
            high: mean * high_factor,
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self {
            mean: self.mean * factor,
            low: self.low * factor,
            high: self.high * factor,
        }
    }

    /// Clamp the low bound at zero and round everything to cents
    pub fn finalize(self) -> Self {
        Self {
            mean: round_cents(self.mean),
            low: round_cents(self.low.max(0.0)),
            high: round_cents(self.high),
        }
    }
}

/// Round to cents, ties to even
fn round_cents(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// A fitted Gamma distribution with location fixed at zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaModel {
    shape: f64,
    scale: f64,
    dist: Gamma,
}

impl GammaModel {
    /// Returns `None` unless both parameters are finite and positive
    pub fn new(shape: f64, scale: f64) -> Option<Self> {
        if !(shape.is_finite() && shape > 0.0 && scale.is_finite() && scale > 0.0) {
            return None;
        }
        let dist = Gamma::new(shape, 1.0 / scale).ok()?;
        Some(Self { shape, scale, dist })
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn mean(&self) -> f64 {
        self.shape * self.scale
    }

    pub fn cdf(&self, x: f64) -> f64 {
        self.dist.cdf(x)
    }

    /// Inverse CDF by bisection on the statrs CDF, or Wilson–Hilferty for
    /// very large shapes
    pub fn quantile(&self, p: f64) -> f64 {
        if p <= 0.0 {
            return 0.0;
        }
        if p >= 1.0 {
            return f64::INFINITY;
        }
        if self.shape > LARGE_SHAPE {
            let z = std::f64::consts::SQRT_2 * erf_inv(2.0 * p - 1.0);
            let c = 1.0 / (9.0 * self.shape);
            return self.mean() * (1.0 - c + z * c.sqrt()).powi(3).max(0.0);
        }

        let mut lo = 0.0;
        let mut hi = self.mean().max(f64::MIN_POSITIVE);
        for _ in 0..MAX_BRACKET_STEPS {
            if self.cdf(hi) >= p {
                break;
            }
            lo = hi;
            hi *= 2.0;
        }

        for _ in 0..QUANTILE_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            if self.cdf(mid) < p {
                lo = mid;
            } else {
                hi = mid;
            }
            if hi - lo <= QUANTILE_TOLERANCE * hi {
                break;
            }
        }
        0.5 * (lo + hi)
    }

    /// Mean plus the two percentile bounds.
    ///
    /// For extreme shapes the Gamma mean can fall outside the percentile band,
    /// so the bounds are widened to always bracket the mean.
    pub fn estimate(&self, low_quantile: f64, high_quantile: f64) -> SpendEstimate {
        let mean = self.mean();
        SpendEstimate {
            mean,
            low: self.quantile(low_quantile).min(mean),
            high: self.quantile(high_quantile).max(mean),
        }
    }
}

/// Fits Gamma models to daily totals with outlier trimming
#[derive(Debug, Clone, Default)]
pub struct DistributionFitter {
    config: FitConfig,
}

impl DistributionFitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FitConfig) -> Self {
        Self { config }
    }

    /// Fit a Gamma model, or `None` when no valid fit exists
    pub fn fit(&self, values: &[f64]) -> Option<GammaModel> {
        if values.len() < 2 {
            return None;
        }

        let sample = trim_outliers(values, self.config.outlier_sigma);
        if sample.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            debug!("Gamma fit skipped: sample contains non-positive values");
            return None;
        }

        let n = sample.len() as f64;
        let mean = sample.iter().sum::<f64>() / n;
        let mean_log = sample.iter().map(|v| v.ln()).sum::<f64>() / n;
        let spread = mean.ln() - mean_log;

        if sample.iter().all(|v| *v == sample[0]) {
            debug!("Gamma fit skipped: {} values are identical", sample.len());
            return None;
        }
        if !(spread.is_finite() && spread > 0.0) {
            debug!("Gamma fit skipped: log-spread {:.3e} is not positive", spread);
            return None;
        }

        let Some(shape) = solve_shape(spread) else {
            debug!("Gamma fit failed: shape did not converge (spread {:.3e})", spread);
            return None;
        };

        let model = GammaModel::new(shape, mean / shape);
        if model.is_none() {
            debug!("Gamma fit rejected: shape {} scale {}", shape, mean / shape);
        }
        model
    }

    /// Fit and derive the percentile estimate in one step
    pub fn fit_estimate(&self, values: &[f64]) -> Option<SpendEstimate> {
        self.fit(values)
            .map(|m| m.estimate(self.config.low_quantile, self.config.high_quantile))
    }
}

/// Drop values above `mean + sigma * std` (population std over the full set).
///
/// Reverts to the untrimmed values if fewer than two would remain.
pub fn trim_outliers(values: &[f64], sigma: f64) -> Vec<f64> {
    let (mean, std) = mean_and_std(values);
    let cutoff = mean + sigma * std;
    let kept: Vec<f64> = values.iter().copied().filter(|v| *v <= cutoff).collect();
    if kept.len() < 2 {
        values.to_vec()
    } else {
        kept
    }
}

/// Mean and population standard deviation
pub fn mean_and_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Solve `ln k − ψ(k) = spread` for k > 0.
///
/// Newton iteration from the Choi–Wette closed-form start, kept inside a
/// bracket that is bisected whenever a Newton step escapes it.
fn solve_shape(spread: f64) -> Option<f64> {
    let f = |k: f64| k.ln() - digamma(k) - spread;

    let start = (3.0 - spread + ((spread - 3.0).powi(2) + 24.0 * spread).sqrt()) / (12.0 * spread);
    if !(start.is_finite() && start > 0.0) {
        return None;
    }

    // f is strictly decreasing: positive left of the root, negative right of it
    let (mut lo, mut hi) = (start, start);
    let mut steps = 0;
    while f(lo) <= 0.0 {
        lo /= 2.0;
        steps += 1;
        if steps > MAX_BRACKET_STEPS || lo <= 0.0 {
            return None;
        }
    }
    while f(hi) >= 0.0 {
        hi *= 2.0;
        steps += 1;
        if steps > MAX_BRACKET_STEPS || !hi.is_finite() {
            return None;
        }
    }

    let mut k = start;
    for _ in 0..MAX_SHAPE_ITERATIONS {
        let value = f(k);
        if value > 0.0 {
            lo = k;
        } else {
            hi = k;
        }

        let slope = 1.0 / k - trigamma(k);
        let mut next = k - value / slope;
        if !(next.is_finite() && next > lo && next < hi) {
            next = (lo * hi).sqrt();
        }

        if (next - k).abs() <= SHAPE_TOLERANCE * k || hi - lo <= SHAPE_TOLERANCE * k {
            return Some(next);
        }
        k = next;
    }
    None
}

/// Trigamma function ψ'(x) for x > 0
fn trigamma(x: f64) -> f64 {
    let mut x = x;
    let mut acc = 0.0;
    while x < 10.0 {
        acc += 1.0 / (x * x);
        x += 1.0;
    }
    let inv = 1.0 / x;
    let inv2 = inv * inv;
    acc + inv
        + inv2 / 2.0
        + inv * inv2 * (1.0 / 6.0 - inv2 * (1.0 / 30.0 - inv2 * (1.0 / 42.0 - inv2 / 30.0)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REALISTIC: [f64; 30] = [
        12.0, 8.0, 25.0, 14.0, 18.0, 9.0, 31.0, 22.0, 6.0, 15.0, 20.0, 11.0, 17.0, 7.0, 28.0,
        10.0, 19.0, 23.0, 5.0, 16.0, 24.0, 13.0, 26.0, 8.0, 21.0, 14.0, 9.0, 18.0, 12.0, 15.0,
    ];

    fn raw_mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    #[test]
    fn test_too_few_values() {
        let fitter = DistributionFitter::new();
        assert!(fitter.fit(&[]).is_none());
        assert!(fitter.fit(&[10.0]).is_none());
        assert!(fitter.fit(&[10.0, 20.0]).is_some());
    }

    #[test]
    fn test_realistic_sample_mean_close_to_data() {
        let model = DistributionFitter::new().fit(&REALISTIC).expect("fit failed");
        let data_mean = raw_mean(&REALISTIC);
        assert!(
            (model.mean() - data_mean).abs() / data_mean < 0.20,
            "data mean {} fitted mean {}",
            data_mean,
            model.mean()
        );
        assert!(model.shape() > 1.0, "spend sample should not be exponential-like");
    }

    #[test]
    fn test_shape_satisfies_likelihood_equation() {
        let values = [10.0, 20.0];
        let model = DistributionFitter::new().fit(&values).unwrap();
        let spread = 15.0f64.ln() - (10.0f64.ln() + 20.0f64.ln()) / 2.0;
        let residual = model.shape().ln() - digamma(model.shape()) - spread;
        assert!(residual.abs() < 1e-9, "residual {}", residual);
        assert!((model.mean() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_outlier_is_trimmed() {
        let mut values = REALISTIC.to_vec();
        values.push(999.0);
        let model = DistributionFitter::new().fit(&values).expect("outlier broke the fit");
        assert!((model.mean() - raw_mean(&REALISTIC)).abs() < 1e-6);
    }

    #[test]
    fn test_identical_values_fail() {
        assert!(DistributionFitter::new().fit(&[25.0; 12]).is_none());
        assert!(DistributionFitter::new().fit(&[0.1; 7]).is_none());
    }

    #[test]
    fn test_near_identical_values_fit() {
        let fitter = DistributionFitter::new();
        let model = fitter.fit(&[10.0, 10.01]).expect("tight sample should fit");
        assert!(model.shape() > LARGE_SHAPE);
        assert!((model.mean() - 10.005).abs() < 1e-9);

        let est = fitter.fit_estimate(&[10.0, 10.01]).unwrap();
        assert!(9.99 < est.low && est.low < est.mean, "{:?}", est);
        assert!(est.mean < est.high && est.high < 10.02, "{:?}", est);

        assert!(fitter.fit(&[4.50, 4.50, 4.50, 4.51]).is_some());
    }

    #[test]
    fn test_large_shape_quantiles_are_symmetric_and_tight() {
        let model = GammaModel::new(4.0e6, 10.0 / 4.0e6).unwrap();
        let sd = 10.0 / 4.0e6f64.sqrt();
        let z90 = 1.2815515655446004;
        assert!((model.quantile(0.9) - (10.0 + z90 * sd)).abs() < 1e-5);
        assert!((model.quantile(0.1) - (10.0 - z90 * sd)).abs() < 1e-5);
        assert!((model.quantile(0.5) - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_non_positive_values_fail() {
        let fitter = DistributionFitter::new();
        assert!(fitter.fit(&[0.0, 5.0, 7.0]).is_none());
        assert!(fitter.fit(&[-3.0, 5.0, 7.0]).is_none());
        assert!(fitter.fit(&[f64::NAN, 5.0, 7.0]).is_none());
    }

    #[test]
    fn test_trim_outliers_reverts_when_too_few_remain() {
        assert_eq!(trim_outliers(&[2.0, 10.0], 0.5), vec![2.0, 10.0]);
        assert_eq!(trim_outliers(&[1.0, 1.0, 1.0, 10.0], 0.5), vec![1.0, 1.0, 1.0]);
        assert_eq!(trim_outliers(&[1.0, 2.0, 3.0], 3.0), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mean_and_std_population() {
        let (mean, std) = mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(mean, 5.0);
        assert_eq!(std, 2.0);
        assert_eq!(mean_and_std(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_quantile_exponential() {
        // shape 1 is the exponential distribution: median = θ ln 2
        let model = GammaModel::new(1.0, 10.0).unwrap();
        assert!((model.quantile(0.5) - 10.0 * 2f64.ln()).abs() < 1e-6);
        assert!((model.quantile(0.9) - 10.0 * 10f64.ln()).abs() < 1e-6);
        assert_eq!(model.quantile(0.0), 0.0);
    }

    #[test]
    fn test_quantile_inverts_cdf() {
        let model = DistributionFitter::new().fit(&REALISTIC).unwrap();
        for p in [0.05, 0.1, 0.5, 0.9, 0.99] {
            let q = model.quantile(p);
            assert!((model.cdf(q) - p).abs() < 1e-8, "p={} q={}", p, q);
        }
    }

    #[test]
    fn test_estimate_brackets_mean() {
        let model = DistributionFitter::new().fit(&REALISTIC).unwrap();
        let est = model.estimate(0.1, 0.9);
        assert!(0.0 < est.low && est.low < est.mean && est.mean < est.high);

        // Tiny shapes put the mean above p90; the band is widened to cover it
        let skewed = GammaModel::new(0.01, 100.0).unwrap();
        let est = skewed.estimate(0.1, 0.9);
        assert!(est.low <= est.mean && est.mean <= est.high);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(GammaModel::new(0.0, 1.0).is_none());
        assert!(GammaModel::new(1.0, -1.0).is_none());
        assert!(GammaModel::new(f64::INFINITY, 1.0).is_none());
    }

    #[test]
    fn test_trigamma_known_values() {
        let pi2 = std::f64::consts::PI.powi(2);
        assert!((trigamma(1.0) - pi2 / 6.0).abs() < 1e-10);
        assert!((trigamma(0.5) - pi2 / 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_spend_estimate_finalize() {
        let est = SpendEstimate {
            mean: 12.3456,
            low: -0.5,
            high: 30.999,
        }
        .finalize();
        assert_eq!(est, SpendEstimate { mean: 12.35, low: 0.0, high: 31.0 });

        // Exact binary ties round to even cents
        let ties = SpendEstimate {
            mean: 0.125,
            low: 0.375,
            high: 2.5,
        }
        .finalize();
        assert_eq!(ties, SpendEstimate { mean: 0.12, low: 0.38, high: 2.5 });

        let flat = SpendEstimate::flat(25.0, 0.4, 2.0);
        assert_eq!(flat, SpendEstimate { mean: 25.0, low: 10.0, high: 50.0 });
        assert_eq!(flat.scaled(2.0).mean, 50.0);
    }
}
