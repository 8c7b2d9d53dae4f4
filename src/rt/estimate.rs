use crate::rt::CaseSeries;
use chrono::NaiveDate;
#[cfg(feature = "cli")]
use clap::Args as ClapArgs;
use color_eyre::eyre::{eyre, Report, Result};
use color_eyre::Help;
use log::debug;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

// ----------------------------------------------------------------------------
// Estimation Params
// ----------------------------------------------------------------------------

/// Parameters of a [`ReproductionEstimator`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[cfg_attr(feature = "cli", derive(ClapArgs))]
pub struct EstimationParams {
    /// Power-law exponent relating the number of tests to expected positives.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = EstimationParams::default().test_exponent))]
    pub test_exponent: f64,

    /// Strength of the penalty on curvature of the smoothed log-incidence.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = EstimationParams::default().smoothing))]
    pub smoothing: f64,

    /// Mean generation time in days.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = EstimationParams::default().generation_time))]
    pub generation_time: f64,

    /// Confidence level of the interval.
    #[cfg_attr(feature = "cli", arg(long, default_value_t = EstimationParams::default().confidence))]
    pub confidence: f64,
}

impl Default for EstimationParams {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimationParams {
    pub fn new() -> Self {
        EstimationParams { test_exponent: 0.7, smoothing: 100.0, generation_time: 4.7, confidence: 0.95 }
    }

    /// Check that parameters are in range.
    pub fn validate(&self) -> Result<(), Report> {
        if !self.test_exponent.is_finite() {
            return Err(eyre!("--test-exponent must be finite: {}", self.test_exponent));
        }
        if !(self.smoothing.is_finite() && self.smoothing >= 0.0) {
            return Err(eyre!("--smoothing must be zero or positive: {}", self.smoothing));
        }
        if !(self.generation_time.is_finite() && self.generation_time > 0.0) {
            return Err(eyre!("--generation-time must be positive: {}", self.generation_time));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(eyre!("--confidence must be between 0 and 1: {}", self.confidence))
                .suggestion("Example: --confidence 0.95");
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// R Estimate
// ----------------------------------------------------------------------------

/// Reproduction number of one day, with its confidence interval.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize, Tabled)]
pub struct REstimate {
    pub date: NaiveDate,
    #[tabled(display_with = "display_r")]
    pub r: f64,
    #[tabled(display_with = "display_r")]
    pub lower: f64,
    #[tabled(display_with = "display_r")]
    pub upper: f64,
}

fn display_r(r: &f64) -> String {
    format!("{r:.3}")
}

/// Estimates the reproduction number over a daily case series.
pub trait ReproductionEstimator {
    /// Returns one [`REstimate`] per day of `series`.
    fn estimate(&self, series: &CaseSeries, params: &EstimationParams) -> Result<Vec<REstimate>, Report>;
}

// ----------------------------------------------------------------------------
// Test Adjusted Estimator
// ----------------------------------------------------------------------------

/// Estimates R from the growth rate of test-adjusted positives.
///
/// Log positives are adjusted for testing volume (`ln(positives + 0.5) - a * ln(tests)`),
/// smoothed with a Whittaker smoother, and differentiated to a daily growth rate `g`.
/// Then `R = exp(g * generation_time)`. The interval propagates the Poisson variance of the
/// log positives through the smoother and the derivative.
///
/// ## Examples
///
/// ```rust
/// use covsurv::rt::{CaseRecord, CaseSeries, EstimationParams, ReproductionEstimator, TestAdjustedEstimator};
/// use chrono::{Duration, NaiveDate};
///
/// let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
/// // positives double every week, with constant testing
/// let records = (0..28)
///     .map(|d| CaseRecord {
///         date: start + Duration::days(d),
///         tests: 100_000,
///         positives: (1000.0 * 2f64.powf(d as f64 / 7.0)).round() as u64,
///     })
///     .collect();
/// let series = CaseSeries::new(records)?;
/// let estimates = TestAdjustedEstimator.estimate(&series, &EstimationParams::default())?;
///
/// let expected = (2f64.ln() / 7.0 * 4.7).exp();
/// assert!((estimates[14].r - expected).abs() < 0.01);
/// assert!(estimates[14].lower < estimates[14].r && estimates[14].r < estimates[14].upper);
/// # Ok::<(), color_eyre::eyre::Report>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct TestAdjustedEstimator;

impl ReproductionEstimator for TestAdjustedEstimator {
    fn estimate(&self, series: &CaseSeries, params: &EstimationParams) -> Result<Vec<REstimate>, Report> {
        params.validate()?;
        let n = series.len();
        if n < 2 {
            return Err(eyre!("At least two days are needed to estimate R, found {n}."))
                .suggestion("Check the date window (--lower-bound, --archive-date, --trailing-days).");
        }

        // test-adjusted log positives, and their approximate variance
        let y: Vec<f64> = series
            .records
            .iter()
            .map(|r| (r.positives as f64 + 0.5).ln() - params.test_exponent * (r.tests.max(1) as f64).ln())
            .collect();
        let variance: Vec<f64> = series.records.iter().map(|r| 1.0 / (r.positives as f64 + 0.5)).collect();

        let smoother = Whittaker::new(n, params.smoothing)?;
        let x = smoother.solve(&y);
        let growth = derivative(&x);

        // var(g) = sum_j (G S)_ij^2 var(y_j), S = smoother (hat) matrix
        let hat = smoother.hat();
        let growth_sd: Vec<f64> = (0..n)
            .map(|i| {
                let row = derivative_row(&hat, i);
                row.iter().zip(&variance).map(|(w, v)| w * w * v).sum::<f64>().sqrt()
            })
            .collect();

        let z = normal_quantile(1.0 - (1.0 - params.confidence) / 2.0);
        debug!("Normal quantile for {} confidence: {z:.4}", params.confidence);
        let tg = params.generation_time;

        let estimates = series
            .records
            .iter()
            .zip(growth.iter().zip(&growth_sd))
            .map(|(record, (g, sd))| REstimate {
                date: record.date,
                r: (g * tg).exp(),
                lower: ((g - z * sd) * tg).exp(),
                upper: ((g + z * sd) * tg).exp(),
            })
            .collect();

        Ok(estimates)
    }
}

/// Returns the numerical derivative: central differences, one-sided at the ends.
fn derivative(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    (0..n)
        .map(|i| match i {
            0 => x[1] - x[0],
            i if i == n - 1 => x[n - 1] - x[n - 2],
            i => (x[i + 1] - x[i - 1]) / 2.0,
        })
        .collect()
}

/// Returns row `i` of `G S`, where `G` is the [`derivative`] matrix and `rows` are the rows
/// of `S`.
fn derivative_row(rows: &[Vec<f64>], i: usize) -> Vec<f64> {
    let n = rows.len();
    let (a, b, scale) = match i {
        0 => (1, 0, 1.0),
        i if i == n - 1 => (n - 1, n - 2, 1.0),
        i => (i + 1, i - 1, 0.5),
    };
    rows[a].iter().zip(&rows[b]).map(|(p, q)| (p - q) * scale).collect()
}

// ----------------------------------------------------------------------------
// Whittaker Smoother
// ----------------------------------------------------------------------------

/// Second-difference Whittaker smoother, solving `(I + lambda D'D) x = y`.
///
/// The system matrix is symmetric positive definite with bandwidth 2, and is factored once
/// as a banded Cholesky `L L'`.
#[derive(Clone, Debug)]
struct Whittaker {
    /// Diagonal of `L`.
    diag: Vec<f64>,
    /// First and second sub-diagonals of `L`, indexed by row.
    sub1: Vec<f64>,
    sub2: Vec<f64>,
}

impl Whittaker {
    fn new(n: usize, lambda: f64) -> Result<Self, Report> {
        // band of A = I + lambda D'D, as a[i] = (A[i][i], A[i][i-1], A[i][i-2])
        let mut a = vec![[1.0, 0.0, 0.0]; n];
        const D2: [f64; 3] = [1.0, -2.0, 1.0];
        // fewer than three days: no second differences, the smoother is the identity
        for k in 0..n.saturating_sub(2) {
            for p in 0..3 {
                for q in 0..=p {
                    a[k + p][p - q] += lambda * D2[p] * D2[q];
                }
            }
        }

        let (mut diag, mut sub1, mut sub2) = (vec![0.0; n], vec![0.0; n], vec![0.0; n]);
        for i in 0..n {
            if i >= 2 {
                sub2[i] = a[i][2] / diag[i - 2];
            }
            if i >= 1 {
                let shared = if i >= 2 { sub2[i] * sub1[i - 1] } else { 0.0 };
                sub1[i] = (a[i][1] - shared) / diag[i - 1];
            }
            let pivot = a[i][0] - sub1[i].powi(2) - sub2[i].powi(2);
            if pivot.is_nan() || pivot <= 0.0 {
                return Err(eyre!("Smoother is not positive definite (row {i}, pivot {pivot})."));
            }
            diag[i] = pivot.sqrt();
        }

        Ok(Whittaker { diag, sub1, sub2 })
    }

    /// Solve `A x = y`.
    fn solve(&self, y: &[f64]) -> Vec<f64> {
        let n = y.len();
        // forward: L z = y
        let mut z = vec![0.0; n];
        for i in 0..n {
            let mut v = y[i];
            if i >= 1 {
                v -= self.sub1[i] * z[i - 1];
            }
            if i >= 2 {
                v -= self.sub2[i] * z[i - 2];
            }
            z[i] = v / self.diag[i];
        }
        // backward: L' x = z
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut v = z[i];
            if i + 1 < n {
                v -= self.sub1[i + 1] * x[i + 1];
            }
            if i + 2 < n {
                v -= self.sub2[i + 2] * x[i + 2];
            }
            x[i] = v / self.diag[i];
        }
        x
    }

    /// Returns the rows of `A^-1`, the smoother (hat) matrix.
    fn hat(&self) -> Vec<Vec<f64>> {
        let n = self.diag.len();
        // A is symmetric, so columns are rows
        (0..n)
            .map(|j| {
                let mut e = vec![0.0; n];
                e[j] = 1.0;
                self.solve(&e)
            })
            .collect()
    }
}

// ----------------------------------------------------------------------------
// Normal Quantile
// ----------------------------------------------------------------------------

/// Returns the quantile function of the standard normal distribution at `p`.
///
/// Uses Acklam's rational approximation (relative error below 1.2e-9).
///
/// ```rust
/// use covsurv::rt::normal_quantile;
/// assert!((normal_quantile(0.975) - 1.959964).abs() < 1e-6);
/// assert!((normal_quantile(0.5)).abs() < 1e-9);
/// assert!((normal_quantile(0.025) + 1.959964).abs() < 1e-6);
/// ```
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e1,
        2.209460984245205e2,
        -2.759285104469687e2,
        1.383577518672690e2,
        -3.066479806614716e1,
        2.506628277459239,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e1,
        1.615858368580409e2,
        -1.556989798598866e2,
        6.680131188771972e1,
        -1.328068155288572e1,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-3,
        -3.223964580411365e-1,
        -2.400758277161838,
        -2.549732539343734,
        4.374664141464968,
        2.938163982698783,
    ];
    const D: [f64; 4] =
        [7.784695709041462e-3, 3.224671290700398e-1, 2.445134137142996, 3.754408661907416];
    const LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };
    if p < LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p > 1.0 - LOW {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoother_preserves_lines() {
        // second differences of a line are zero, so the fit is exact
        let y: Vec<f64> = (0..10).map(|i| 2.0 + 0.5 * i as f64).collect();
        let x = Whittaker::new(y.len(), 1000.0).unwrap().solve(&y);
        for (a, b) in x.iter().zip(&y) {
            assert!((a - b).abs() < 1e-8, "{a} != {b}");
        }
    }

    #[test]
    fn smoother_without_penalty_is_identity() {
        let y = vec![1.0, 5.0, 2.0, 8.0];
        let x = Whittaker::new(y.len(), 0.0).unwrap().solve(&y);
        assert_eq!(x, y);
    }

    #[test]
    fn hat_matrix_inverts_system() {
        let lambda = 10.0;
        let smoother = Whittaker::new(5, lambda).unwrap();
        let hat = smoother.hat();
        let y = vec![0.3, -1.0, 2.0, 0.7, 1.1];
        let direct = smoother.solve(&y);
        let via_hat: Vec<f64> = hat.iter().map(|row| row.iter().zip(&y).map(|(s, v)| s * v).sum()).collect();
        for (a, b) in direct.iter().zip(&via_hat) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn derivative_one_sided_at_ends() {
        assert_eq!(derivative(&[0.0, 1.0, 4.0, 9.0]), vec![1.0, 2.0, 4.0, 5.0]);
    }
}
