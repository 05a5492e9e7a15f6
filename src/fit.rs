//! Logarithmic accumulation curve fit.
//!
//! The accumulation curve is modelled as `y = a·ln(x) + b`, where `x` is the cumulative
//! number of recorded extensions and `y` the cumulative number of distinct ones. The
//! model is linear in `(a, b)` once `u = ln(x)` is substituted, so ordinary least
//! squares has a closed form:
//!
//! ```text
//! a = Σ(u - ū)(y - ȳ) / Σ(u - ū)²
//! b = ȳ - a·ū
//! ```
//!
//! The parameter covariance is `s²·(XᵀX)⁻¹` with `X = [u 1]` and
//! `s² = SSR / (n - 2)`. Propagating it through the Jacobian `J = (ln x, 1)` gives the
//! variance of the fitted value at any `x`, and the band is `y_fit ± z·sqrt(var)`.
//! With exactly two points there are no residual degrees of freedom, the covariance is
//! undefined and the band is infinite.
//!
//! This is a normal approximation, suitable for an indicative estimate only.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info};

use crate::accumulation::AccumulationTable;
use crate::config::FitConfig;
use crate::error::{Error, Result};

/// Number of free parameters in the model
const NUM_PARAMS: usize = 2;
/// Default number of evaluation points
pub const DEFAULT_STEPS: usize = 100;
/// Two-sided 95% normal quantile
pub const DEFAULT_CONFIDENCE_Z: f64 = 1.96;

/// Fitted `y = a·ln(x) + b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogModel {
    pub a: f64,
    pub b: f64,
}

impl LogModel {
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        self.a * x.ln() + self.b
    }
}

/// Result of a least-squares fit of [`LogModel`] to observed points
#[derive(Debug, Clone, PartialEq)]
pub struct LogFit {
    model: LogModel,
    /// Covariance of `(a, b)`, absent when there are no residual degrees of freedom
    covariance: Option<[[f64; 2]; 2]>,
    points: usize,
}

impl LogFit {
    /// Fits `y = a·ln(x) + b` to the paired observations.
    ///
    /// Fails with [`Error::InsufficientData`] for fewer than two distinct `(x, y)`
    /// pairs and with [`Error::DegenerateInput`] when the x-values are all identical,
    /// not strictly positive, or when the series cannot be paired up.
    pub fn fit(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::DegenerateInput(format!(
                "x and y have different lengths ({} and {})",
                x.len(),
                y.len()
            )));
        }
        if let Some(bad) = x.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(Error::DegenerateInput(format!(
                "x-values must be finite and positive, got {bad}"
            )));
        }
        if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(Error::DegenerateInput(format!(
                "y-values must be finite, got {bad}"
            )));
        }

        let distinct = count_distinct_pairs(x, y);
        if distinct < NUM_PARAMS {
            return Err(Error::InsufficientData {
                distinct,
                required: NUM_PARAMS,
            });
        }

        let n = x.len() as f64;
        let u: Vec<f64> = x.iter().map(|v| v.ln()).collect();
        let u_mean = u.iter().sum::<f64>() / n;
        let y_mean = y.iter().sum::<f64>() / n;

        let (mut s_uu, mut s_uy) = (0.0, 0.0);
        for (ui, yi) in u.iter().zip(y) {
            s_uu += (ui - u_mean) * (ui - u_mean);
            s_uy += (ui - u_mean) * (yi - y_mean);
        }
        if x.iter().all(|&v| v == x[0]) {
            return Err(Error::DegenerateInput(
                "all x-values are identical, the logarithmic fit is undefined".to_string(),
            ));
        }
        // distinct x-values can still collapse once ln() rounds them together
        if s_uu <= 0.0 {
            return Err(Error::DegenerateInput(
                "x-values are too close to separate on a logarithmic scale".to_string(),
            ));
        }

        let a = s_uy / s_uu;
        let b = y_mean - a * u_mean;
        let model = LogModel { a, b };

        let dof = x.len() - NUM_PARAMS;
        let covariance = (dof > 0).then(|| {
            let ssr: f64 = u
                .iter()
                .zip(y)
                .map(|(ui, yi)| {
                    let r = yi - (a * ui + b);
                    r * r
                })
                .sum();
            let s2 = ssr / dof as f64;
            let var_a = s2 / s_uu;
            let cov_ab = -s2 * u_mean / s_uu;
            let var_b = s2 * (1.0 / n + u_mean * u_mean / s_uu);
            [[var_a, cov_ab], [cov_ab, var_b]]
        });

        debug!(a, b, points = x.len(), dof, "fitted logarithmic model");
        Ok(Self {
            model,
            covariance,
            points: x.len(),
        })
    }

    #[inline]
    pub fn model(&self) -> LogModel {
        self.model
    }

    /// Covariance matrix of `(a, b)`
    #[inline]
    pub fn covariance(&self) -> Option<[[f64; 2]; 2]> {
        self.covariance
    }

    /// Number of observations used
    #[inline]
    pub fn points(&self) -> usize {
        self.points
    }

    /// Residual degrees of freedom
    #[inline]
    pub fn degrees_of_freedom(&self) -> usize {
        self.points - NUM_PARAMS
    }

    /// Standard deviation of the fitted value at `x`, infinite if undefined
    pub fn std_error(&self, x: f64) -> f64 {
        match self.covariance {
            Some([[var_a, cov_ab], [_, var_b]]) => {
                let j = x.ln();
                (j * j * var_a + 2.0 * j * cov_ab + var_b).max(0.0).sqrt()
            }
            None => f64::INFINITY,
        }
    }

    /// Evaluates the fit over `domain` with a `z`-scaled confidence band
    pub fn curve(&self, domain: FitDomain, steps: usize, z: f64) -> Result<FitResult> {
        if steps < 2 {
            return Err(Error::InvalidDomain(format!(
                "at least 2 evaluation steps required, got {steps}"
            )));
        }
        if !(z.is_finite() && z >= 0.0) {
            return Err(Error::InvalidDomain(format!(
                "confidence factor must be finite and non-negative, got {z}"
            )));
        }

        let points = domain
            .linspace(steps)
            .map(|x| {
                let y_fit = self.model.evaluate(x);
                // z = 0 asks for no band, even where the error is unbounded
                let half_width = if z == 0.0 { 0.0 } else { z * self.std_error(x) };
                FitPoint {
                    x,
                    y_fit,
                    y_lower: y_fit - half_width,
                    y_upper: y_fit + half_width,
                }
            })
            .collect();

        Ok(FitResult {
            a: self.model.a,
            b: self.model.b,
            points,
        })
    }
}

/// Counts distinct `(x, y)` pairs by bit pattern
fn count_distinct_pairs(x: &[f64], y: &[f64]) -> usize {
    let mut pairs: Vec<(u64, u64)> = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (xi.to_bits(), yi.to_bits()))
        .collect();
    pairs.sort_unstable();
    pairs.dedup();
    pairs.len()
}

/// Closed interval of x-values to evaluate the fitted curve over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitDomain {
    lower: u64,
    upper: u64,
}

impl FitDomain {
    /// Creates a domain with `1 <= lower < upper`
    pub fn new(lower: u64, upper: u64) -> Result<Self> {
        if lower == 0 {
            return Err(Error::InvalidDomain(
                "lower bound must be at least 1, ln(0) is undefined".to_string(),
            ));
        }
        if lower >= upper {
            return Err(Error::InvalidDomain(format!(
                "lower bound {lower} must be below upper bound {upper}"
            )));
        }
        Ok(Self { lower, upper })
    }

    #[inline]
    pub fn lower(&self) -> u64 {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> u64 {
        self.upper
    }

    /// `steps` evenly spaced values, first exactly `lower` and last exactly `upper`
    fn linspace(&self, steps: usize) -> impl Iterator<Item = f64> {
        let lower = self.lower as f64;
        let upper = self.upper as f64;
        let step = (upper - lower) / (steps - 1) as f64;
        (0..steps).map(move |i| {
            if i == steps - 1 {
                upper
            } else {
                lower + step * i as f64
            }
        })
    }
}

/// One evaluated point of the fitted curve.
///
/// JSON has no infinity, so an unbounded band is written as `null` and read back as
/// `-inf` / `+inf`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitPoint {
    pub x: f64,
    pub y_fit: f64,
    #[serde(deserialize_with = "lower_or_unbounded")]
    pub y_lower: f64,
    #[serde(deserialize_with = "upper_or_unbounded")]
    pub y_upper: f64,
}

fn lower_or_unbounded<'de, D: Deserializer<'de>>(deserializer: D) -> core::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NEG_INFINITY))
}

fn upper_or_unbounded<'de, D: Deserializer<'de>>(deserializer: D) -> core::result::Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

/// Fitted curve parameters and the curve evaluated over a domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub a: f64,
    pub b: f64,
    pub points: Vec<FitPoint>,
}

impl FitResult {
    /// Point at the upper bound of the domain: the extrapolated total estimate
    pub fn estimate(&self) -> Option<&FitPoint> {
        self.points.last()
    }

    pub fn x_fit(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.x).collect()
    }

    pub fn y_fit(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y_fit).collect()
    }

    pub fn y_lower(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y_lower).collect()
    }

    pub fn y_upper(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y_upper).collect()
    }

    /// Splits into `(x_fit, y_fit, a, b, y_lower, y_upper)`
    #[allow(clippy::type_complexity)]
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>, f64, f64, Vec<f64>, Vec<f64>) {
        (
            self.x_fit(),
            self.y_fit(),
            self.a,
            self.b,
            self.y_lower(),
            self.y_upper(),
        )
    }
}

/// Fits the `(total_exts, total_uniq_exts)` series and evaluates it over `[lower, upper]`
pub fn fit_curve(
    total_exts: &[usize],
    total_uniq_exts: &[usize],
    domain: FitDomain,
    steps: usize,
    z: f64,
) -> Result<FitResult> {
    LogFit::fit(&as_f64(total_exts), &as_f64(total_uniq_exts))?.curve(domain, steps, z)
}

fn as_f64(values: &[usize]) -> Vec<f64> {
    values.iter().map(|&v| v as f64).collect()
}

/// Fits an accumulation table using the bounds and band settings in `config`.
///
/// Missing bounds fall back to the smallest and largest observed `total_exts`.
pub fn fit_accumulation(table: &AccumulationTable, config: &FitConfig) -> Result<FitResult> {
    let x = table.total_exts();
    let y = table.total_uniq_exts();
    let fit = LogFit::fit(&as_f64(&x), &as_f64(&y))?;

    let lower = match config.lower_bound {
        Some(lower) => lower,
        None => x.iter().min().map_or(0, |&v| v as u64),
    };
    let upper = match config.upper_bound {
        Some(upper) => upper,
        None => x.iter().max().map_or(0, |&v| v as u64),
    };

    let result = fit.curve(FitDomain::new(lower, upper)?, config.steps, config.confidence_z)?;
    if let Some(estimate) = result.estimate() {
        info!(
            a = result.a,
            b = result.b,
            x = estimate.x,
            estimate = estimate.y_fit,
            lower = estimate.y_lower,
            upper = estimate.y_upper,
            "extrapolated distinct extension count"
        );
    }
    Ok(result)
}
