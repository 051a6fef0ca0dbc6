//! Curve fitting over `(x, y)` points.
//!
//! Linear fits use the closed-form least-squares solution. Polynomial fits
//! build the normal equations and solve them by Gaussian elimination with
//! partial pivoting. Exponential, power and logarithmic fits linearize the
//! data and reuse the linear fit. Any failed fit falls back to a plain
//! linear fit of the original points.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Pivots smaller than this are treated as zero.
pub const PIVOT_EPSILON: f64 = 1e-10;

/// Points sampled along a fitted curve by `fit`.
pub const DEFAULT_CURVE_SAMPLES: usize = 100;

/// Model family to fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegressionKind {
    Linear,
    /// Polynomial of the given order
    Polynomial(usize),
    /// `y = a·e^(b·x)`
    Exponential,
    /// `y = a·x^b`
    Power,
    /// `y = a·ln(x) + b`
    Logarithmic,
}

impl fmt::Display for RegressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegressionKind::Linear => f.write_str("linear"),
            RegressionKind::Polynomial(order) => write!(f, "polynomial:{}", order),
            RegressionKind::Exponential => f.write_str("exponential"),
            RegressionKind::Power => f.write_str("power"),
            RegressionKind::Logarithmic => f.write_str("logarithmic"),
        }
    }
}

impl FromStr for RegressionKind {
    type Err = EngineError;

    /// Accepts `linear`, `exponential`, `power`, `logarithmic` and
    /// `polynomial` (order 2) or `polynomial:N` / `poly:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (name, order) = match lower.split_once(':') {
            Some((name, order)) => (name, Some(order)),
            None => (lower.as_str(), None),
        };

        let kind = match (name, order) {
            ("linear", None) => RegressionKind::Linear,
            ("exponential" | "exp", None) => RegressionKind::Exponential,
            ("power", None) => RegressionKind::Power,
            ("logarithmic" | "log", None) => RegressionKind::Logarithmic,
            ("polynomial" | "poly", None) => RegressionKind::Polynomial(2),
            ("polynomial" | "poly", Some(order)) => match order.trim().parse::<usize>() {
                Ok(order) if order >= 1 => RegressionKind::Polynomial(order),
                _ => {
                    return Err(EngineError::ParseError(format!(
                        "Invalid polynomial order: {}",
                        order
                    )))
                }
            },
            _ => {
                return Err(EngineError::ParseError(format!(
                    "Unknown regression type: {}",
                    s
                )))
            }
        };
        Ok(kind)
    }
}

/// A fitted model.
///
/// Coefficient layout depends on the kind:
/// - `Linear`: `[intercept, slope]`
/// - `Polynomial(n)`: `[c0, c1, ..., cn]`, lowest power first
/// - `Exponential`, `Power`: `[a, b]`
/// - `Logarithmic`: `[a, b]` for `a·ln(x) + b`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionModel {
    /// Kind actually fitted; `Linear` after a fallback
    pub kind: RegressionKind,
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
    /// Smallest and largest x among the points the model was fitted on
    pub x_range: (f64, f64),
}

impl RegressionModel {
    /// Missing coefficients read as NaN, so a short model predicts NaN.
    pub fn predict(&self, x: f64) -> f64 {
        let (a, b) = (self.coefficient(0), self.coefficient(1));
        match self.kind {
            RegressionKind::Linear => a + b * x,
            RegressionKind::Polynomial(_) if self.coefficients.is_empty() => f64::NAN,
            RegressionKind::Polynomial(_) => self
                .coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, coef| acc * x + coef),
            RegressionKind::Exponential => a * (b * x).exp(),
            RegressionKind::Power => a * x.powf(b),
            RegressionKind::Logarithmic => a * x.ln() + b,
        }
    }

    fn coefficient(&self, index: usize) -> f64 {
        self.coefficients.get(index).copied().unwrap_or(f64::NAN)
    }

    /// Human-readable equation, e.g. `y = 2x + 1`.
    pub fn equation(&self) -> String {
        let c = [self.coefficient(0), self.coefficient(1)];
        match self.kind {
            RegressionKind::Linear => format!("y = {}", join_terms(&[(c[1], "x".to_string()), (c[0], String::new())])),
            RegressionKind::Polynomial(_) => {
                let terms: Vec<(f64, String)> = self
                    .coefficients
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(power, coef)| {
                        let suffix = match power {
                            0 => String::new(),
                            1 => "x".to_string(),
                            p => format!("x^{}", p),
                        };
                        (*coef, suffix)
                    })
                    .collect();
                format!("y = {}", join_terms(&terms))
            }
            RegressionKind::Exponential => {
                format!("y = {}e^({}x)", format_coefficient(c[0]), format_coefficient(c[1]))
            }
            RegressionKind::Power => {
                format!("y = {}x^{}", format_coefficient(c[0]), format_coefficient(c[1]))
            }
            RegressionKind::Logarithmic => format!(
                "y = {}",
                join_terms(&[(c[0], "ln(x)".to_string()), (c[1], String::new())])
            ),
        }
    }
}

fn format_coefficient(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

fn join_terms(terms: &[(f64, String)]) -> String {
    let mut out = String::new();
    for (i, (coef, suffix)) in terms.iter().enumerate() {
        let magnitude = format_coefficient(coef.abs());
        if i == 0 {
            if *coef < 0.0 && magnitude != "0" {
                out.push('-');
            }
        } else if *coef < 0.0 && magnitude != "0" {
            out.push_str(" - ");
        } else {
            out.push_str(" + ");
        }
        out.push_str(&magnitude);
        out.push_str(suffix);
    }
    out
}

/// Solve `matrix · x = rhs` by Gaussian elimination with partial pivoting.
///
/// Returns None when the system is not square or a pivot's magnitude falls
/// below `PIVOT_EPSILON`.
pub fn solve_linear_system(matrix: &[Vec<f64>], rhs: &[f64]) -> Option<Vec<f64>> {
    let n = rhs.len();
    if matrix.len() != n || matrix.iter().any(|row| row.len() != n) {
        return None;
    }

    // Augmented matrix [A | b]
    let mut a: Vec<Vec<f64>> = matrix
        .iter()
        .zip(rhs)
        .map(|(row, b)| {
            let mut aug = row.clone();
            aug.push(*b);
            aug
        })
        .collect();

    for k in 0..n {
        let mut max_row = k;
        for i in k + 1..n {
            if a[i][k].abs() > a[max_row][k].abs() {
                max_row = i;
            }
        }
        if a[max_row][k].abs() < PIVOT_EPSILON {
            return None;
        }
        a.swap(k, max_row);

        for i in k + 1..n {
            let factor = a[i][k] / a[k][k];
            for j in k..=n {
                a[i][j] -= factor * a[k][j];
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|j| a[i][j] * x[j]).sum();
        x[i] = (a[i][n] - sum) / a[i][i];
    }
    Some(x)
}

/// Least-squares line through the points: `(intercept, slope)`.
fn linear_coefficients(points: &[(f64, f64)]) -> EngineResult<(f64, f64)> {
    if points.len() < 2 {
        return Err(EngineError::SingularSystem(
            "linear fit needs at least two points".to_string(),
        ));
    }

    let n = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);

    // Degenerate only when the spread is at rounding level relative to Σx².
    let (sxx, sxy, sum_xx) = points.iter().fold((0.0, 0.0, 0.0), |(sxx, sxy, xx), (x, y)| {
        let dx = x - mean_x;
        (sxx + dx * dx, sxy + dx * (y - mean_y), xx + x * x)
    });
    if sxx <= f64::EPSILON * f64::EPSILON * n * sum_xx {
        return Err(EngineError::SingularSystem(
            "x values have no spread".to_string(),
        ));
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    Ok((intercept, slope))
}

fn polynomial_coefficients(points: &[(f64, f64)], order: usize) -> EngineResult<Vec<f64>> {
    let size = order + 1;
    if points.len() < size {
        return Err(EngineError::SingularSystem(format!(
            "polynomial of order {} needs at least {} points",
            order, size
        )));
    }

    // Power sums Σx^k for k in 0..=2·order
    let mut power_sums = vec![0.0; 2 * order + 1];
    let mut rhs = vec![0.0; size];
    for (x, y) in points {
        let mut xp = 1.0;
        for (k, sum) in power_sums.iter_mut().enumerate() {
            *sum += xp;
            if k < size {
                rhs[k] += y * xp;
            }
            xp *= x;
        }
    }

    let matrix: Vec<Vec<f64>> = (0..size)
        .map(|i| (0..size).map(|j| power_sums[i + j]).collect())
        .collect();

    solve_linear_system(&matrix, &rhs).ok_or_else(|| {
        EngineError::SingularSystem(format!("normal equations of order {} are singular", order))
    })
}

fn x_range(points: &[(f64, f64)]) -> (f64, f64) {
    points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (x, _)| {
        (lo.min(*x), hi.max(*x))
    })
}

fn r_squared(model: &RegressionModel, points: &[(f64, f64)]) -> f64 {
    let mean = points.iter().map(|(_, y)| y).sum::<f64>() / points.len() as f64;
    let ss_tot: f64 = points.iter().map(|(_, y)| (y - mean).powi(2)).sum();
    let ss_res: f64 = points
        .iter()
        .map(|(x, y)| (y - model.predict(*x)).powi(2))
        .sum();

    if ss_tot == 0.0 {
        if ss_res < PIVOT_EPSILON {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

fn build_model(kind: RegressionKind, coefficients: Vec<f64>, points: &[(f64, f64)]) -> RegressionModel {
    let mut model = RegressionModel {
        kind,
        coefficients,
        r_squared: 0.0,
        x_range: x_range(points),
    };
    model.r_squared = r_squared(&model, points);
    model
}

fn fit_kind(points: &[(f64, f64)], kind: RegressionKind) -> EngineResult<RegressionModel> {
    match kind {
        RegressionKind::Linear => {
            let (intercept, slope) = linear_coefficients(points)?;
            Ok(build_model(kind, vec![intercept, slope], points))
        }
        RegressionKind::Polynomial(order) => {
            let coefficients = polynomial_coefficients(points, order)?;
            Ok(build_model(kind, coefficients, points))
        }
        RegressionKind::Exponential => {
            let used: Vec<(f64, f64)> = points.iter().copied().filter(|(_, y)| *y > 0.0).collect();
            let transformed: Vec<(f64, f64)> = used.iter().map(|(x, y)| (*x, y.ln())).collect();
            let (intercept, slope) = linear_coefficients(&transformed)?;
            Ok(build_model(kind, vec![intercept.exp(), slope], &used))
        }
        RegressionKind::Power => {
            let used: Vec<(f64, f64)> = points
                .iter()
                .copied()
                .filter(|(x, y)| *x > 0.0 && *y > 0.0)
                .collect();
            let transformed: Vec<(f64, f64)> = used.iter().map(|(x, y)| (x.ln(), y.ln())).collect();
            let (intercept, slope) = linear_coefficients(&transformed)?;
            Ok(build_model(kind, vec![intercept.exp(), slope], &used))
        }
        RegressionKind::Logarithmic => {
            let used: Vec<(f64, f64)> = points.iter().copied().filter(|(x, _)| *x > 0.0).collect();
            let transformed: Vec<(f64, f64)> = used.iter().map(|(x, y)| (x.ln(), *y)).collect();
            let (intercept, slope) = linear_coefficients(&transformed)?;
            Ok(build_model(kind, vec![slope, intercept], &used))
        }
    }
}

/// Fit a model of the requested kind, falling back to a linear fit of the
/// original points when that fails. Non-finite points are ignored.
pub fn fit_model(points: &[(f64, f64)], kind: RegressionKind) -> EngineResult<RegressionModel> {
    let points: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();

    match fit_kind(&points, kind) {
        Ok(model) => Ok(model),
        Err(err) if kind != RegressionKind::Linear => {
            tracing::debug!(kind = %kind, error = %err, "fit failed; falling back to linear");
            fit_kind(&points, RegressionKind::Linear)
        }
        Err(err) => Err(err),
    }
}

/// Sample `samples` points along the model across its x range.
pub fn sample_curve(model: &RegressionModel, samples: usize) -> Vec<(f64, f64)> {
    let (min_x, max_x) = model.x_range;
    if samples == 0 || !min_x.is_finite() || !max_x.is_finite() {
        return Vec::new();
    }

    let step = (max_x - min_x) / samples as f64;
    (0..samples)
        .map(|i| {
            let x = min_x + i as f64 * step;
            (x, model.predict(x))
        })
        .filter(|(_, y)| y.is_finite())
        .collect()
}

/// Fit and sample with an explicit sample count. Fewer than two points, or
/// a failed fit, yields an empty curve.
pub fn fit_with_samples(points: &[(f64, f64)], kind: RegressionKind, samples: usize) -> Vec<(f64, f64)> {
    if points.len() < 2 {
        return Vec::new();
    }
    match fit_model(points, kind) {
        Ok(model) => sample_curve(&model, samples),
        Err(err) => {
            tracing::debug!(error = %err, "no curve fitted");
            Vec::new()
        }
    }
}

/// Fit and sample `DEFAULT_CURVE_SAMPLES` points.
pub fn fit(points: &[(f64, f64)], kind: RegressionKind) -> Vec<(f64, f64)> {
    fit_with_samples(points, kind, DEFAULT_CURVE_SAMPLES)
}
