//! Power-law fit of ROAS against spend.
//!
//! Ordinary least squares of `ln(roas)` on `ln(spend)` gives `roas = exp(a) * spend^b`.

use roas_core::{HistoricalDataPoint, VolumeConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;
use volume_model::{calibrated_roas, RevenueCurve};

/// Fewest points a fit is attempted on.
pub const MIN_POINTS: usize = 5;

/// Point count below which the fit is flagged as indicative.
pub const RECOMMENDED_POINTS: usize = 10;

/// Grade of a fit by R².
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitQuality {
    High,
    Medium,
    Low,
}

impl FitQuality {
    pub fn from_r_squared(r2: f64) -> Self {
        if r2 > 0.7 {
            FitQuality::High
        } else if r2 > 0.3 {
            FitQuality::Medium
        } else {
            FitQuality::Low
        }
    }
}

/// How quickly ROAS falls as spend grows, bucketed from the slope `b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnsRegime {
    Stable,
    Light,
    Normal,
    Strong,
}

impl ReturnsRegime {
    pub fn from_slope(b: f64) -> Self {
        if b >= -0.05 {
            ReturnsRegime::Stable
        } else if b >= -0.3 {
            ReturnsRegime::Light
        } else if b >= -0.6 {
            ReturnsRegime::Normal
        } else {
            ReturnsRegime::Strong
        }
    }

    fn summary(self) -> &'static str {
        match self {
            ReturnsRegime::Stable => "ROAS holds steady as spend grows; there is room to scale",
            ReturnsRegime::Light => "light diminishing returns; scaling costs a little efficiency",
            ReturnsRegime::Normal => "normal diminishing returns; scale in measured steps",
            ReturnsRegime::Strong => {
                "strong diminishing returns; extra spend quickly loses efficiency"
            }
        }
    }
}

/// Outcome of checking history before a fit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl HistoryValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check that history can support a regression. Every problem found is listed.
pub fn validate_history(points: &[HistoricalDataPoint]) -> HistoryValidation {
    let mut v = HistoryValidation::default();
    let n = points.len();
    if n < MIN_POINTS {
        v.errors.push(format!(
            "At least {MIN_POINTS} data points are needed (found {n})"
        ));
    }
    if points.iter().any(|p| !(p.spend > 0.0)) {
        v.errors
            .push("All spend values must be greater than zero".to_string());
    }
    if points.iter().any(|p| !(p.roas > 0.0)) {
        v.errors
            .push("All ROAS values must be greater than zero".to_string());
    }

    let min = points.iter().map(|p| p.spend).fold(f64::INFINITY, f64::min);
    let max = points
        .iter()
        .map(|p| p.spend)
        .fold(f64::NEG_INFINITY, f64::max);
    if n > 0 && min == max {
        v.errors
            .push("Spend needs variation: every row has the same spend".to_string());
    } else if n > 0 && min > 0.0 && max / min < 1.5 {
        v.warnings.push(
            "Spend range is narrow (max below 1.5x min); predictions outside it are unreliable"
                .to_string(),
        );
    }
    if n >= MIN_POINTS && n < RECOMMENDED_POINTS {
        v.warnings.push(format!(
            "Fewer than {RECOMMENDED_POINTS} data points; treat the fit as indicative"
        ));
    }
    v
}

/// Fitted power law and its diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub a: f64,
    pub b: f64,
    pub r_squared: f64,
    pub n: usize,
    pub quality: FitQuality,
    pub regime: ReturnsRegime,
    pub interpretation: String,
    pub config: VolumeConfig,
}

impl RegressionResult {
    /// Spend -> ROAS function detached from `self`.
    pub fn predictor(&self) -> impl Fn(f64) -> f64 {
        let (a, b) = (self.a, self.b);
        move |spend| calibrated_roas(spend, a, b)
    }
}

impl RevenueCurve for RegressionResult {
    fn predict_roas(&self, spend: f64) -> f64 {
        calibrated_roas(spend, self.a, self.b)
    }
}

fn interpret(b: f64, regime: ReturnsRegime) -> String {
    let doubling = (2f64.powf(b) - 1.0) * 100.0;
    format!(
        "b = {b:.3}: {}. Doubling spend changes ROAS by {doubling:+.0}%.",
        regime.summary()
    )
}

/// Fit `ln(roas) = a + b ln(spend)`.
///
/// Returns `None` when validation fails or the design is singular.
pub fn fit_power_law(points: &[HistoricalDataPoint]) -> Option<RegressionResult> {
    if !validate_history(points).is_valid() {
        return None;
    }
    let xy: Vec<(f64, f64)> = points.iter().map(|p| (p.spend.ln(), p.roas.ln())).collect();
    let n = xy.len() as f64;
    let (sx, sy, sxy, sxx) = xy.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, &(x, y)| {
        (acc.0 + x, acc.1 + y, acc.2 + x * y, acc.3 + x * x)
    });

    let denom = n * sxx - sx * sx;
    if !(denom.abs() > f64::EPSILON * (n * sxx).abs().max(1.0)) {
        return None;
    }
    let b = (n * sxy - sx * sy) / denom;
    let a = (sy - b * sx) / n;
    if !(a.is_finite() && b.is_finite()) {
        return None;
    }

    let mean_y = sy / n;
    let (ss_res, ss_tot) = xy.iter().fold((0.0, 0.0), |acc, &(x, y)| {
        let fitted = a + b * x;
        (acc.0 + (y - fitted).powi(2), acc.1 + (y - mean_y).powi(2))
    });
    let r_squared = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };

    let regime = ReturnsRegime::from_slope(b);
    debug!(a, b, r_squared, n = xy.len(), "fitted power law");
    Some(RegressionResult {
        a,
        b,
        r_squared,
        n: xy.len(),
        quality: FitQuality::from_r_squared(r_squared),
        regime,
        interpretation: interpret(b, regime),
        config: VolumeConfig::Calibrated { a, b },
    })
}
