#![deny(warnings)]

//! Spend-to-revenue curves and the profit-maximising budget search.
//!
//! Two curves share the [`RevenueCurve`] contract:
//! - Manual: an elasticity exponent anchored at a reference budget and ROAS
//! - Calibrated: the power law `roas = exp(a) * spend^b` fitted from history
//!
//! Non-positive spend, ROAS or reference inputs yield zero instead of NaN or infinity.

use roas_core::VolumeConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stop once the bracket is narrower than this many currency units.
pub const SEARCH_TOLERANCE: f64 = 100.0;

/// Hard cap on golden-section iterations.
pub const MAX_ITERATIONS: u32 = 100;

/// Predicts ROAS and revenue for a spend level.
pub trait RevenueCurve {
    fn predict_roas(&self, spend: f64) -> f64;

    fn predict_revenue(&self, spend: f64) -> f64 {
        if spend > 0.0 {
            spend * self.predict_roas(spend)
        } else {
            0.0
        }
    }
}

impl RevenueCurve for VolumeConfig {
    fn predict_roas(&self, spend: f64) -> f64 {
        match *self {
            VolumeConfig::Manual {
                elasticity,
                reference_roas,
                reference_budget,
            } => effective_roas(spend, reference_budget, reference_roas, elasticity),
            VolumeConfig::Calibrated { a, b } => calibrated_roas(spend, a, b),
        }
    }
}

fn finite_or_zero(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// Revenue from spending `budget` while bidding toward `roas`.
///
/// `budget * roas * (roas / roas_ref)^-elasticity`: pushing ROAS above the reference shrinks
/// volume.
pub fn manual_revenue(budget: f64, roas: f64, roas_ref: f64, elasticity: f64) -> f64 {
    if budget <= 0.0 || roas <= 0.0 || roas_ref <= 0.0 {
        return 0.0;
    }
    finite_or_zero(budget * roas * (roas / roas_ref).powf(-elasticity))
}

/// ROAS reached at `budget` given a reference point, from equilibrium of the manual curve.
///
/// `roas_ref * (budget / budget_ref)^(-e / (1 + e))`
pub fn effective_roas(budget: f64, budget_ref: f64, roas_ref: f64, elasticity: f64) -> f64 {
    if budget <= 0.0 || budget_ref <= 0.0 || roas_ref <= 0.0 || elasticity <= -1.0 {
        return 0.0;
    }
    let exponent = -elasticity / (1.0 + elasticity);
    finite_or_zero(roas_ref * (budget / budget_ref).powf(exponent))
}

/// ROAS predicted by the calibrated power law.
pub fn calibrated_roas(spend: f64, a: f64, b: f64) -> f64 {
    if spend <= 0.0 {
        return 0.0;
    }
    finite_or_zero(a.exp() * spend.powf(b))
}

/// Profit after ad spend: `revenue * margin - spend`.
pub fn profit<C: RevenueCurve + ?Sized>(curve: &C, spend: f64, profit_margin: f64) -> f64 {
    curve.predict_revenue(spend) * profit_margin - spend
}

/// Best budget found by [`optimal_budget`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimalBudget {
    pub budget: f64,
    pub revenue: f64,
    pub roas: f64,
    pub profit: f64,
    pub iterations: u32,
}

/// One sampled point of a curve, for charts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub spend: f64,
    pub revenue: f64,
    pub roas: f64,
    pub profit: f64,
}

/// Golden-section bracket with its two interior probes and their values.
#[derive(Clone, Copy, Debug)]
struct Bracket {
    a: f64,
    b: f64,
    x1: f64,
    x2: f64,
    f1: f64,
    f2: f64,
}

fn resphi() -> f64 {
    let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
    2.0 - phi
}

fn open_bracket<F: Fn(f64) -> f64>(f: &F, a: f64, b: f64) -> Bracket {
    let r = resphi();
    let x1 = a + r * (b - a);
    let x2 = b - r * (b - a);
    Bracket {
        a,
        b,
        x1,
        x2,
        f1: f(x1),
        f2: f(x2),
    }
}

/// Drop the side of the bracket that cannot hold the maximum. One new evaluation per step.
fn narrow<F: Fn(f64) -> f64>(f: &F, br: Bracket) -> Bracket {
    let r = resphi();
    if br.f1 < br.f2 {
        let a = br.x1;
        let x2 = br.b - r * (br.b - a);
        Bracket {
            a,
            b: br.b,
            x1: br.x2,
            x2,
            f1: br.f2,
            f2: f(x2),
        }
    } else {
        let b = br.x2;
        let x1 = br.a + r * (b - br.a);
        Bracket {
            a: br.a,
            b,
            x1,
            x2: br.x1,
            f1: f(x1),
            f2: br.f1,
        }
    }
}

/// Maximise a unimodal `f` on `[lo, hi]`. Returns the final bracket midpoint and iterations used.
pub fn golden_section_max<F: Fn(f64) -> f64>(
    f: F,
    lo: f64,
    hi: f64,
    tolerance: f64,
    max_iterations: u32,
) -> (f64, u32) {
    let mut br = open_bracket(&f, lo, hi);
    let mut iterations = 0;
    while br.b - br.a >= tolerance && iterations < max_iterations {
        br = narrow(&f, br);
        iterations += 1;
    }
    ((br.a + br.b) / 2.0, iterations)
}

/// Budget in `[min_budget, max_budget]` that maximises profit at `profit_margin`.
///
/// When the profit curve is monotone the best point is a bound; bounds are checked against
/// the search midpoint so the result never loses to either end of the interval.
pub fn optimal_budget<C: RevenueCurve + ?Sized>(
    curve: &C,
    profit_margin: f64,
    min_budget: f64,
    max_budget: f64,
) -> OptimalBudget {
    let lo = finite_or_zero(min_budget).max(0.0);
    let hi = finite_or_zero(max_budget);
    let objective = |s: f64| profit(curve, s, profit_margin);

    let (budget, iterations) = if hi > lo {
        let (mid, iters) =
            golden_section_max(&objective, lo, hi, SEARCH_TOLERANCE, MAX_ITERATIONS);
        let best = [lo, hi]
            .into_iter()
            .fold(mid, |best, x| if objective(x) > objective(best) { x } else { best });
        (best, iters)
    } else {
        (lo, 0)
    };

    let result = OptimalBudget {
        budget,
        revenue: curve.predict_revenue(budget),
        roas: curve.predict_roas(budget),
        profit: objective(budget),
        iterations,
    };
    debug!(
        budget = result.budget,
        profit = result.profit,
        iterations,
        "optimal budget search finished"
    );
    result
}

/// Evenly spaced samples of revenue, ROAS and profit across `[lo, hi]`.
pub fn sample_curve<C: RevenueCurve + ?Sized>(
    curve: &C,
    profit_margin: f64,
    lo: f64,
    hi: f64,
    points: usize,
) -> Vec<CurvePoint> {
    if points == 0 || !(hi >= lo) {
        return Vec::new();
    }
    let step = if points > 1 {
        (hi - lo) / (points - 1) as f64
    } else {
        0.0
    };
    (0..points)
        .map(|i| {
            let spend = lo + step * i as f64;
            CurvePoint {
                spend,
                revenue: curve.predict_revenue(spend),
                roas: curve.predict_roas(spend),
                profit: profit(curve, spend, profit_margin),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_elasticity_has_no_diminishing_returns() {
        assert_eq!(manual_revenue(10_000.0, 5.0, 4.0, 0.0), 50_000.0);
        assert_eq!(effective_roas(40_000.0, 10_000.0, 4.0, 0.0), 4.0);
    }

    #[test]
    fn elasticity_degrades_roas_with_budget() {
        assert!((effective_roas(10_000.0, 10_000.0, 4.0, 1.0) - 4.0).abs() < 1e-12);
        // 4x budget at e=1: 4^-0.5 = 0.5
        assert!((effective_roas(40_000.0, 10_000.0, 4.0, 1.0) - 2.0).abs() < 1e-12);
        // bidding to a higher ROAS than reference costs volume
        assert!(manual_revenue(10_000.0, 8.0, 4.0, 1.0) < 10_000.0 * 8.0);
    }

    #[test]
    fn non_positive_inputs_short_circuit() {
        assert_eq!(manual_revenue(0.0, 4.0, 4.0, 1.0), 0.0);
        assert_eq!(manual_revenue(1000.0, -1.0, 4.0, 1.0), 0.0);
        assert_eq!(manual_revenue(1000.0, 4.0, 0.0, 1.0), 0.0);
        assert_eq!(effective_roas(1000.0, 0.0, 4.0, 1.0), 0.0);
        assert_eq!(calibrated_roas(0.0, 1.0, -0.3), 0.0);
        assert_eq!(calibrated_roas(-5.0, 1.0, -0.3), 0.0);
        let cfg = VolumeConfig::Calibrated { a: 1.0, b: -0.3 };
        assert_eq!(cfg.predict_revenue(-100.0), 0.0);
    }

    #[test]
    fn calibrated_prediction() {
        let cfg = VolumeConfig::Calibrated {
            a: 10.0_f64.ln(),
            b: -0.25,
        };
        assert!((cfg.predict_roas(10_000.0) - 1.0).abs() < 1e-9);
        assert!((cfg.predict_revenue(10_000.0) - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn golden_section_matches_closed_form() {
        // profit = 0.5 * 1000 * s^0.5 - s peaks at s = 62_500
        let cfg = VolumeConfig::Calibrated {
            a: 1000.0_f64.ln(),
            b: -0.5,
        };
        let best = optimal_budget(&cfg, 0.5, 1_000.0, 500_000.0);
        assert!((best.budget - 62_500.0).abs() < SEARCH_TOLERANCE);
        assert!((best.profit - 62_500.0).abs() < 1.0);
        assert!(best.iterations > 0 && best.iterations <= MAX_ITERATIONS);
    }

    #[test]
    fn monotone_profit_returns_bound() {
        // margin too thin: every extra unit of spend loses money
        let cfg = VolumeConfig::Calibrated { a: 0.0, b: -0.2 };
        let best = optimal_budget(&cfg, 0.5, 1_000.0, 100_000.0);
        assert_eq!(best.budget, 1_000.0);
    }

    #[test]
    fn empty_interval_evaluates_lower_bound() {
        let cfg = VolumeConfig::Calibrated { a: 2.0, b: -0.3 };
        let best = optimal_budget(&cfg, 0.4, 5_000.0, 5_000.0);
        assert_eq!(best.budget, 5_000.0);
        assert_eq!(best.iterations, 0);
    }

    #[test]
    fn manual_curve_optimum_beats_bounds() {
        let cfg = VolumeConfig::Manual {
            elasticity: 0.5,
            reference_roas: 6.0,
            reference_budget: 20_000.0,
        };
        let best = optimal_budget(&cfg, 0.4, 1_000.0, 1_000_000.0);
        assert!(best.profit >= profit(&cfg, 1_000.0, 0.4));
        assert!(best.profit >= profit(&cfg, 1_000_000.0, 0.4));
    }

    #[test]
    fn sampling_spans_interval() {
        let cfg = VolumeConfig::Calibrated { a: 2.0, b: -0.3 };
        let pts = sample_curve(&cfg, 0.4, 0.0, 10_000.0, 11);
        assert_eq!(pts.len(), 11);
        assert_eq!(pts[0].spend, 0.0);
        assert_eq!(pts[0].revenue, 0.0);
        assert_eq!(pts[10].spend, 10_000.0);
        assert!(sample_curve(&cfg, 0.4, 10.0, 0.0, 5).is_empty());
    }

    proptest! {
        #[test]
        fn optimum_never_loses_to_bounds(
            a in 0.5f64..6.0,
            b in -0.9f64..-0.05,
            margin in 0.1f64..0.9,
            lo in 100.0f64..5_000.0,
            width in 1_000.0f64..2_000_000.0,
        ) {
            let cfg = VolumeConfig::Calibrated { a, b };
            let hi = lo + width;
            let best = optimal_budget(&cfg, margin, lo, hi);
            prop_assert!(best.profit >= profit(&cfg, lo, margin));
            prop_assert!(best.profit >= profit(&cfg, hi, margin));
            prop_assert!(best.budget >= lo && best.budget <= hi);
        }
    }
}
