#![deny(warnings)]

//! Twelve-month ROI projection for a chosen scenario.
//!
//! An "act" path spends the scenario budget with a linear ramp-up and a ROAS variance, and a
//! "wait" path spends nothing. Both carry the same organic baseline revenue (zero by default).

use chrono::{Datelike, NaiveDate};
use roas_core::{RampConfig, RampPreset};
use roas_econ::ReverseScenario;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Months projected.
pub const HORIZON_MONTHS: u32 = 12;

/// Break-even month reported when the act path never turns positive within the horizon.
pub const NO_BREAK_EVEN: u32 = HORIZON_MONTHS + 1;

/// Share of full monthly spend in the first ramp month.
pub const RAMP_START: f64 = 0.3;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// The three numbers a projection needs from a scenario.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionInput {
    /// Annual media budget.
    pub budget: f64,
    pub roas: f64,
    /// Fraction of revenue kept as profit before subtracting the month's spend.
    pub profit_margin: f64,
}

impl From<&ReverseScenario> for ProjectionInput {
    fn from(s: &ReverseScenario) -> Self {
        Self {
            budget: s.budget,
            roas: s.required_roas,
            profit_margin: s.profit_margin,
        }
    }
}

/// Knobs for one projection run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionOptions {
    pub ramp: RampConfig,
    /// Revenue earned every month without advertising, on both paths.
    pub baseline_monthly_revenue: f64,
    /// First projected month; labels fall back to "Month N" without it.
    pub start: Option<NaiveDate>,
}

impl ProjectionOptions {
    pub fn preset(preset: RampPreset) -> Self {
        Self {
            ramp: preset.config(),
            baseline_monthly_revenue: 0.0,
            start: None,
        }
    }
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self::preset(RampPreset::Expected)
    }
}

/// One month on one path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthRecord {
    /// 1-based month index.
    pub month: u32,
    pub label: String,
    pub revenue: f64,
    pub ad_spend: f64,
    pub profit: f64,
    pub cumulative_profit: f64,
    pub cumulative_revenue: f64,
}

/// Act and wait paths with their aggregate comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiProjection {
    pub act: Vec<MonthRecord>,
    pub wait: Vec<MonthRecord>,
    pub total_ad_spend: f64,
    pub revenue_delta: f64,
    pub profit_delta: f64,
    /// First month where cumulative incremental profit is positive, or [`NO_BREAK_EVEN`].
    pub break_even_month: u32,
    pub roi_pct: f64,
    pub ramp: RampConfig,
}

impl RoiProjection {
    pub fn breaks_even(&self) -> bool {
        self.break_even_month <= HORIZON_MONTHS
    }
}

/// Spend multiplier for a 1-based month: rises linearly from 0.3 and holds at 1.0 once the
/// ramp window has passed.
pub fn ramp_factor(month: u32, ramp_months: u32) -> f64 {
    if ramp_months == 0 {
        return 1.0;
    }
    let progress = month.saturating_sub(1) as f64 / ramp_months as f64;
    (RAMP_START + (1.0 - RAMP_START) * progress).min(1.0)
}

fn month_label(month: u32, start: Option<NaiveDate>) -> String {
    match start {
        Some(d) => {
            let idx = d.year() as i64 * 12 + d.month0() as i64 + (month as i64 - 1);
            let (year, month0) = (idx.div_euclid(12), idx.rem_euclid(12) as usize);
            format!("{} {}", MONTH_NAMES[month0], year)
        }
        None => format!("Month {month}"),
    }
}

#[derive(Default)]
struct Running {
    profit: f64,
    revenue: f64,
}

impl Running {
    fn record(
        &mut self,
        month: u32,
        label: String,
        revenue: f64,
        ad_spend: f64,
        profit: f64,
    ) -> MonthRecord {
        self.profit += profit;
        self.revenue += revenue;
        MonthRecord {
            month,
            label,
            revenue,
            ad_spend,
            profit,
            cumulative_profit: self.profit,
            cumulative_revenue: self.revenue,
        }
    }
}

/// Project `input` over [`HORIZON_MONTHS`] months.
pub fn project_input(input: &ProjectionInput, options: &ProjectionOptions) -> RoiProjection {
    let full_monthly_spend = (input.budget / HORIZON_MONTHS as f64).max(0.0);
    let roas = (input.roas * (1.0 + options.ramp.variance_pct / 100.0)).max(0.0);
    let organic = options.baseline_monthly_revenue.max(0.0);
    let margin = input.profit_margin;

    let mut act_run = Running::default();
    let mut wait_run = Running::default();
    let mut act = Vec::with_capacity(HORIZON_MONTHS as usize);
    let mut wait = Vec::with_capacity(HORIZON_MONTHS as usize);
    let mut total_ad_spend = 0.0;
    let mut break_even_month = NO_BREAK_EVEN;

    for month in 1..=HORIZON_MONTHS {
        let label = month_label(month, options.start);

        let spend = full_monthly_spend * ramp_factor(month, options.ramp.ramp_months);
        let revenue = spend * roas + organic;
        let a = act_run.record(month, label.clone(), revenue, spend, revenue * margin - spend);
        let w = wait_run.record(month, label, organic, 0.0, organic * margin);

        total_ad_spend += spend;
        if break_even_month == NO_BREAK_EVEN && a.cumulative_profit - w.cumulative_profit > 0.0 {
            break_even_month = month;
        }
        act.push(a);
        wait.push(w);
    }

    let profit_delta = act_run.profit - wait_run.profit;
    let roi_pct = if total_ad_spend > 0.0 {
        profit_delta / total_ad_spend * 100.0
    } else {
        0.0
    };
    debug!(
        total_ad_spend,
        profit_delta, break_even_month, roi_pct, "projected ROI"
    );

    RoiProjection {
        act,
        wait,
        total_ad_spend,
        revenue_delta: act_run.revenue - wait_run.revenue,
        profit_delta,
        break_even_month,
        roi_pct,
        ramp: options.ramp,
    }
}

/// Project a reverse-solver scenario.
pub fn project(scenario: &ReverseScenario, options: &ProjectionOptions) -> RoiProjection {
    project_input(&ProjectionInput::from(scenario), options)
}

/// Worst, expected and best projections for one scenario.
///
/// `ramp` supplies each preset's settings; pass `RampPreset::config` for the built-in values.
pub fn project_presets<F>(
    scenario: &ReverseScenario,
    ramp: F,
) -> Vec<(RampPreset, RoiProjection)>
where
    F: Fn(RampPreset) -> RampConfig,
{
    RampPreset::ALL
        .into_iter()
        .map(|p| {
            let options = ProjectionOptions {
                ramp: ramp(p),
                ..ProjectionOptions::default()
            };
            (p, project(scenario, &options))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use roas_core::{BusinessParameters, ReverseGoal, ShippingCost};
    use roas_econ::{solve, UnitEconomicsEngine};

    fn flat() -> ProjectionOptions {
        ProjectionOptions {
            ramp: RampConfig {
                ramp_months: 0,
                variance_pct: 0.0,
            },
            baseline_monthly_revenue: 0.0,
            start: None,
        }
    }

    #[test]
    fn ramp_rises_then_holds() {
        assert_eq!(ramp_factor(1, 3), 0.3);
        assert!((ramp_factor(2, 3) - (0.3 + 0.7 / 3.0)).abs() < 1e-12);
        assert_eq!(ramp_factor(4, 3), 1.0);
        assert_eq!(ramp_factor(12, 3), 1.0);
        assert_eq!(ramp_factor(1, 0), 1.0);
    }

    #[test]
    fn flat_profitable_plan() {
        let input = ProjectionInput {
            budget: 120_000.0,
            roas: 4.0,
            profit_margin: 0.5,
        };
        let p = project_input(&input, &flat());
        assert_eq!(p.act.len(), 12);
        assert_eq!(p.act[0].ad_spend, 10_000.0);
        assert_eq!(p.act[0].revenue, 40_000.0);
        assert_eq!(p.act[0].profit, 10_000.0);
        assert_eq!(p.act[11].cumulative_profit, 120_000.0);
        assert_eq!(p.break_even_month, 1);
        assert_eq!(p.roi_pct, 100.0);
        assert!(p.wait.iter().all(|m| m.revenue == 0.0 && m.profit == 0.0));
        assert_eq!(p.act[0].label, "Month 1");
    }

    #[test]
    fn losing_plan_never_breaks_even() {
        let input = ProjectionInput {
            budget: 120_000.0,
            roas: 4.0,
            profit_margin: 0.2,
        };
        let p = project_input(&input, &ProjectionOptions::default());
        assert_eq!(p.break_even_month, NO_BREAK_EVEN);
        assert!(!p.breaks_even());
        assert!(p.roi_pct < 0.0);
    }

    #[test]
    fn variance_scales_roas() {
        let input = ProjectionInput {
            budget: 120_000.0,
            roas: 4.0,
            profit_margin: 0.5,
        };
        let mut opts = flat();
        opts.ramp.variance_pct = -20.0;
        let p = project_input(&input, &opts);
        assert!((p.act[0].revenue - 32_000.0).abs() < 1e-9);
    }

    #[test]
    fn zero_budget_has_zero_roi() {
        let input = ProjectionInput {
            budget: 0.0,
            roas: 4.0,
            profit_margin: 0.5,
        };
        let p = project_input(&input, &flat());
        assert_eq!(p.total_ad_spend, 0.0);
        assert_eq!(p.roi_pct, 0.0);
        assert_eq!(p.break_even_month, NO_BREAK_EVEN);
    }

    #[test]
    fn labels_follow_start_date() {
        let mut opts = flat();
        opts.start = NaiveDate::from_ymd_opt(2026, 11, 1);
        let p = project_input(
            &ProjectionInput {
                budget: 12_000.0,
                roas: 3.0,
                profit_margin: 0.5,
            },
            &opts,
        );
        assert_eq!(p.act[0].label, "Nov 2026");
        assert_eq!(p.act[1].label, "Dec 2026");
        assert_eq!(p.act[2].label, "Jan 2027");
        assert_eq!(p.wait[2].label, "Jan 2027");
    }

    #[test]
    fn organic_baseline_counts_on_both_paths() {
        let mut opts = flat();
        opts.baseline_monthly_revenue = 5_000.0;
        let input = ProjectionInput {
            budget: 120_000.0,
            roas: 4.0,
            profit_margin: 0.5,
        };
        let p = project_input(&input, &opts);
        assert_eq!(p.wait[0].revenue, 5_000.0);
        assert_eq!(p.act[0].revenue, 45_000.0);
        assert!((p.revenue_delta - 480_000.0).abs() < 1e-6);
        assert!((p.profit_delta - 120_000.0).abs() < 1e-6);
        assert!(p
            .wait
            .windows(2)
            .all(|w| w[1].cumulative_revenue > w[0].cumulative_revenue));
    }

    #[test]
    fn presets_from_solved_scenario() {
        let mut business = BusinessParameters::new(1000.0, "fashion");
        business.gross_margin_pct = Some(50.0);
        business.return_rate_pct = Some(0.0);
        business.shipping = Some(ShippingCost::Fixed(0.0));
        business.payment_fee_pct = Some(0.0);
        let goal = ReverseGoal {
            revenue_target: 1_000_000.0,
            media_budget: 250_000.0,
            profit_margin_goal: 0.2,
            business,
            min_revenue_pct: None,
        };
        let out = solve(&UnitEconomicsEngine::default(), &goal).unwrap();
        let scenario = out.scenarios.unwrap().recommended().unwrap().clone();
        let runs = project_presets(&scenario, RampPreset::config);
        assert_eq!(runs.len(), 3);
        let revenue: Vec<f64> = runs.iter().map(|(_, p)| p.revenue_delta).collect();
        assert!(revenue[0] < revenue[1] && revenue[1] < revenue[2]);
        assert_eq!(runs[1].1.act[0].ad_spend, scenario.budget / 12.0 * 0.3);

        let flat_best = |p: RampPreset| match p {
            RampPreset::Best => RampConfig {
                ramp_months: 0,
                variance_pct: 0.0,
            },
            other => other.config(),
        };
        let runs = project_presets(&scenario, flat_best);
        assert_eq!(runs[2].1.ramp.ramp_months, 0);
        assert_eq!(runs[2].1.act[0].ad_spend, scenario.budget / 12.0);
        assert_eq!(runs[0].1.ramp, RampPreset::Worst.config());
    }

    #[test]
    fn projection_serializes() {
        let p = project_input(
            &ProjectionInput {
                budget: 12_000.0,
                roas: 3.0,
                profit_margin: 0.5,
            },
            &flat(),
        );
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["act"].as_array().unwrap().len(), 12);
        assert_eq!(json["ramp"]["ramp_months"], 0);
    }

    proptest! {
        #[test]
        fn cumulative_paths_and_break_even(
            budget in 1_000.0f64..5_000_000.0,
            roas in 0.5f64..15.0,
            margin in 0.05f64..0.9,
            ramp in 0u32..6,
            variance in -30.0f64..30.0,
        ) {
            let opts = ProjectionOptions {
                ramp: RampConfig {
                    ramp_months: ramp,
                    variance_pct: variance,
                },
                baseline_monthly_revenue: 0.0,
                start: None,
            };
            let input = ProjectionInput {
                budget,
                roas,
                profit_margin: margin,
            };
            let p = project_input(&input, &opts);
            prop_assert!(p
                .act
                .windows(2)
                .all(|w| w[1].cumulative_revenue > w[0].cumulative_revenue));
            prop_assert!(p
                .wait
                .windows(2)
                .all(|w| w[1].cumulative_revenue >= w[0].cumulative_revenue));
            if p.breaks_even() {
                let idx = (p.break_even_month - 1) as usize;
                prop_assert!(p.act[idx].cumulative_profit > 0.0);
                if idx > 0 {
                    prop_assert!(p.act[idx - 1].cumulative_profit <= 0.0);
                }
            }
        }
    }
}
