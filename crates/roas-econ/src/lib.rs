#![deny(warnings)]

//! Unit economics and ROAS thresholds.
//!
//! This crate provides:
//! - Contribution margin per order from business parameters and industry defaults
//! - Break-even and target ROAS (and their COS equivalents)
//! - The reverse solver that classifies a revenue goal and builds strategy scenarios
//!
//! Infeasible thresholds are reported as `f64::INFINITY` plus explicit flags; nothing here
//! fails on an unprofitable business.

use roas_core::{cos_from_roas, BusinessParameters, IndustryTable, ShippingCost};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod reverse;

pub use reverse::{
    classify, recommend, solve, status_text, GoalStatus, ReverseOutcome, ReverseScenario,
    ScenarioKind, ScenarioSet,
};

/// Per-order economics before advertising.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnitEconomics {
    pub aov: f64,
    pub product_cost: f64,
    /// Product cost scaled by the return rate.
    pub effective_product_cost: f64,
    pub shipping_cost: f64,
    pub payment_fee: f64,
    /// AOV minus all non-advertising costs. Negative means every order loses money.
    pub contribution: f64,
    /// Contribution as a fraction of AOV.
    pub contribution_rate: f64,
    /// Return rate as a fraction.
    pub return_rate: f64,
    /// Resolved lifetime-value multiplier (used only in LTV mode).
    pub ltv_multiplier: f64,
}

/// ROAS and COS thresholds for one desired margin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoasThresholds {
    /// `INFINITY` when contribution <= 0.
    pub break_even_roas: f64,
    /// `INFINITY` when the desired margin cannot be reached.
    pub target_roas: f64,
    pub break_even_cos: f64,
    pub target_cos: f64,
    pub max_ad_cost_break_even: f64,
    pub max_ad_cost_target: f64,
    /// True when the desired margin leaves no room for ad spend.
    pub margin_unreachable: bool,
    /// Contribution per order is positive.
    pub is_profitable: bool,
    /// Desired margin fraction these thresholds were computed for.
    pub desired_margin: f64,
    /// Revenue per order the ROAS figures are measured against.
    pub effective_aov: f64,
}

/// Computes unit economics against an injected industry-defaults table.
#[derive(Clone, Debug, Default)]
pub struct UnitEconomicsEngine {
    table: IndustryTable,
}

impl UnitEconomicsEngine {
    pub fn new(table: IndustryTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &IndustryTable {
        &self.table
    }

    /// Resolve costs and contribution for one order.
    pub fn unit_economics(&self, p: &BusinessParameters) -> UnitEconomics {
        let defaults = self.table.get(&p.industry);
        let aov = p.aov;

        let product_cost = match (p.product_cost, p.gross_margin_pct) {
            (Some(cost), _) => cost,
            (None, Some(gm)) => aov * (1.0 - gm / 100.0),
            (None, None) => aov * (1.0 - defaults.margin_pct / 100.0),
        };
        let return_rate = p.return_rate_pct.unwrap_or(defaults.return_rate_pct) / 100.0;
        // Returns add cost exposure; revenue is left untouched.
        let effective_product_cost = product_cost * (1.0 + return_rate);

        let shipping_cost = match p.shipping {
            Some(ShippingCost::Fixed(c)) => c,
            Some(ShippingCost::PercentOfAov(pct)) => aov * pct / 100.0,
            None => defaults.shipping_cost,
        };
        let payment_fee = aov * p.payment_fee_pct.unwrap_or(defaults.payment_fee_pct) / 100.0;

        let contribution = aov - (effective_product_cost + shipping_cost + payment_fee);
        let contribution_rate = if aov > 0.0 { contribution / aov } else { 0.0 };

        UnitEconomics {
            aov,
            product_cost,
            effective_product_cost,
            shipping_cost,
            payment_fee,
            contribution,
            contribution_rate,
            return_rate,
            ltv_multiplier: p.ltv_multiplier.unwrap_or(defaults.ltv_multiplier),
        }
    }

    /// Unit economics plus thresholds using the margin and LTV settings in `p`.
    pub fn thresholds_for(&self, p: &BusinessParameters) -> (UnitEconomics, RoasThresholds) {
        let econ = self.unit_economics(p);
        let ltv = p.ltv_mode.then_some(econ.ltv_multiplier);
        let t = thresholds(&econ, p.desired_margin_fraction(), ltv);
        (econ, t)
    }
}

/// Break-even and target thresholds.
///
/// `desired_margin` is a fraction of AOV. `ltv_multiplier` switches on LTV mode, where ROAS is
/// measured against `aov * multiplier`.
pub fn thresholds(
    econ: &UnitEconomics,
    desired_margin: f64,
    ltv_multiplier: Option<f64>,
) -> RoasThresholds {
    let effective_aov = econ.aov * ltv_multiplier.unwrap_or(1.0);
    let contribution = econ.contribution;
    let is_profitable = contribution > 0.0;

    let break_even_roas = if is_profitable {
        effective_aov / contribution
    } else {
        f64::INFINITY
    };

    let max_ad_cost_target = contribution - effective_aov * desired_margin;
    let margin_unreachable = max_ad_cost_target <= 0.0;
    let target_roas = if margin_unreachable {
        f64::INFINITY
    } else {
        effective_aov / max_ad_cost_target
    };

    debug!(
        break_even_roas,
        target_roas, margin_unreachable, "computed ROAS thresholds"
    );

    RoasThresholds {
        break_even_roas,
        target_roas,
        break_even_cos: cos_from_roas(break_even_roas),
        target_cos: cos_from_roas(target_roas),
        max_ad_cost_break_even: contribution,
        max_ad_cost_target,
        margin_unreachable,
        is_profitable,
        desired_margin,
        effective_aov,
    }
}

/// Profit per order after paying `effective_aov / roas` in advertising.
///
/// Uses the same AOV basis as `t`, so an order at break-even ROAS earns nothing.
pub fn profit_per_order(econ: &UnitEconomics, t: &RoasThresholds, roas: f64) -> f64 {
    econ.contribution - ad_cost_per_order(t.effective_aov, roas)
}

/// Ad cost needed per order at a given ROAS; 0 for non-positive or infinite ROAS.
pub fn ad_cost_per_order(aov: f64, roas: f64) -> f64 {
    if roas.is_finite() && roas > 0.0 {
        aov / roas
    } else {
        0.0
    }
}
