//! Reverse solver: from a revenue target and budget back to the ROAS it demands.
//!
//! Goal status uses three ordered, half-open zones on the required ROAS:
//!
//! - `required < break_even` is achievable
//! - `break_even <= required < target` is tight
//! - `required >= target` is impossible
//!
//! A business with no positive contribution, or whose margin goal leaves no room for ads, is
//! always impossible.

use crate::{
    profit_per_order, thresholds, RoasThresholds, UnitEconomics, UnitEconomicsEngine,
};
use roas_core::format::{format_currency, format_percent, format_roas};
use roas_core::{cos_from_roas, validate_goal, ReverseGoal, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How reachable a revenue goal is with the given budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Achievable,
    Tight,
    Impossible,
}

impl GoalStatus {
    pub fn label(self) -> &'static str {
        match self {
            GoalStatus::Achievable => "achievable",
            GoalStatus::Tight => "tight",
            GoalStatus::Impossible => "impossible",
        }
    }
}

/// The three strategies every solve produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Budget needed to hit the exact revenue target at the margin-safe ROAS.
    BudgetForTarget,
    /// Revenue the original budget buys at the margin-safe ROAS.
    MaxRevenue,
    /// Smallest budget that still clears the minimum acceptable revenue.
    MaxProfit,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] = [
        ScenarioKind::BudgetForTarget,
        ScenarioKind::MaxRevenue,
        ScenarioKind::MaxProfit,
    ];

    /// Stable key used by downstream consumers.
    pub fn key(self) -> &'static str {
        match self {
            ScenarioKind::BudgetForTarget => "budget_for_target",
            ScenarioKind::MaxRevenue => "max_revenue",
            ScenarioKind::MaxProfit => "max_profit",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScenarioKind::BudgetForTarget => "Hit the revenue target",
            ScenarioKind::MaxRevenue => "Maximise revenue on current budget",
            ScenarioKind::MaxProfit => "Maximise profit above a revenue floor",
        }
    }
}

/// One candidate plan with its deltas against the goal as entered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReverseScenario {
    pub kind: ScenarioKind,
    pub label: String,
    pub budget: f64,
    pub revenue: f64,
    pub required_roas: f64,
    pub required_cos: f64,
    /// Profit as a fraction of revenue.
    pub profit_margin: f64,
    pub orders: f64,
    /// Ad cost per order (CPA).
    pub ad_cost_per_order: f64,
    pub profit: f64,
    pub budget_delta: f64,
    pub budget_delta_pct: f64,
    pub revenue_delta: f64,
    pub revenue_delta_pct: f64,
    /// Profit difference against the original budget and revenue target.
    pub profit_delta: f64,
    pub is_recommended: bool,
    pub rationale: String,
}

/// The three scenarios, keyed by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSet {
    pub budget_for_target: ReverseScenario,
    pub max_revenue: ReverseScenario,
    pub max_profit: ReverseScenario,
}

impl ScenarioSet {
    pub fn get(&self, kind: ScenarioKind) -> &ReverseScenario {
        match kind {
            ScenarioKind::BudgetForTarget => &self.budget_for_target,
            ScenarioKind::MaxRevenue => &self.max_revenue,
            ScenarioKind::MaxProfit => &self.max_profit,
        }
    }

    fn get_mut(&mut self, kind: ScenarioKind) -> &mut ReverseScenario {
        match kind {
            ScenarioKind::BudgetForTarget => &mut self.budget_for_target,
            ScenarioKind::MaxRevenue => &mut self.max_revenue,
            ScenarioKind::MaxProfit => &mut self.max_profit,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReverseScenario> {
        ScenarioKind::ALL.into_iter().map(move |k| self.get(k))
    }

    pub fn recommended(&self) -> Option<&ReverseScenario> {
        self.iter().find(|s| s.is_recommended)
    }
}

/// Everything the reverse solver derives from one goal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReverseOutcome {
    pub required_roas: f64,
    pub required_cos: f64,
    pub status: GoalStatus,
    pub status_text: String,
    pub unit_economics: UnitEconomics,
    pub thresholds: RoasThresholds,
    /// ROAS the scenarios plan at: target, or break-even when the margin goal is out of reach.
    pub planning_roas: f64,
    /// `None` when no ROAS is profitable at all.
    pub scenarios: Option<ScenarioSet>,
}

/// Place a required ROAS into one of the three status zones.
pub fn classify(required_roas: f64, t: &RoasThresholds) -> GoalStatus {
    if !t.is_profitable || t.margin_unreachable {
        return GoalStatus::Impossible;
    }
    if required_roas < t.break_even_roas {
        GoalStatus::Achievable
    } else if required_roas < t.target_roas {
        GoalStatus::Tight
    } else {
        GoalStatus::Impossible
    }
}

/// Scenario recommended for a status.
pub fn recommended_kind(status: GoalStatus) -> ScenarioKind {
    match status {
        GoalStatus::Achievable => ScenarioKind::BudgetForTarget,
        GoalStatus::Tight => ScenarioKind::MaxProfit,
        GoalStatus::Impossible => ScenarioKind::MaxRevenue,
    }
}

/// Human-readable explanation of a status.
pub fn status_text(status: GoalStatus, required_roas: f64, t: &RoasThresholds) -> String {
    let req = format_roas(required_roas);
    let be = format_roas(t.break_even_roas);
    let target = format_roas(t.target_roas);
    match status {
        GoalStatus::Achievable => format!(
            "Required ROAS {req} is below break-even {be}: \
             the budget comfortably covers the revenue target."
        ),
        GoalStatus::Tight => format!(
            "Required ROAS {req} sits between break-even {be} and target {target}: \
             reachable, but the margin goal is at risk."
        ),
        GoalStatus::Impossible if !t.is_profitable => format!(
            "Contribution per order is {} or less: no ROAS makes advertising profitable.",
            format_currency(t.max_ad_cost_break_even.max(0.0))
        ),
        GoalStatus::Impossible if t.margin_unreachable => format!(
            "A {} margin cannot be reached with the current cost structure (break-even ROAS {be}).",
            format_percent(t.desired_margin)
        ),
        GoalStatus::Impossible => format!(
            "Required ROAS {req} is at or above target {target}: \
             the revenue target is out of reach with this budget."
        ),
    }
}

/// Copy of `set` with exactly the scenario matching `status` marked recommended.
pub fn recommend(set: &ScenarioSet, status: GoalStatus) -> ScenarioSet {
    let mut out = set.clone();
    for kind in ScenarioKind::ALL {
        out.get_mut(kind).is_recommended = false;
    }
    out.get_mut(recommended_kind(status)).is_recommended = true;
    out
}

fn pct_of(delta: f64, base: f64) -> f64 {
    if base != 0.0 {
        delta / base * 100.0
    } else {
        0.0
    }
}

struct Plan<'a> {
    econ: &'a UnitEconomics,
    thresholds: &'a RoasThresholds,
    goal: &'a ReverseGoal,
    baseline_profit: f64,
}

impl Plan<'_> {
    fn profit_at(&self, revenue: f64, roas: f64) -> (f64, f64, f64) {
        let orders = if self.econ.aov > 0.0 {
            revenue / self.econ.aov
        } else {
            0.0
        };
        let margin = profit_per_order(self.econ, self.thresholds, roas);
        (orders, self.econ.contribution - margin, orders * margin)
    }

    fn scenario(
        &self,
        kind: ScenarioKind,
        budget: f64,
        revenue: f64,
        roas: f64,
        rationale: String,
    ) -> ReverseScenario {
        let (orders, cpa, profit) = self.profit_at(revenue, roas);
        let budget_delta = budget - self.goal.media_budget;
        let revenue_delta = revenue - self.goal.revenue_target;
        ReverseScenario {
            kind,
            label: kind.label().to_string(),
            budget,
            revenue,
            required_roas: roas,
            required_cos: cos_from_roas(roas),
            profit_margin: if revenue > 0.0 { profit / revenue } else { 0.0 },
            orders,
            ad_cost_per_order: cpa,
            profit,
            budget_delta,
            budget_delta_pct: pct_of(budget_delta, self.goal.media_budget),
            revenue_delta,
            revenue_delta_pct: pct_of(revenue_delta, self.goal.revenue_target),
            profit_delta: profit - self.baseline_profit,
            is_recommended: false,
            rationale,
        }
    }
}

fn build_scenarios(
    econ: &UnitEconomics,
    t: &RoasThresholds,
    goal: &ReverseGoal,
    required_roas: f64,
    roas: f64,
    at_break_even: bool,
) -> ScenarioSet {
    let mut plan = Plan {
        econ,
        thresholds: t,
        goal,
        baseline_profit: 0.0,
    };
    plan.baseline_profit = plan.profit_at(goal.revenue_target, required_roas).2;

    let note = if at_break_even {
        " The margin goal is out of reach, so this plans at break-even ROAS."
    } else {
        ""
    };
    let r = format_roas(roas);

    let target_budget = goal.revenue_target / roas;
    let budget_for_target = plan.scenario(
        ScenarioKind::BudgetForTarget,
        target_budget,
        goal.revenue_target,
        roas,
        format!(
            "Spend {} at ROAS {r} to reach the full revenue target of {}.{note}",
            format_currency(target_budget),
            format_currency(goal.revenue_target)
        ),
    );

    let max_revenue = goal.media_budget * roas;
    let max_revenue = plan.scenario(
        ScenarioKind::MaxRevenue,
        goal.media_budget,
        max_revenue,
        roas,
        format!(
            "Keep the {} budget; at ROAS {r} it brings in {} ({} of target).{note}",
            format_currency(goal.media_budget),
            format_currency(max_revenue),
            format_percent(max_revenue / goal.revenue_target)
        ),
    );

    let min_pct = goal.min_revenue_pct();
    let floor = goal.revenue_target * min_pct / 100.0;
    let floor_budget = floor / roas;
    let max_profit = plan.scenario(
        ScenarioKind::MaxProfit,
        floor_budget,
        floor,
        roas,
        format!(
            "Accept {min_pct:.0}% of target ({}) and spend only {} at ROAS {r}, \
             trading revenue for margin.{note}",
            format_currency(floor),
            format_currency(floor_budget)
        ),
    );

    ScenarioSet {
        budget_for_target,
        max_revenue,
        max_profit,
    }
}

/// Solve a reverse goal: required ROAS, status and the recommended scenario set.
///
/// Fails fast on invalid goals; unprofitable businesses produce an outcome without scenarios.
pub fn solve(
    engine: &UnitEconomicsEngine,
    goal: &ReverseGoal,
) -> Result<ReverseOutcome, ValidationError> {
    validate_goal(goal)?;

    let econ = engine.unit_economics(&goal.business);
    let ltv = goal.business.ltv_mode.then_some(econ.ltv_multiplier);
    let t = thresholds(&econ, goal.profit_margin_goal, ltv);

    let required_roas = goal.revenue_target / goal.media_budget;
    let status = classify(required_roas, &t);

    let (planning_roas, at_break_even) = if t.target_roas.is_finite() {
        (t.target_roas, false)
    } else {
        (t.break_even_roas, true)
    };
    let scenarios = planning_roas.is_finite().then(|| {
        let set = build_scenarios(&econ, &t, goal, required_roas, planning_roas, at_break_even);
        recommend(&set, status)
    });

    debug!(
        required_roas,
        status = status.label(),
        planning_roas,
        "solved reverse goal"
    );

    Ok(ReverseOutcome {
        required_roas,
        required_cos: cos_from_roas(required_roas),
        status,
        status_text: status_text(status, required_roas, &t),
        unit_economics: econ,
        thresholds: t,
        planning_roas,
        scenarios,
    })
}
