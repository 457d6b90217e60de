#![deny(warnings)]

//! Core domain records and invariants for the ROAS planner.
//!
//! This crate defines the serializable input records shared by every engine,
//! the injectable industry-defaults table, and validation helpers that reject
//! out-of-range goals before any computation runs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

pub mod format;

/// Desired profit margin (percent of AOV) used when a caller supplies none.
pub const DEFAULT_DESIRED_MARGIN_PCT: f64 = 10.0;

/// Revenue floor for the max-profit scenario, as percent of the revenue target.
pub const DEFAULT_MIN_REVENUE_PCT: f64 = 80.0;

/// Industry key, e.g. "fashion" or "electronics".
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IndustryId(pub String);

impl From<&str> for IndustryId {
    fn from(s: &str) -> Self {
        IndustryId(s.to_string())
    }
}

/// Per-industry cost assumptions. Percent fields are plain percents (25.0 = 25%).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndustryDefaults {
    /// Gross margin on the product, percent of AOV.
    pub margin_pct: f64,
    /// Share of orders returned, percent.
    pub return_rate_pct: f64,
    /// Payment provider fee, percent of AOV.
    pub payment_fee_pct: f64,
    /// Fixed shipping cost per order in currency units.
    pub shipping_cost: f64,
    /// Lifetime value as a multiple of a single order.
    pub ltv_multiplier: f64,
}

/// Lookup table of industry defaults with a fallback for unknown keys.
///
/// The table is passed into engines explicitly; there is no process-wide copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndustryTable {
    pub entries: BTreeMap<IndustryId, IndustryDefaults>,
    pub fallback: IndustryDefaults,
}

impl IndustryTable {
    /// Built-in defaults for common e-commerce verticals.
    pub fn builtin() -> Self {
        let rows: [(&str, f64, f64, f64, f64, f64); 7] = [
            ("fashion", 60.0, 25.0, 2.5, 59.0, 1.8),
            ("beauty", 70.0, 5.0, 2.5, 49.0, 2.5),
            ("electronics", 25.0, 8.0, 2.0, 99.0, 1.3),
            ("home_garden", 45.0, 10.0, 2.5, 79.0, 1.5),
            ("food_beverage", 35.0, 2.0, 2.5, 69.0, 3.0),
            ("health", 55.0, 4.0, 2.5, 49.0, 2.8),
            ("sports", 45.0, 12.0, 2.5, 69.0, 1.6),
        ];
        let entries = rows
            .iter()
            .map(|&(id, margin, ret, fee, ship, ltv)| {
                (
                    IndustryId::from(id),
                    IndustryDefaults {
                        margin_pct: margin,
                        return_rate_pct: ret,
                        payment_fee_pct: fee,
                        shipping_cost: ship,
                        ltv_multiplier: ltv,
                    },
                )
            })
            .collect();
        Self {
            entries,
            fallback: IndustryDefaults {
                margin_pct: 45.0,
                return_rate_pct: 8.0,
                payment_fee_pct: 2.5,
                shipping_cost: 59.0,
                ltv_multiplier: 1.5,
            },
        }
    }

    /// Defaults for `id`, or the fallback entry when the key is unknown.
    pub fn get(&self, id: &IndustryId) -> &IndustryDefaults {
        match self.entries.get(id) {
            Some(d) => d,
            None => {
                warn!(industry = %id.0, "unknown industry, using fallback defaults");
                &self.fallback
            }
        }
    }

    pub fn contains(&self, id: &IndustryId) -> bool {
        self.entries.contains_key(id)
    }
}

impl Default for IndustryTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Shipping cost per order, either a fixed amount or a share of AOV.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingCost {
    Fixed(f64),
    PercentOfAov(f64),
}

/// Business inputs; `None` fields fall back to the industry defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessParameters {
    /// Average order value (> 0).
    pub aov: f64,
    pub industry: IndustryId,
    /// Explicit product cost per order. Wins over `gross_margin_pct`.
    pub product_cost: Option<f64>,
    pub gross_margin_pct: Option<f64>,
    pub return_rate_pct: Option<f64>,
    pub shipping: Option<ShippingCost>,
    pub payment_fee_pct: Option<f64>,
    pub ltv_multiplier: Option<f64>,
    /// Profit to keep after ads, percent of AOV.
    pub desired_margin_pct: Option<f64>,
    /// Measure ROAS against lifetime value instead of the first order.
    #[serde(default)]
    pub ltv_mode: bool,
}

impl BusinessParameters {
    /// Parameters with every optional override unset.
    pub fn new(aov: f64, industry: impl Into<String>) -> Self {
        Self {
            aov,
            industry: IndustryId(industry.into()),
            product_cost: None,
            gross_margin_pct: None,
            return_rate_pct: None,
            shipping: None,
            payment_fee_pct: None,
            ltv_multiplier: None,
            desired_margin_pct: None,
            ltv_mode: false,
        }
    }

    /// Desired margin as a fraction of AOV.
    pub fn desired_margin_fraction(&self) -> f64 {
        self.desired_margin_pct.unwrap_or(DEFAULT_DESIRED_MARGIN_PCT) / 100.0
    }
}

/// Revenue goal to solve backwards from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReverseGoal {
    pub revenue_target: f64,
    pub media_budget: f64,
    /// Profit margin goal as a fraction of AOV, in [0, 1].
    pub profit_margin_goal: f64,
    pub business: BusinessParameters,
    /// Minimum acceptable revenue for the max-profit scenario, percent of target (70..=100).
    pub min_revenue_pct: Option<f64>,
}

impl ReverseGoal {
    pub fn min_revenue_pct(&self) -> f64 {
        self.min_revenue_pct.unwrap_or(DEFAULT_MIN_REVENUE_PCT)
    }
}

/// One observed period of ad spend and its outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataPoint {
    /// Free-form period label as it appeared in the source, e.g. "2024-03".
    pub date: String,
    pub spend: f64,
    pub revenue: f64,
    pub roas: f64,
}

impl HistoricalDataPoint {
    /// Build a point from spend and revenue, deriving ROAS.
    pub fn from_revenue(date: impl Into<String>, spend: f64, revenue: f64) -> Self {
        let roas = if spend > 0.0 { revenue / spend } else { 0.0 };
        Self {
            date: date.into(),
            spend,
            revenue,
            roas,
        }
    }

    /// Build a point from spend and ROAS, deriving revenue.
    pub fn from_roas(date: impl Into<String>, spend: f64, roas: f64) -> Self {
        Self {
            date: date.into(),
            spend,
            revenue: spend * roas,
            roas,
        }
    }
}

/// How revenue responds to spend.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VolumeConfig {
    /// Hand-set elasticity curve anchored at a reference budget and ROAS.
    Manual {
        /// Diminishing-returns exponent in [0, 2]; 0 means none.
        elasticity: f64,
        reference_roas: f64,
        reference_budget: f64,
    },
    /// Power law fitted from history: ln(roas) = a + b * ln(spend).
    Calibrated { a: f64, b: f64 },
}

/// Named ramp-up scenarios for projections.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RampPreset {
    Worst,
    Expected,
    Best,
}

impl RampPreset {
    pub const ALL: [RampPreset; 3] = [RampPreset::Worst, RampPreset::Expected, RampPreset::Best];

    /// Built-in ramp window and ROAS variance for the preset.
    pub fn config(self) -> RampConfig {
        match self {
            RampPreset::Worst => RampConfig {
                ramp_months: 4,
                variance_pct: -20.0,
            },
            RampPreset::Expected => RampConfig {
                ramp_months: 3,
                variance_pct: 0.0,
            },
            RampPreset::Best => RampConfig {
                ramp_months: 2,
                variance_pct: 15.0,
            },
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RampPreset::Worst => "Worst case",
            RampPreset::Expected => "Expected",
            RampPreset::Best => "Best case",
        }
    }
}

/// Ramp-up window and ROAS variance applied to a projection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RampConfig {
    /// Months until spend reaches full pace; 0 disables the ramp.
    pub ramp_months: u32,
    /// Shift applied to the planned ROAS, percent (-20.0 = 20% worse).
    pub variance_pct: f64,
}

/// Validation errors for goal and parameter inputs.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("revenue target must be > 0 (got {0})")]
    NonPositiveRevenueTarget(f64),
    #[error("media budget must be > 0 (got {0})")]
    NonPositiveBudget(f64),
    #[error("profit margin goal must be within [0, 1] (got {0})")]
    MarginGoalOutOfRange(f64),
    #[error("average order value must be > 0 (got {0})")]
    NonPositiveAov(f64),
    #[error("minimum revenue percent must be within [70, 100] (got {0})")]
    MinRevenuePctOutOfRange(f64),
    #[error("{field} must be within [{min}, {max}] (got {value})")]
    PercentOutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{0} must not be negative")]
    NegativeMoney(&'static str),
    #[error("elasticity must be within [0, 2] (got {0})")]
    ElasticityOutOfRange(f64),
    #[error("{0} must be a finite number")]
    NonFinite(&'static str),
}

fn check_finite(field: &'static str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::NonFinite(field))
    }
}

fn check_pct(
    field: &'static str,
    v: Option<f64>,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    match v {
        Some(v) if !(min..=max).contains(&v) => Err(ValidationError::PercentOutOfRange {
            field,
            value: v,
            min,
            max,
        }),
        _ => Ok(()),
    }
}

/// Validate business parameters and their optional overrides.
pub fn validate_business_params(p: &BusinessParameters) -> Result<(), ValidationError> {
    if !(p.aov > 0.0) {
        return Err(ValidationError::NonPositiveAov(p.aov));
    }
    check_finite("aov", p.aov)?;
    if let Some(c) = p.product_cost {
        check_finite("product_cost", c)?;
        if c < 0.0 {
            return Err(ValidationError::NegativeMoney("product_cost"));
        }
    }
    check_pct("gross_margin_pct", p.gross_margin_pct, 0.0, 100.0)?;
    check_pct("return_rate_pct", p.return_rate_pct, 0.0, 100.0)?;
    check_pct("payment_fee_pct", p.payment_fee_pct, 0.0, 100.0)?;
    check_pct("desired_margin_pct", p.desired_margin_pct, 0.0, 100.0)?;
    match p.shipping {
        Some(ShippingCost::Fixed(c)) if !(c >= 0.0) => {
            return Err(ValidationError::NegativeMoney("shipping"))
        }
        Some(ShippingCost::PercentOfAov(pct)) => {
            check_pct("shipping_pct", Some(pct), 0.0, 100.0)?
        }
        _ => {}
    }
    if let Some(ltv) = p.ltv_multiplier {
        check_finite("ltv_multiplier", ltv)?;
        if ltv <= 0.0 {
            return Err(ValidationError::NegativeMoney("ltv_multiplier"));
        }
    }
    Ok(())
}

/// Validate a reverse goal. The first violated field is reported.
pub fn validate_goal(goal: &ReverseGoal) -> Result<(), ValidationError> {
    if !(goal.revenue_target > 0.0) {
        return Err(ValidationError::NonPositiveRevenueTarget(goal.revenue_target));
    }
    check_finite("revenue_target", goal.revenue_target)?;
    if !(goal.media_budget > 0.0) {
        return Err(ValidationError::NonPositiveBudget(goal.media_budget));
    }
    check_finite("media_budget", goal.media_budget)?;
    if !(0.0..=1.0).contains(&goal.profit_margin_goal) {
        return Err(ValidationError::MarginGoalOutOfRange(goal.profit_margin_goal));
    }
    if let Some(pct) = goal.min_revenue_pct {
        if !(70.0..=100.0).contains(&pct) {
            return Err(ValidationError::MinRevenuePctOutOfRange(pct));
        }
    }
    validate_business_params(&goal.business)
}

/// Validate a volume configuration's parameter ranges.
pub fn validate_volume_config(cfg: &VolumeConfig) -> Result<(), ValidationError> {
    match *cfg {
        VolumeConfig::Manual {
            elasticity,
            reference_roas,
            reference_budget,
        } => {
            if !(0.0..=2.0).contains(&elasticity) {
                return Err(ValidationError::ElasticityOutOfRange(elasticity));
            }
            check_finite("reference_roas", reference_roas)?;
            check_finite("reference_budget", reference_budget)?;
            Ok(())
        }
        VolumeConfig::Calibrated { a, b } => {
            check_finite("a", a)?;
            check_finite("b", b)
        }
    }
}

/// Cost of sale in percent for a ROAS; 0 for the infinite sentinel or non-positive ROAS.
pub fn cos_from_roas(roas: f64) -> f64 {
    if roas.is_finite() && roas > 0.0 {
        100.0 / roas
    } else {
        0.0
    }
}
