//! Display helpers shared by reports and the CLI.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// ROAS with one decimal, or `∞` for the infeasible sentinel.
pub fn format_roas(roas: f64) -> String {
    if roas.is_finite() {
        format!("{:.1}", roas)
    } else {
        "∞".to_string()
    }
}

/// Cost of sale percent with one decimal, e.g. `25.0%`.
pub fn format_cos(cos_pct: f64) -> String {
    format!("{:.1}%", cos_pct)
}

/// A fraction rendered as percent, e.g. `0.125` -> `12.5%`.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}

/// Round a currency amount to whole units, half away from zero.
///
/// Non-finite inputs round to zero.
pub fn round_currency(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

/// Whole-unit currency with thousands grouping, e.g. `1,250,000`.
pub fn format_currency(value: f64) -> String {
    let rounded = round_currency(value);
    let digits = rounded.abs().trunc().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roas_one_decimal() {
        assert_eq!(format_roas(10.0 / 3.0), "3.3");
        assert_eq!(format_roas(f64::INFINITY), "∞");
    }

    #[test]
    fn currency_grouping_and_rounding() {
        assert_eq!(format_currency(1_234_567.6), "1,234,568");
        assert_eq!(format_currency(999.0), "999");
        assert_eq!(format_currency(-500.4), "-500");
        assert_eq!(format_currency(f64::NAN), "0");
        assert_eq!(round_currency(2.5), Decimal::new(3, 0));
    }

    #[test]
    fn percent_helpers() {
        assert_eq!(format_cos(25.0), "25.0%");
        assert_eq!(format_percent(0.125), "12.5%");
    }
}
