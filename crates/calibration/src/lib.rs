#![deny(warnings)]

//! Calibrates the volume model from historical spend and revenue.
//!
//! Pipeline: delimited text -> [`parse::parse_history`] -> [`regression::validate_history`]
//! -> [`regression::fit_power_law`]. Nothing here fails hard: bad rows are skipped and an
//! unusable dataset yields no fit plus itemised messages.

use serde::{Deserialize, Serialize};

pub mod parse;
pub mod regression;
pub mod sample;

pub use parse::{parse_history, parse_number, to_delimited, Delimiter, ParsedHistory, SkippedRow};
pub use regression::{
    fit_power_law, validate_history, FitQuality, HistoryValidation, RegressionResult,
    ReturnsRegime,
};
pub use sample::{synthetic_history, SyntheticSpec};

/// Parse, validation and fit results for one block of history text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub parsed: ParsedHistory,
    pub validation: HistoryValidation,
    pub regression: Option<RegressionResult>,
}

/// Run the whole calibration pipeline on raw text.
pub fn calibrate(text: &str) -> CalibrationOutcome {
    let parsed = parse_history(text);
    let validation = validate_history(&parsed.points);
    let regression = if validation.is_valid() {
        fit_power_law(&parsed.points)
    } else {
        None
    };
    CalibrationOutcome {
        parsed,
        validation,
        regression,
    }
}
