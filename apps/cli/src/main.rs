#![deny(warnings)]

//! Headless planner: solve a revenue goal, optionally calibrate from history, project ROI.

use anyhow::{bail, Context, Result};
use calibration::{
    calibrate, synthetic_history, to_delimited, CalibrationOutcome, Delimiter, SyntheticSpec,
};
use chrono::NaiveDate;
use planner_config::{load_industry_table, load_ramp_presets, RampPresets};
use roas_core::format::{format_cos, format_currency, format_percent, format_roas};
use roas_core::{BusinessParameters, IndustryTable, RampPreset, ReverseGoal};
use roas_econ::{solve, ReverseOutcome, UnitEconomicsEngine};
use roi_sim::{project, project_presets, ProjectionOptions, RoiProjection};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use volume_model::{optimal_budget, OptimalBudget};

const USAGE: &str = "usage: roas-plan --goal <goal.yaml> [--history <file>] \
                     [--industries <yaml>] [--ramp <yaml>] \
                     [--preset worst|expected|best] | --demo";

#[derive(Debug, Default)]
struct Args {
    goal: Option<String>,
    history: Option<String>,
    industries: Option<String>,
    ramp: Option<String>,
    preset: Option<String>,
    demo: bool,
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--goal" => args.goal = it.next(),
            "--history" => args.history = it.next(),
            "--industries" => args.industries = it.next(),
            "--ramp" => args.ramp = it.next(),
            "--preset" => args.preset = it.next(),
            "--demo" => args.demo = true,
            other => warn!(arg = other, "ignoring unknown argument"),
        }
    }
    args
}

#[derive(Debug, Default, Deserialize)]
struct ProjectionSection {
    preset: Option<RampPreset>,
    #[serde(default)]
    baseline_monthly_revenue: f64,
    start: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct GoalFile {
    goal: ReverseGoal,
    #[serde(default)]
    projection: ProjectionSection,
}

/// Headline numbers of one preset's projection.
#[derive(Debug, Serialize)]
struct PresetSummary {
    preset: RampPreset,
    roi_pct: f64,
    profit_delta: f64,
    break_even_month: u32,
}

#[derive(Debug, Serialize)]
struct Report {
    outcome: ReverseOutcome,
    calibration: Option<CalibrationOutcome>,
    optimal_budget: Option<OptimalBudget>,
    projection: Option<RoiProjection>,
    presets: Vec<PresetSummary>,
}

fn demo_goal() -> GoalFile {
    let mut business = BusinessParameters::new(850.0, "fashion");
    business.gross_margin_pct = Some(62.0);
    GoalFile {
        goal: ReverseGoal {
            revenue_target: 1_200_000.0,
            media_budget: 300_000.0,
            profit_margin_goal: 0.15,
            business,
            min_revenue_pct: None,
        },
        projection: ProjectionSection {
            preset: Some(RampPreset::Expected),
            baseline_monthly_revenue: 0.0,
            start: NaiveDate::from_ymd_opt(2027, 1, 1),
        },
    }
}

fn demo_history() -> String {
    let spec = SyntheticSpec {
        a: 3.2,
        b: -0.3,
        points: 18,
        min_spend: 8_000.0,
        max_spend: 60_000.0,
        noise_frac: 0.08,
    };
    to_delimited(&synthetic_history(&spec, 42), Delimiter::Semicolon)
}

fn parse_preset(s: &str) -> Result<RampPreset> {
    match s {
        "worst" => Ok(RampPreset::Worst),
        "expected" => Ok(RampPreset::Expected),
        "best" => Ok(RampPreset::Best),
        _ => bail!("unknown preset {s:?}; expected worst, expected or best"),
    }
}

fn print_summary(report: &Report) {
    let o = &report.outcome;
    println!(
        "Goal | required ROAS: {} | COS: {} | status: {}",
        format_roas(o.required_roas),
        format_cos(o.required_cos),
        o.status.label()
    );
    println!(
        "Thresholds | break-even ROAS: {} | target ROAS: {} | contribution: {}",
        format_roas(o.thresholds.break_even_roas),
        format_roas(o.thresholds.target_roas),
        format_percent(o.unit_economics.contribution_rate)
    );
    println!("{}", o.status_text);
    if let Some(set) = &o.scenarios {
        for s in set.iter() {
            println!(
                "Scenario {}{} | budget: {} | revenue: {} | profit: {} | ROAS: {}",
                s.label,
                if s.is_recommended { " *" } else { "" },
                format_currency(s.budget),
                format_currency(s.revenue),
                format_currency(s.profit),
                format_roas(s.required_roas)
            );
        }
    }
    if let Some(fit) = report.calibration.as_ref().and_then(|c| c.regression.as_ref()) {
        println!("Calibration | R²: {:.2} | {}", fit.r_squared, fit.interpretation);
    }
    if let Some(best) = &report.optimal_budget {
        println!(
            "Optimal budget | {} | profit: {} | ROAS: {}",
            format_currency(best.budget),
            format_currency(best.profit),
            format_roas(best.roas)
        );
    }
    if let Some(p) = &report.projection {
        let break_even = if p.breaks_even() {
            p.act[(p.break_even_month - 1) as usize].label.clone()
        } else {
            "not within 12 months".to_string()
        };
        println!(
            "Projection | spend: {} | revenue delta: {} | profit delta: {} | \
             ROI: {:.1}% | break-even: {}",
            format_currency(p.total_ad_spend),
            format_currency(p.revenue_delta),
            format_currency(p.profit_delta),
            p.roi_pct,
            break_even
        );
    }
    for s in &report.presets {
        println!(
            "Preset {} | ROI: {:.1}% | profit delta: {} | break-even month: {}",
            s.preset.label(),
            s.roi_pct,
            format_currency(s.profit_delta),
            s.break_even_month
        );
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    info!(?args, "starting planner");

    let table = match &args.industries {
        Some(path) => load_industry_table(path).with_context(|| format!("loading {path}"))?,
        None => IndustryTable::builtin(),
    };
    let presets = match &args.ramp {
        Some(path) => load_ramp_presets(path).with_context(|| format!("loading {path}"))?,
        None => RampPresets::default(),
    };

    let goal_file = match (&args.goal, args.demo) {
        (Some(path), _) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
            serde_yaml::from_str::<GoalFile>(&text).with_context(|| format!("parsing {path}"))?
        }
        (None, true) => demo_goal(),
        (None, false) => bail!(USAGE),
    };

    let engine = UnitEconomicsEngine::new(table);
    let outcome = solve(&engine, &goal_file.goal)?;

    let history = match (&args.history, args.demo) {
        (Some(path), _) => {
            Some(fs::read_to_string(path).with_context(|| format!("reading {path}"))?)
        }
        (None, true) => Some(demo_history()),
        (None, false) => None,
    };
    let calibration = history.as_deref().map(calibrate);
    if let Some(c) = &calibration {
        for w in &c.validation.warnings {
            warn!(warning = %w, "history");
        }
        for e in &c.validation.errors {
            warn!(error = %e, "history rejected");
        }
    }

    let budget = goal_file.goal.media_budget;
    let optimal = calibration
        .as_ref()
        .and_then(|c| c.regression.as_ref())
        .map(|fit| {
            optimal_budget(
                fit,
                outcome.unit_economics.contribution_rate,
                budget * 0.25,
                budget * 4.0,
            )
        });

    let preset = match &args.preset {
        Some(s) => parse_preset(s)?,
        None => goal_file.projection.preset.unwrap_or(RampPreset::Expected),
    };
    let options = ProjectionOptions {
        ramp: presets.get(preset),
        baseline_monthly_revenue: goal_file.projection.baseline_monthly_revenue,
        start: goal_file.projection.start,
    };
    let recommended = outcome.scenarios.as_ref().and_then(|set| set.recommended());
    let projection = recommended.map(|s| project(s, &options));
    let preset_runs = recommended
        .map(|s| project_presets(s, |p| presets.get(p)))
        .unwrap_or_default();
    let summaries: Vec<PresetSummary> = preset_runs
        .into_iter()
        .map(|(preset, run)| PresetSummary {
            preset,
            roi_pct: run.roi_pct,
            profit_delta: run.profit_delta,
            break_even_month: run.break_even_month,
        })
        .collect();

    let report = Report {
        outcome,
        calibration,
        optimal_budget: optimal,
        projection,
        presets: summaries,
    };
    print_summary(&report);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
