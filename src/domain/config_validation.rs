//! Configuration validation.
//!
//! Checks numeric ranges and required keys before anything is loaded or run.
//! Name wiring between features, signals and the sizer is checked later,
//! when the strategy is built.

use crate::domain::error::SteptraderError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const PRESETS: [&str; 4] = ["momentum", "dca", "buy_and_hold", "custom"];

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SteptraderError> {
    validate_initial_capital(config)?;
    validate_fraction(config, "backtest", "fee_rate")?;
    validate_fraction(config, "backtest", "slippage")?;
    validate_fraction(config, "backtest", "risk_free_rate")?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SteptraderError> {
    let preset = config
        .get_string("strategy", "preset")
        .map(|p| p.trim().to_lowercase())
        .unwrap_or_else(|| "momentum".to_string());
    if !PRESETS.contains(&preset.as_str()) {
        return Err(SteptraderError::invalid(
            "strategy",
            "preset",
            format!("unknown preset '{}', expected one of {}", preset, PRESETS.join(", ")),
        ));
    }

    validate_weight(config, "initial_weight")?;
    if preset == "buy_and_hold" {
        return validate_weight(config, "weight");
    }

    let step = config.get_double("strategy", "step", 0.1);
    if !(step > 0.0 && step <= 1.0) {
        return Err(SteptraderError::invalid(
            "strategy",
            "step",
            "step must be in (0, 1]",
        ));
    }

    if preset == "custom" {
        for key in ["features", "signals"] {
            if config.get_list("strategy", key).is_empty() {
                return Err(SteptraderError::missing("strategy", key));
            }
        }
        match config.get_string("strategy", "directional") {
            Some(s) if !s.trim().is_empty() => {}
            _ => return Err(SteptraderError::missing("strategy", "directional")),
        }
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SteptraderError> {
    let value = config.get_double("backtest", "initial_capital", 100_000.0);
    if !(value.is_finite() && value > 0.0) {
        return Err(SteptraderError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

/// Rates are fractions: 0.0005 means 5 basis points.
fn validate_fraction(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), SteptraderError> {
    let value = config.get_double(section, key, 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(SteptraderError::invalid(
            section,
            key,
            format!("{} must be between 0 and 1", key),
        ));
    }
    Ok(())
}

fn validate_weight(config: &dyn ConfigPort, key: &str) -> Result<(), SteptraderError> {
    let value = config.get_double("strategy", key, 0.0);
    if !(0.0..=1.0).contains(&value) {
        return Err(SteptraderError::invalid(
            "strategy",
            key,
            format!("{} must be between 0 and 1", key),
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SteptraderError> {
    let start = parse_optional_date(config, "start_date")?;
    let end = parse_optional_date(config, "end_date")?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(SteptraderError::invalid(
                "backtest",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}

/// Parse an optional `YYYY-MM-DD` date from the `[backtest]` section.
pub fn parse_optional_date(
    config: &dyn ConfigPort,
    field: &str,
) -> Result<Option<NaiveDate>, SteptraderError> {
    match config.get_string("backtest", field) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                SteptraderError::invalid(
                    "backtest",
                    field,
                    format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}
