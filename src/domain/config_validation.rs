//! Configuration validation.
//!
//! Checks every setting before any data is read.

use crate::domain::calendar::Jurisdiction;
use crate::domain::error::BackadjustError;
use crate::domain::instrument::MAX_ROLL_LEAD_TRADING_DAYS;
use crate::domain::month_code::parse_month_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

/// Section holding the roll settings of `symbol`.
pub fn instrument_section(symbol: &str) -> String {
    format!("instrument.{}", symbol.to_lowercase())
}

pub fn validate_run_config(config: &dyn ConfigPort) -> Result<(), BackadjustError> {
    validate_country(config)?;
    validate_holidays(config)?;
    validate_as_of(config)?;
    Ok(())
}

pub fn validate_instrument_config(
    config: &dyn ConfigPort,
    symbol: &str,
) -> Result<(), BackadjustError> {
    let section = instrument_section(symbol);
    validate_roll_months(config, &section)?;
    validate_roll_lead(config, &section)?;
    Ok(())
}

fn validate_country(config: &dyn ConfigPort) -> Result<(), BackadjustError> {
    if let Some(country) = config.get_string("calendar", "country") {
        country
            .parse::<Jurisdiction>()
            .map_err(|reason| BackadjustError::ConfigInvalid {
                section: "calendar".to_string(),
                key: "country".to_string(),
                reason,
            })?;
    }
    Ok(())
}

fn validate_holidays(config: &dyn ConfigPort) -> Result<(), BackadjustError> {
    parse_holidays(config.get_string("calendar", "holidays").as_deref()).map(|_| ())
}

/// Parse a comma separated list of `YYYY-MM-DD` dates.
pub fn parse_holidays(value: Option<&str>) -> Result<Vec<NaiveDate>, BackadjustError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| BackadjustError::ConfigInvalid {
                section: "calendar".to_string(),
                key: "holidays".to_string(),
                reason: format!("invalid date {s:?}, expected YYYY-MM-DD"),
            })
        })
        .collect()
}

fn validate_as_of(config: &dyn ConfigPort) -> Result<(), BackadjustError> {
    if let Some(s) = config.get_string("run", "as_of") {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            BackadjustError::ConfigInvalid {
                section: "run".to_string(),
                key: "as_of".to_string(),
                reason: "invalid as_of format, expected YYYY-MM-DD".to_string(),
            }
        })?;
    }
    Ok(())
}

fn validate_roll_months(config: &dyn ConfigPort, section: &str) -> Result<(), BackadjustError> {
    let Some(value) = config.get_string(section, "roll_months") else {
        return Ok(());
    };
    let months = parse_month_codes(&value).map_err(|e| BackadjustError::ConfigInvalid {
        section: section.to_string(),
        key: "roll_months".to_string(),
        reason: e.to_string(),
    })?;
    if months.is_empty() {
        return Err(BackadjustError::ConfigInvalid {
            section: section.to_string(),
            key: "roll_months".to_string(),
            reason: "at least one roll month is required".to_string(),
        });
    }
    Ok(())
}

fn validate_roll_lead(config: &dyn ConfigPort, section: &str) -> Result<(), BackadjustError> {
    let Some(value) = config.get_string(section, "roll_lead_trading_days") else {
        return Ok(());
    };
    match value.trim().parse::<i64>() {
        Ok(n) if (0..=i64::from(MAX_ROLL_LEAD_TRADING_DAYS)).contains(&n) => Ok(()),
        _ => Err(BackadjustError::ConfigInvalid {
            section: section.to_string(),
            key: "roll_lead_trading_days".to_string(),
            reason: format!(
                "roll_lead_trading_days must be an integer from 0 to {MAX_ROLL_LEAD_TRADING_DAYS}"
            ),
        }),
    }
}
