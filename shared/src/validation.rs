//! Validation utilities for GDD requests
//!
//! Request input is checked here before any accumulation starts, so a rejected
//! request never leaves partial state behind.

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Longest location name accepted from a caller
pub const MAX_LOCATION_LEN: usize = 128;

/// Plausible base temperatures for crop development thresholds (°C)
pub const MIN_BASE_TEMPERATURE: i64 = -50;
pub const MAX_BASE_TEMPERATURE: i64 = 60;

// ============================================================================
// Accumulation Request Validations
// ============================================================================

/// Parse a planting date in `YYYY-MM-DD` format
pub fn parse_planting_date(value: &str) -> Result<NaiveDate, &'static str> {
    let value = value.trim();
    if value.is_empty() {
        return Err("Please specify a planting start date in YYYY-MM-DD format.");
    }
    parse_calendar_date(value)
}

/// Parse any calendar date in `YYYY-MM-DD` format
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate, &'static str> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| "Invalid date format. Use YYYY-MM-DD.")
}

/// Parse a base temperature as a decimal number of degrees Celsius
pub fn parse_base_temperature(value: &str) -> Result<Decimal, &'static str> {
    let parsed = value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| "Base temperature must be a number")?;
    validate_base_temperature(parsed)?;
    Ok(parsed)
}

/// Validate that a base temperature lies in a plausible range
pub fn validate_base_temperature(base_temp: Decimal) -> Result<(), &'static str> {
    if base_temp < Decimal::from(MIN_BASE_TEMPERATURE) || base_temp > Decimal::from(MAX_BASE_TEMPERATURE) {
        return Err("Base temperature must be between -50 and 60 °C");
    }
    Ok(())
}

/// Normalize a location name: trims surrounding whitespace and rejects empty
/// or overly long names. Case is kept as given.
pub fn normalize_location(value: &str) -> Result<String, &'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Location must not be empty");
    }
    if trimmed.chars().count() > MAX_LOCATION_LEN {
        return Err("Location must be at most 128 characters");
    }
    Ok(trimmed.to_string())
}
