//! Temperature observations and daily min/max extraction

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hours (UTC, inclusive) whose reading stands in for the daily minimum
pub const MORNING_WINDOW: (u32, u32) = (5, 7);

/// Hours (UTC, inclusive) whose reading stands in for the daily maximum
pub const AFTERNOON_WINDOW: (u32, u32) = (14, 16);

/// A single temperature reading from the weather provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemperatureSample {
    pub timestamp: DateTime<Utc>,
    /// Instantaneous temperature
    pub temperature_celsius: Decimal,
    /// Lowest temperature reported for the sampling period
    pub temp_min_celsius: Decimal,
    /// Highest temperature reported for the sampling period
    pub temp_max_celsius: Decimal,
}

/// All samples the provider returned for one calendar day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyObservations {
    pub date: NaiveDate,
    pub samples: Vec<TemperatureSample>,
}

impl DailyObservations {
    pub fn new(date: NaiveDate, samples: Vec<TemperatureSample>) -> Self {
        Self { date, samples }
    }
}

/// Daily minimum and maximum temperature
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemperatureRange {
    pub tmin: Decimal,
    pub tmax: Decimal,
}

/// How a day's min/max pair is derived from its samples
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionPolicy {
    /// Minimum and maximum over every sample of the day
    #[default]
    FullSweep,
    /// Morning reading as minimum, afternoon reading as maximum
    FixedWindows,
}

impl std::fmt::Display for ExtractionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionPolicy::FullSweep => write!(f, "full_sweep"),
            ExtractionPolicy::FixedWindows => write!(f, "fixed_windows"),
        }
    }
}

/// Reasons a day yields no usable temperature pair
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no temperature samples for {0}")]
    NoSamples(NaiveDate),

    #[error("no sample between {start:02}:00 and {end:02}:59 UTC on {date}")]
    MissingWindow { date: NaiveDate, start: u32, end: u32 },
}

/// Extract the day's (tmin, tmax) according to `policy`
pub fn extract_temperatures(
    policy: ExtractionPolicy,
    observations: &DailyObservations,
) -> Result<TemperatureRange, ExtractionError> {
    match policy {
        ExtractionPolicy::FullSweep => full_sweep(observations),
        ExtractionPolicy::FixedWindows => fixed_windows(observations),
    }
}

fn full_sweep(observations: &DailyObservations) -> Result<TemperatureRange, ExtractionError> {
    let tmin = observations
        .samples
        .iter()
        .map(|s| s.temp_min_celsius)
        .min()
        .ok_or(ExtractionError::NoSamples(observations.date))?;
    let tmax = observations
        .samples
        .iter()
        .map(|s| s.temp_max_celsius)
        .max()
        .ok_or(ExtractionError::NoSamples(observations.date))?;

    Ok(TemperatureRange { tmin, tmax })
}

fn fixed_windows(observations: &DailyObservations) -> Result<TemperatureRange, ExtractionError> {
    if observations.samples.is_empty() {
        return Err(ExtractionError::NoSamples(observations.date));
    }

    let mut ordered: Vec<&TemperatureSample> = observations.samples.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);

    let tmin = first_in_window(&ordered, observations.date, MORNING_WINDOW)?;
    let tmax = first_in_window(&ordered, observations.date, AFTERNOON_WINDOW)?;

    Ok(TemperatureRange { tmin, tmax })
}

/// First reading (by ascending timestamp) whose hour falls in `window`
fn first_in_window(
    ordered: &[&TemperatureSample],
    date: NaiveDate,
    (start, end): (u32, u32),
) -> Result<Decimal, ExtractionError> {
    ordered
        .iter()
        .find(|s| (start..=end).contains(&s.timestamp.hour()))
        .map(|s| s.temperature_celsius)
        .ok_or(ExtractionError::MissingWindow { date, start, end })
}
