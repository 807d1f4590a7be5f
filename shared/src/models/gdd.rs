//! Growing degree day models and the daily GDD calculation

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::growth_stage::GrowthStage;
use super::temperature::TemperatureRange;

/// Daily GDD: mean of `tmax` and `tmin` above `base_temp`, never negative
pub fn calculate_gdd(tmax: Decimal, tmin: Decimal, base_temp: Decimal) -> Decimal {
    let avg = (tmax + tmin) / Decimal::TWO;
    (avg - base_temp).max(Decimal::ZERO)
}

/// Identifies one accumulation series in the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerKey {
    pub location: String,
    pub planting_date: NaiveDate,
    pub base_temperature: Decimal,
}

impl LedgerKey {
    pub fn new(location: impl Into<String>, planting_date: NaiveDate, base_temperature: Decimal) -> Self {
        Self {
            location: location.into(),
            planting_date,
            base_temperature: base_temperature.normalize(),
        }
    }
}

impl std::fmt::Display for LedgerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} from {} (base {})",
            self.location, self.planting_date, self.base_temperature
        )
    }
}

/// A persisted day of the ledger. Written once, never updated.
///
/// A series is always a gap-free run of days starting at the planting date,
/// so `cumulative_gdd` of the latest record equals the sum of the series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyGddRecord {
    pub id: Uuid,
    pub location: String,
    pub planting_date: NaiveDate,
    pub record_date: NaiveDate,
    pub base_temperature: Decimal,
    pub tmin: Option<Decimal>,
    pub tmax: Option<Decimal>,
    pub daily_gdd: Decimal,
    /// Running total of the series up to and including `record_date`
    pub cumulative_gdd: Decimal,
    pub created_at: DateTime<Utc>,
}

impl DailyGddRecord {
    pub fn new(
        key: &LedgerKey,
        record_date: NaiveDate,
        temperatures: Option<TemperatureRange>,
        daily_gdd: Decimal,
        cumulative_gdd: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            location: key.location.clone(),
            planting_date: key.planting_date,
            record_date,
            base_temperature: key.base_temperature,
            tmin: temperatures.map(|t| t.tmin),
            tmax: temperatures.map(|t| t.tmax),
            daily_gdd,
            cumulative_gdd,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> LedgerKey {
        LedgerKey::new(self.location.clone(), self.planting_date, self.base_temperature)
    }

    pub fn temperatures(&self) -> Option<TemperatureRange> {
        match (self.tmin, self.tmax) {
            (Some(tmin), Some(tmax)) => Some(TemperatureRange { tmin, tmax }),
            _ => None,
        }
    }
}

/// Where a day's value came from during a scan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DaySource {
    /// Reused from an existing ledger record
    Ledger,
    /// Fetched and calculated during this scan
    Computed,
    /// Calculated but not recorded because an earlier day of the scan was
    /// skipped; recorded by a later scan once the gap is filled
    Provisional,
}

/// One day contributing to the total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyGddEntry {
    pub date: NaiveDate,
    pub gdd: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmin: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmax: Option<Decimal>,
    pub source: DaySource,
}

/// Why a day was left out of the total
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum SkipReason {
    /// The weather provider failed or returned an unusable payload
    FetchFailed(String),
    /// The payload had no usable temperature pair
    NoData(String),
}

/// A day with no usable data. Not recorded, so a later scan retries it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedDay {
    pub date: NaiveDate,
    pub reason: SkipReason,
}

/// Outcome of one accumulation scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccumulationResult {
    pub total_gdd: Decimal,
    pub growth_stage: GrowthStage,
    /// Covered days in calendar order
    pub daily: Vec<DailyGddEntry>,
    pub skipped: Vec<SkippedDay>,
    /// Set when the scan stopped at its deadline before reaching the last day
    pub truncated: bool,
    pub summary: String,
}

impl AccumulationResult {
    pub fn days_covered(&self) -> usize {
        self.daily.len()
    }
}
