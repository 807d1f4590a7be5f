//! Growing degree day accumulation
//!
//! Scans every day from the planting date to today in calendar order. Days
//! already in the ledger are reused; missing days are fetched, extracted,
//! calculated and recorded. Days without usable weather data are skipped and
//! left unrecorded so a later scan retries them. Once a day is skipped, later
//! days still count toward the total but are not recorded, which keeps every
//! series a gap-free prefix with a correct running `cumulative_gdd`.

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::time::Instant;

use shared::{
    calculate_gdd, extract_temperatures, AccumulationResult, Coordinates, DailyGddEntry,
    DailyGddRecord, DateRange, DaySource, ExtractionPolicy, GrowthStage, GrowthStageTable,
    LedgerKey, SkipReason, SkippedDay,
};

use crate::error::AppResult;
use crate::external::weather::{FetchError, WeatherSource};
use crate::store::GddLedger;

/// Accumulation engine over a ledger and a weather source
#[derive(Clone)]
pub struct AccumulationEngine<L, W> {
    ledger: L,
    weather: W,
    policy: ExtractionPolicy,
    stages: &'static GrowthStageTable,
    deadline: Option<Duration>,
}

/// Outcome of fetching one day's observations
enum DayFetch {
    Fetched(shared::DailyObservations),
    Failed(FetchError),
    DeadlineReached,
}

impl<L: GddLedger, W: WeatherSource> AccumulationEngine<L, W> {
    /// Create an engine using the standard growth stage table
    pub fn new(ledger: L, weather: W, policy: ExtractionPolicy) -> Self {
        Self {
            ledger,
            weather,
            policy,
            stages: GrowthStageTable::standard(),
            deadline: None,
        }
    }

    /// Bound the whole scan. When the bound is hit the days processed so far
    /// are returned with `truncated` set.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn policy(&self) -> ExtractionPolicy {
        self.policy
    }

    /// Accumulate GDD for `key` from its planting date through `today`
    pub async fn compute_accumulation(
        &self,
        key: &LedgerKey,
        coordinates: Coordinates,
        today: NaiveDate,
    ) -> AppResult<AccumulationResult> {
        let deadline = self.deadline.map(|limit| Instant::now() + limit);
        let range = DateRange::new(key.planting_date, today);

        let mut total = Decimal::ZERO;
        let mut daily = Vec::with_capacity(range.len_days());
        let mut skipped = Vec::new();
        let mut truncated = false;
        let mut first_gap: Option<NaiveDate> = None;

        for day in range.days() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                truncated = true;
                break;
            }

            if let Some(record) = self.ledger.find(key, day).await? {
                total += record.daily_gdd;
                daily.push(ledger_entry(&record));
                continue;
            }

            let observations = match self.fetch_day(coordinates, day, deadline).await {
                DayFetch::Fetched(observations) => observations,
                DayFetch::Failed(e) => {
                    tracing::warn!("Skipping {} for {}: {}", day, key, e);
                    first_gap.get_or_insert(day);
                    skipped.push(SkippedDay {
                        date: day,
                        reason: SkipReason::FetchFailed(e.to_string()),
                    });
                    continue;
                }
                DayFetch::DeadlineReached => {
                    truncated = true;
                    break;
                }
            };

            let temperatures = match extract_temperatures(self.policy, &observations) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("Skipping {} for {}: {}", day, key, e);
                    first_gap.get_or_insert(day);
                    skipped.push(SkippedDay {
                        date: day,
                        reason: SkipReason::NoData(e.to_string()),
                    });
                    continue;
                }
            };

            let gdd = calculate_gdd(temperatures.tmax, temperatures.tmin, key.base_temperature);

            if let Some(gap) = first_gap {
                tracing::debug!("{}: GDD={} not recorded, {} is still missing", day, gdd, gap);
                total += gdd;
                daily.push(DailyGddEntry {
                    date: day,
                    gdd,
                    tmin: Some(temperatures.tmin),
                    tmax: Some(temperatures.tmax),
                    source: DaySource::Provisional,
                });
                continue;
            }

            let record = DailyGddRecord::new(key, day, Some(temperatures), gdd, total + gdd);
            let entry = if self.ledger.insert_if_absent(&record).await? {
                tracing::debug!(
                    "{}: Tmin={}, Tmax={}, GDD={}",
                    day,
                    temperatures.tmin,
                    temperatures.tmax,
                    gdd
                );
                DailyGddEntry {
                    date: day,
                    gdd,
                    tmin: Some(temperatures.tmin),
                    tmax: Some(temperatures.tmax),
                    source: DaySource::Computed,
                }
            } else {
                // A concurrent scan recorded this day first; its value wins
                tracing::debug!("{} already recorded for {}", day, key);
                match self.ledger.find(key, day).await? {
                    Some(existing) => ledger_entry(&existing),
                    None => {
                        return Err(crate::error::AppError::Internal(format!(
                            "ledger rejected {} for {} but holds no record",
                            day, key
                        )))
                    }
                }
            };

            total += entry.gdd;
            daily.push(entry);
        }

        let growth_stage = self.stages.classify(total)?;
        let summary = summarize(key, total, growth_stage, daily.len(), range.len_days(), truncated);
        tracing::info!("{}", summary);

        Ok(AccumulationResult {
            total_gdd: total,
            growth_stage,
            daily,
            skipped,
            truncated,
            summary,
        })
    }

    async fn fetch_day(
        &self,
        coordinates: Coordinates,
        day: NaiveDate,
        deadline: Option<Instant>,
    ) -> DayFetch {
        let fetch = self.weather.fetch_day(coordinates, day);
        let outcome = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, fetch).await {
                Ok(outcome) => outcome,
                Err(_) => return DayFetch::DeadlineReached,
            },
            None => fetch.await,
        };

        match outcome {
            Ok(observations) => DayFetch::Fetched(observations),
            Err(e) => DayFetch::Failed(e),
        }
    }
}

fn ledger_entry(record: &DailyGddRecord) -> DailyGddEntry {
    DailyGddEntry {
        date: record.record_date,
        gdd: record.daily_gdd,
        tmin: record.tmin,
        tmax: record.tmax,
        source: DaySource::Ledger,
    }
}

fn summarize(
    key: &LedgerKey,
    total: Decimal,
    stage: GrowthStage,
    covered: usize,
    requested: usize,
    truncated: bool,
) -> String {
    let mut summary = format!(
        "{} has accumulated {} GDD (base {}°C) since {}: {}. {} of {} days covered.",
        key.location,
        total.normalize(),
        key.base_temperature,
        key.planting_date,
        stage,
        covered,
        requested
    );
    if truncated {
        summary.push_str(" Scan stopped early; remaining days will be filled on a later request.");
    }
    summary
}
