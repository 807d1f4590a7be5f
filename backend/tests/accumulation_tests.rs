//! Accumulation engine tests
//!
//! Covers the ledger-backed scan:
//! - Reuse of recorded days (idempotence)
//! - Convergence across partial scans
//! - Skipped days on missing or failed weather data
//! - Growth stage of the final total
//! - Partial results at the scan deadline
//! - Concurrent scans of the same series

mod common;

use std::time::Duration;

use rust_decimal::Decimal;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;

use common::{date, dec, key, larnaca, DayScript, ScriptedWeather};
use gdd_backend::error::AppResult;
use gdd_backend::services::AccumulationEngine;
use gdd_backend::store::{GddLedger, InMemoryGddLedger};
use shared::{DailyGddRecord, DaySource, ExtractionPolicy, GrowthStage, LedgerKey, SkipReason};

/// Ledger whose first lookup of `hidden` misses, as if another scan
/// recorded the day between this scan's lookup and its insert
#[derive(Clone)]
struct RacingLedger {
    inner: InMemoryGddLedger,
    hidden: NaiveDate,
    missed: Arc<AtomicBool>,
}

impl RacingLedger {
    fn new(inner: InMemoryGddLedger, hidden: NaiveDate) -> Self {
        Self {
            inner,
            hidden,
            missed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl GddLedger for RacingLedger {
    async fn find(&self, key: &LedgerKey, record_date: NaiveDate) -> AppResult<Option<DailyGddRecord>> {
        if record_date == self.hidden && !self.missed.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find(key, record_date).await
    }

    async fn insert_if_absent(&self, record: &DailyGddRecord) -> AppResult<bool> {
        self.inner.insert_if_absent(record).await
    }

    async fn list_series(&self, key: &LedgerKey) -> AppResult<Vec<DailyGddRecord>> {
        self.inner.list_series(key).await
    }

    async fn range_sum(&self, key: &LedgerKey) -> AppResult<Decimal> {
        self.inner.range_sum(key).await
    }
}

fn engine(
    ledger: &InMemoryGddLedger,
    weather: &ScriptedWeather,
) -> AccumulationEngine<InMemoryGddLedger, ScriptedWeather> {
    AccumulationEngine::new(ledger.clone(), weather.clone(), ExtractionPolicy::FullSweep)
}

// ============================================================================
// End-to-end examples
// ============================================================================

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn three_warm_days_stay_in_bud_development() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-03"), 25, 15);

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-03"))
            .await
            .unwrap();

        assert_eq!(result.total_gdd, Decimal::from(30));
        assert_eq!(result.growth_stage, GrowthStage::BudDevelopment);
        assert_eq!(result.daily.len(), 3);
        assert!(result.daily.iter().all(|d| d.gdd == Decimal::from(10)));
        assert!(result.daily.iter().all(|d| d.source == DaySource::Computed));
        assert!(result.skipped.is_empty());
        assert!(!result.truncated);
    }

    #[tokio::test]
    async fn fifteen_warm_days_reach_flowering() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-15"), 25, 15);

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-15"))
            .await
            .unwrap();

        assert_eq!(result.total_gdd, Decimal::from(150));
        assert_eq!(result.growth_stage, GrowthStage::Flowering);
        assert_eq!(result.growth_stage.to_string(), "Flowering");
    }

    #[tokio::test]
    async fn daily_entries_are_in_calendar_order() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-02-27"), date("2024-03-02"), 20, 10);

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-02-27", 10), larnaca(), date("2024-03-02"))
            .await
            .unwrap();

        let dates: Vec<_> = result.daily.iter().map(|d| d.date).collect();
        assert_eq!(
            dates,
            vec![
                date("2024-02-27"),
                date("2024-02-28"),
                date("2024-02-29"),
                date("2024-03-01"),
                date("2024-03-02"),
            ]
        );
        assert_eq!(result.total_gdd, Decimal::from(25));
    }

    #[tokio::test]
    async fn cold_days_contribute_zero_but_are_recorded() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-01-10"), date("2024-01-12"), 5, 0);

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-01-10", 10), larnaca(), date("2024-01-12"))
            .await
            .unwrap();

        assert_eq!(result.total_gdd, Decimal::ZERO);
        assert_eq!(result.daily.len(), 3);
        assert_eq!(ledger.len().await, 3);
    }

    #[tokio::test]
    async fn summary_describes_the_result() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-03"), 25, 15);

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-03"))
            .await
            .unwrap();

        assert!(result.summary.contains("Larnaca"));
        assert!(result.summary.contains("30 GDD"));
        assert!(result.summary.contains("Bud Development"));
        assert!(result.summary.contains("3 of 3 days"));
    }
}

// ============================================================================
// Date range edges
// ============================================================================

mod date_range {
    use super::*;

    #[tokio::test]
    async fn future_planting_date_yields_empty_result() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::new();

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-07-01", 10), larnaca(), date("2024-06-15"))
            .await
            .unwrap();

        assert_eq!(result.total_gdd, Decimal::ZERO);
        assert_eq!(result.growth_stage, GrowthStage::BudDevelopment);
        assert!(result.daily.is_empty());
        assert_eq!(weather.calls(), 0);
    }

    #[tokio::test]
    async fn planting_today_processes_exactly_one_day() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-15"), date("2024-06-15"), 30, 20);

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-06-15", 10), larnaca(), date("2024-06-15"))
            .await
            .unwrap();

        assert_eq!(result.daily.len(), 1);
        assert_eq!(result.total_gdd, Decimal::from(15));
        assert_eq!(weather.calls(), 1);
    }
}

// ============================================================================
// Ledger reuse
// ============================================================================

mod ledger_reuse {
    use super::*;

    #[tokio::test]
    async fn second_run_reuses_every_day() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-05"), 26, 14);
        let engine = engine(&ledger, &weather);
        let key = key("2024-06-01", 10);

        let first = engine
            .compute_accumulation(&key, larnaca(), date("2024-06-05"))
            .await
            .unwrap();
        let second = engine
            .compute_accumulation(&key, larnaca(), date("2024-06-05"))
            .await
            .unwrap();

        assert_eq!(first.total_gdd, second.total_gdd);
        assert_eq!(second.daily.len(), 5);
        assert!(second.daily.iter().all(|d| d.source == DaySource::Ledger));
        assert_eq!(weather.calls(), 5);
        assert_eq!(ledger.len().await, 5);
    }

    #[tokio::test]
    async fn reused_days_keep_their_temperatures() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-01"), 25, 15);
        let engine = engine(&ledger, &weather);
        let key = key("2024-06-01", 10);

        engine
            .compute_accumulation(&key, larnaca(), date("2024-06-01"))
            .await
            .unwrap();
        let again = engine
            .compute_accumulation(&key, larnaca(), date("2024-06-01"))
            .await
            .unwrap();

        assert_eq!(again.daily[0].tmin, Some(Decimal::from(15)));
        assert_eq!(again.daily[0].tmax, Some(Decimal::from(25)));
    }

    #[tokio::test]
    async fn stored_values_win_over_new_weather() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-02"), 25, 15);
        let engine = engine(&ledger, &weather);
        let key = key("2024-06-01", 10);

        engine
            .compute_accumulation(&key, larnaca(), date("2024-06-02"))
            .await
            .unwrap();

        // Provider revises its history; recorded days are never rewritten
        weather.set(
            date("2024-06-01"),
            DayScript::Temps {
                tmax: Decimal::from(40),
                tmin: Decimal::from(30),
            },
        );
        let again = engine
            .compute_accumulation(&key, larnaca(), date("2024-06-02"))
            .await
            .unwrap();

        assert_eq!(again.total_gdd, Decimal::from(20));
    }

    #[tokio::test]
    async fn partial_scans_converge_to_full_scan_total() {
        let start = date("2024-06-01");
        let end = date("2024-06-07");
        let weather = ScriptedWeather::new();
        for (offset, (tmax, tmin)) in [(22, 12), (28, 16), (31, 19), (19, 9), (24, 14), (27, 17), (30, 18)]
            .into_iter()
            .enumerate()
        {
            weather.set(
                start + chrono::Duration::days(offset as i64),
                DayScript::Temps {
                    tmax: Decimal::from(tmax),
                    tmin: Decimal::from(tmin),
                },
            );
        }
        let key = key("2024-06-01", 10);

        let split_ledger = InMemoryGddLedger::new();
        let split = engine(&split_ledger, &weather);
        split
            .compute_accumulation(&key, larnaca(), date("2024-06-03"))
            .await
            .unwrap();
        let converged = split
            .compute_accumulation(&key, larnaca(), end)
            .await
            .unwrap();

        let single_ledger = InMemoryGddLedger::new();
        let single = engine(&single_ledger, &weather)
            .compute_accumulation(&key, larnaca(), end)
            .await
            .unwrap();

        assert_eq!(converged.total_gdd, single.total_gdd);
        assert_eq!(converged.total_gdd, dec("73"));
        assert_eq!(
            split_ledger.range_sum(&key).await.unwrap(),
            single_ledger.range_sum(&key).await.unwrap()
        );
    }

    #[tokio::test]
    async fn last_record_cumulative_matches_series_sum() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-04"), 27, 13);
        let key = key("2024-06-01", 10);

        engine(&ledger, &weather)
            .compute_accumulation(&key, larnaca(), date("2024-06-04"))
            .await
            .unwrap();

        let series = ledger.list_series(&key).await.unwrap();
        let last = series.last().unwrap();
        assert_eq!(last.cumulative_gdd, ledger.range_sum(&key).await.unwrap());
        assert_eq!(last.cumulative_gdd, Decimal::from(40));
    }

    #[tokio::test]
    async fn last_record_cumulative_matches_series_sum_after_gap_fill() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-03"), 25, 15);
        weather.set(date("2024-06-02"), DayScript::Unavailable);
        let engine = engine(&ledger, &weather);
        let key = key("2024-06-01", 10);

        let first = engine
            .compute_accumulation(&key, larnaca(), date("2024-06-03"))
            .await
            .unwrap();
        assert_eq!(first.daily[1].date, date("2024-06-03"));
        assert_eq!(first.daily[1].source, DaySource::Provisional);

        weather.set(
            date("2024-06-02"),
            DayScript::Temps {
                tmax: Decimal::from(25),
                tmin: Decimal::from(15),
            },
        );
        engine
            .compute_accumulation(&key, larnaca(), date("2024-06-03"))
            .await
            .unwrap();

        let cumulative: Vec<_> = ledger
            .list_series(&key)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.cumulative_gdd)
            .collect();
        assert_eq!(
            cumulative,
            vec![Decimal::from(10), Decimal::from(20), Decimal::from(30)]
        );
        assert_eq!(ledger.range_sum(&key).await.unwrap(), Decimal::from(30));
    }

    #[tokio::test]
    async fn base_temperatures_are_separate_series() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-02"), 25, 15);
        let engine = engine(&ledger, &weather);

        let base10 = engine
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-02"))
            .await
            .unwrap();
        let base5 = engine
            .compute_accumulation(&key("2024-06-01", 5), larnaca(), date("2024-06-02"))
            .await
            .unwrap();

        assert_eq!(base10.total_gdd, Decimal::from(20));
        assert_eq!(base5.total_gdd, Decimal::from(30));
        assert_eq!(ledger.len().await, 4);
    }

    #[tokio::test]
    async fn concurrent_scans_record_each_day_once() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-10"), 25, 15);
        let key = key("2024-06-01", 10);
        let a = engine(&ledger, &weather);
        let b = engine(&ledger, &weather);

        // Every fetch yields, so both scans miss the ledger for each day
        // before either records it
        let (first, second) = tokio::join!(
            a.compute_accumulation(&key, larnaca(), date("2024-06-10")),
            b.compute_accumulation(&key, larnaca(), date("2024-06-10")),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first.total_gdd, Decimal::from(100));
        assert_eq!(second.total_gdd, Decimal::from(100));
        assert_eq!(weather.calls(), 20);
        assert_eq!(ledger.len().await, 10);

        let adopted = first
            .daily
            .iter()
            .chain(second.daily.iter())
            .filter(|d| d.source == DaySource::Ledger)
            .count();
        assert_eq!(adopted, 10, "each day is recorded by one scan and adopted by the other");
    }

    #[tokio::test]
    async fn lost_insert_adopts_the_recorded_value() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-01"), 25, 15);
        let key = key("2024-06-01", 10);

        // Recorded by another writer with a different value than this scan computes
        let recorded = DailyGddRecord::new(&key, date("2024-06-01"), None, Decimal::from(7), Decimal::from(7));
        ledger.insert_if_absent(&recorded).await.unwrap();
        let racing = RacingLedger::new(ledger.clone(), date("2024-06-01"));

        let result = AccumulationEngine::new(racing, weather.clone(), ExtractionPolicy::FullSweep)
            .compute_accumulation(&key, larnaca(), date("2024-06-01"))
            .await
            .unwrap();

        assert_eq!(weather.calls(), 1);
        assert_eq!(result.daily[0].source, DaySource::Ledger);
        assert_eq!(result.daily[0].gdd, Decimal::from(7));
        assert_eq!(result.total_gdd, Decimal::from(7));
        assert_eq!(ledger.len().await, 1);
    }
}

// ============================================================================
// Missing data
// ============================================================================

mod missing_data {
    use super::*;

    #[tokio::test]
    async fn day_without_samples_is_skipped() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-05"), 25, 15);
        weather.set(date("2024-06-03"), DayScript::Empty);

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-05"))
            .await
            .unwrap();

        assert_eq!(result.daily.len(), 4);
        assert_eq!(result.total_gdd, Decimal::from(40));
        assert!(result.daily.iter().all(|d| d.date != date("2024-06-03")));
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].date, date("2024-06-03"));
        assert!(matches!(result.skipped[0].reason, SkipReason::NoData(_)));
        assert!(result.summary.contains("4 of 5 days"));
    }

    #[tokio::test]
    async fn provider_failure_is_skipped_not_fatal() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-03"), 25, 15);
        weather.set(date("2024-06-02"), DayScript::Unavailable);

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-03"))
            .await
            .unwrap();

        assert_eq!(result.daily.len(), 2);
        assert_eq!(result.total_gdd, Decimal::from(20));
        assert!(matches!(result.skipped[0].reason, SkipReason::FetchFailed(_)));
    }

    #[tokio::test]
    async fn skipped_day_is_retried_on_next_scan() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-03"), 25, 15);
        weather.set(date("2024-06-02"), DayScript::Unavailable);
        let engine = engine(&ledger, &weather);
        let key = key("2024-06-01", 10);

        let first = engine
            .compute_accumulation(&key, larnaca(), date("2024-06-03"))
            .await
            .unwrap();
        // Day 3 is counted but waits for day 2 before it is recorded
        assert_eq!(ledger.len().await, 1);

        weather.set(
            date("2024-06-02"),
            DayScript::Temps {
                tmax: Decimal::from(25),
                tmin: Decimal::from(15),
            },
        );
        let second = engine
            .compute_accumulation(&key, larnaca(), date("2024-06-03"))
            .await
            .unwrap();

        assert_eq!(first.total_gdd, Decimal::from(20));
        assert_eq!(second.total_gdd, Decimal::from(30));
        assert!(second.skipped.is_empty());
        assert_eq!(second.daily[0].source, DaySource::Ledger);
        assert_eq!(second.daily[1].source, DaySource::Computed);
        assert_eq!(second.daily[2].source, DaySource::Computed);
        assert_eq!(weather.calls(), 5);
        assert_eq!(ledger.len().await, 3);
    }

    #[tokio::test]
    async fn fixed_windows_skip_partial_days() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-03"), 25, 15);
        weather.set(date("2024-06-02"), DayScript::AfternoonOnly(Decimal::from(30)));

        let result = AccumulationEngine::new(ledger.clone(), weather.clone(), ExtractionPolicy::FixedWindows)
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-03"))
            .await
            .unwrap();

        assert_eq!(result.daily.len(), 2);
        assert_eq!(result.total_gdd, Decimal::from(20));
        assert!(matches!(result.skipped[0].reason, SkipReason::NoData(_)));
    }

    #[tokio::test]
    async fn full_sweep_accepts_a_single_sample() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::new();
        weather.set(date("2024-06-01"), DayScript::AfternoonOnly(Decimal::from(30)));

        let result = engine(&ledger, &weather)
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-01"))
            .await
            .unwrap();

        assert_eq!(result.total_gdd, Decimal::from(20));
    }
}

// ============================================================================
// Scan deadline
// ============================================================================

mod deadline {
    use super::*;

    #[tokio::test]
    async fn slow_day_truncates_with_partial_result() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-04"), 25, 15);
        weather.set(date("2024-06-02"), DayScript::Slow(Duration::from_secs(30)));

        let result = engine(&ledger, &weather)
            .with_deadline(Some(Duration::from_millis(200)))
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-04"))
            .await
            .unwrap();

        assert!(result.truncated);
        assert_eq!(result.daily.len(), 1);
        assert_eq!(result.total_gdd, Decimal::from(10));
        assert_eq!(result.growth_stage, GrowthStage::BudDevelopment);
        assert!(result.summary.contains("Scan stopped early"));
        assert_eq!(ledger.len().await, 1);
    }

    #[tokio::test]
    async fn generous_deadline_completes() {
        let ledger = InMemoryGddLedger::new();
        let weather = ScriptedWeather::constant(date("2024-06-01"), date("2024-06-04"), 25, 15);

        let result = engine(&ledger, &weather)
            .with_deadline(Some(Duration::from_secs(30)))
            .compute_accumulation(&key("2024-06-01", 10), larnaca(), date("2024-06-04"))
            .await
            .unwrap();

        assert!(!result.truncated);
        assert_eq!(result.total_gdd, Decimal::from(40));
    }
}
