//! Test fixtures shared by the accumulation tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use gdd_backend::external::{FetchError, WeatherSource};
use shared::{Coordinates, DailyObservations, LedgerKey, TemperatureSample};

/// What the scripted source returns for a day
#[derive(Debug, Clone, Copy)]
pub enum DayScript {
    /// Morning reading `tmin`, afternoon reading `tmax`
    Temps { tmax: Decimal, tmin: Decimal },
    /// Only an afternoon reading
    AfternoonOnly(Decimal),
    /// Successful response without samples
    Empty,
    /// Provider error
    Unavailable,
    /// Answer after a delay
    Slow(Duration),
}

/// Weather source answering from a per-day script.
/// Days without a script fail like a provider error.
#[derive(Clone, Default)]
pub struct ScriptedWeather {
    days: Arc<Mutex<HashMap<NaiveDate, DayScript>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedWeather {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, date: NaiveDate, script: DayScript) {
        self.days.lock().unwrap().insert(date, script);
    }

    /// Script the same `(tmax, tmin)` for every day in `start..=end`
    pub fn constant(start: NaiveDate, end: NaiveDate, tmax: i64, tmin: i64) -> Self {
        let weather = Self::new();
        for day in start.iter_days().take_while(|d| *d <= end) {
            weather.set(
                day,
                DayScript::Temps {
                    tmax: Decimal::from(tmax),
                    tmin: Decimal::from(tmin),
                },
            );
        }
        weather
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn sample(date: NaiveDate, hour: u32, value: Decimal) -> TemperatureSample {
    let timestamp = Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap());
    TemperatureSample {
        timestamp,
        temperature_celsius: value,
        temp_min_celsius: value,
        temp_max_celsius: value,
    }
}

impl WeatherSource for ScriptedWeather {
    async fn fetch_day(
        &self,
        _coordinates: Coordinates,
        date: NaiveDate,
    ) -> Result<DailyObservations, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // Suspend like a network call so concurrent scans interleave
        tokio::task::yield_now().await;
        let script = self.days.lock().unwrap().get(&date).copied();

        match script {
            Some(DayScript::Temps { tmax, tmin }) => Ok(DailyObservations::new(
                date,
                vec![sample(date, 6, tmin), sample(date, 15, tmax)],
            )),
            Some(DayScript::AfternoonOnly(tmax)) => {
                Ok(DailyObservations::new(date, vec![sample(date, 15, tmax)]))
            }
            Some(DayScript::Empty) => Ok(DailyObservations::new(date, vec![])),
            Some(DayScript::Slow(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(DailyObservations::new(date, vec![]))
            }
            Some(DayScript::Unavailable) | None => Err(FetchError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
        }
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

pub fn larnaca() -> Coordinates {
    Coordinates::new(34.9229, 33.6233)
}

pub fn key(planting: &str, base_temp: i64) -> LedgerKey {
    LedgerKey::new("Larnaca", date(planting), Decimal::from(base_temp))
}
