//! Accumulation ledger storage
//!
//! The ledger holds one record per `(location, planting_date, base_temperature,
//! record_date)`. Records are inserted once and never updated or deleted.

use std::future::Future;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use shared::{DailyGddRecord, LedgerKey};

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryGddLedger;
pub use postgres::PgGddLedger;

/// Storage contract for daily GDD records
pub trait GddLedger: Send + Sync {
    /// Record for one day of a series, if already stored
    fn find(
        &self,
        key: &LedgerKey,
        record_date: NaiveDate,
    ) -> impl Future<Output = AppResult<Option<DailyGddRecord>>> + Send;

    /// Insert unless a record for the same series day exists.
    /// Returns `false` when the day was already recorded.
    fn insert_if_absent(
        &self,
        record: &DailyGddRecord,
    ) -> impl Future<Output = AppResult<bool>> + Send;

    /// Every record of a series, ordered by `record_date`
    fn list_series(
        &self,
        key: &LedgerKey,
    ) -> impl Future<Output = AppResult<Vec<DailyGddRecord>>> + Send;

    /// Sum of `daily_gdd` over a series
    fn range_sum(&self, key: &LedgerKey) -> impl Future<Output = AppResult<Decimal>> + Send;
}
