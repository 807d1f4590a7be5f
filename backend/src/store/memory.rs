//! In-process ledger with the same uniqueness contract as the database

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use shared::{DailyGddRecord, LedgerKey};

use super::GddLedger;
use crate::error::AppResult;

type Series = BTreeMap<NaiveDate, DailyGddRecord>;

/// Ledger kept in memory. Clones share the same records.
#[derive(Clone, Default)]
pub struct InMemoryGddLedger {
    series: Arc<RwLock<BTreeMap<LedgerKey, Series>>>,
}

impl InMemoryGddLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records across all series
    pub async fn len(&self) -> usize {
        self.series.read().await.values().map(BTreeMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl GddLedger for InMemoryGddLedger {
    async fn find(
        &self,
        key: &LedgerKey,
        record_date: NaiveDate,
    ) -> AppResult<Option<DailyGddRecord>> {
        let series = self.series.read().await;
        Ok(series
            .get(key)
            .and_then(|days| days.get(&record_date))
            .cloned())
    }

    async fn insert_if_absent(&self, record: &DailyGddRecord) -> AppResult<bool> {
        let mut series = self.series.write().await;
        let days = series.entry(record.key()).or_default();
        if days.contains_key(&record.record_date) {
            return Ok(false);
        }
        days.insert(record.record_date, record.clone());
        Ok(true)
    }

    async fn list_series(&self, key: &LedgerKey) -> AppResult<Vec<DailyGddRecord>> {
        let series = self.series.read().await;
        Ok(series
            .get(key)
            .map(|days| days.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn range_sum(&self, key: &LedgerKey) -> AppResult<Decimal> {
        let series = self.series.read().await;
        Ok(series
            .get(key)
            .map(|days| days.values().map(|r| r.daily_gdd).sum())
            .unwrap_or(Decimal::ZERO))
    }
}
