//! PostgreSQL-backed ledger

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use shared::{DailyGddRecord, LedgerKey};

use super::GddLedger;
use crate::error::AppResult;

/// Ledger stored in the `daily_gdd_records` table
#[derive(Clone)]
pub struct PgGddLedger {
    db: PgPool,
}

/// Daily GDD record row
#[derive(Debug, Clone, FromRow)]
struct DailyGddRow {
    id: Uuid,
    location: String,
    planting_date: NaiveDate,
    record_date: NaiveDate,
    base_temperature: Decimal,
    tmin: Option<Decimal>,
    tmax: Option<Decimal>,
    daily_gdd: Decimal,
    cumulative_gdd: Decimal,
    created_at: DateTime<Utc>,
}

impl From<DailyGddRow> for DailyGddRecord {
    fn from(row: DailyGddRow) -> Self {
        DailyGddRecord {
            id: row.id,
            location: row.location,
            planting_date: row.planting_date,
            record_date: row.record_date,
            base_temperature: row.base_temperature,
            tmin: row.tmin,
            tmax: row.tmax,
            daily_gdd: row.daily_gdd,
            cumulative_gdd: row.cumulative_gdd,
            created_at: row.created_at,
        }
    }
}

impl PgGddLedger {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

impl GddLedger for PgGddLedger {
    async fn find(
        &self,
        key: &LedgerKey,
        record_date: NaiveDate,
    ) -> AppResult<Option<DailyGddRecord>> {
        let row = sqlx::query_as::<_, DailyGddRow>(
            r#"
            SELECT id, location, planting_date, record_date, base_temperature,
                   tmin, tmax, daily_gdd, cumulative_gdd, created_at
            FROM daily_gdd_records
            WHERE location = $1
              AND planting_date = $2
              AND base_temperature = $3
              AND record_date = $4
            "#,
        )
        .bind(&key.location)
        .bind(key.planting_date)
        .bind(key.base_temperature)
        .bind(record_date)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(DailyGddRecord::from))
    }

    async fn insert_if_absent(&self, record: &DailyGddRecord) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO daily_gdd_records (
                id, location, planting_date, record_date, base_temperature,
                tmin, tmax, daily_gdd, cumulative_gdd, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (location, planting_date, base_temperature, record_date) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.location)
        .bind(record.planting_date)
        .bind(record.record_date)
        .bind(record.base_temperature)
        .bind(record.tmin)
        .bind(record.tmax)
        .bind(record.daily_gdd)
        .bind(record.cumulative_gdd)
        .bind(record.created_at)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_series(&self, key: &LedgerKey) -> AppResult<Vec<DailyGddRecord>> {
        let rows = sqlx::query_as::<_, DailyGddRow>(
            r#"
            SELECT id, location, planting_date, record_date, base_temperature,
                   tmin, tmax, daily_gdd, cumulative_gdd, created_at
            FROM daily_gdd_records
            WHERE location = $1
              AND planting_date = $2
              AND base_temperature = $3
            ORDER BY record_date ASC
            "#,
        )
        .bind(&key.location)
        .bind(key.planting_date)
        .bind(key.base_temperature)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DailyGddRecord::from).collect())
    }

    async fn range_sum(&self, key: &LedgerKey) -> AppResult<Decimal> {
        let total = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(daily_gdd), 0)
            FROM daily_gdd_records
            WHERE location = $1
              AND planting_date = $2
              AND base_temperature = $3
            "#,
        )
        .bind(&key.location)
        .bind(key.planting_date)
        .bind(key.base_temperature)
        .fetch_one(&self.db)
        .await?;

        Ok(total)
    }
}
