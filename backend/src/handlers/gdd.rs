//! HTTP handlers for growing degree day endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shared::{
    normalize_location, parse_base_temperature, parse_planting_date, DailyGddEntry,
    DailyGddRecord, GrowthStage, GrowthStageTable, LedgerKey, SkippedDay, StageRange,
};

use crate::config::GddConfig;
use crate::error::{AppError, AppResult};
use crate::external::{GeocodeError, Geocoder, ResolvedLocation};
use crate::services::AccumulationEngine;
use crate::store::{GddLedger, PgGddLedger};
use crate::AppState;

/// Query parameters identifying an accumulation series
#[derive(Debug, Default, Deserialize)]
pub struct GddQuery {
    pub location: Option<String>,
    pub base_temp: Option<String>,
    pub start_date: Option<String>,
}

/// Accumulation request after input validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedGddQuery {
    pub location: String,
    pub base_temperature: Decimal,
    pub planting_date: NaiveDate,
}

impl ValidatedGddQuery {
    pub fn ledger_key(&self) -> LedgerKey {
        LedgerKey::new(self.location.clone(), self.planting_date, self.base_temperature)
    }
}

/// Validate request input, falling back to configured defaults for location
/// and base temperature. The planting date is required.
pub fn validate_gdd_query(query: &GddQuery, defaults: &GddConfig) -> AppResult<ValidatedGddQuery> {
    let location = match query.location.as_deref() {
        Some(location) => {
            normalize_location(location).map_err(|msg| AppError::validation("location", msg))?
        }
        None => defaults.default_location.clone(),
    };

    let base_temperature = match query.base_temp.as_deref() {
        Some(base_temp) => {
            parse_base_temperature(base_temp).map_err(|msg| AppError::validation("base_temp", msg))?
        }
        None => defaults.default_base_temperature,
    };

    let planting_date = parse_planting_date(query.start_date.as_deref().unwrap_or_default())
        .map_err(|msg| AppError::validation("start_date", msg))?;

    Ok(ValidatedGddQuery {
        location,
        base_temperature,
        planting_date,
    })
}

/// Resolve a location name, mapping an unknown place to a client error
pub async fn resolve_location<G: Geocoder>(
    geocoder: &G,
    location: &str,
) -> AppResult<ResolvedLocation> {
    geocoder.resolve(location).await.map_err(|e| match e {
        GeocodeError::NotFound(name) => AppError::InvalidLocation(name),
        other => AppError::ExternalService(other.to_string()),
    })
}

/// Single day of the accumulation
#[derive(Debug, Serialize)]
pub struct DailyGddPoint {
    pub date: NaiveDate,
    pub gdd: Decimal,
}

/// Accumulation response
#[derive(Debug, Serialize)]
pub struct GddResponse {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub base_temperature: Decimal,
    pub planting_date: NaiveDate,
    pub total_gdd: Decimal,
    pub growth_stage: String,
    pub growth_stage_code: GrowthStage,
    pub daily_gdd: Vec<DailyGddPoint>,
    pub temperature_debug: Vec<DailyGddEntry>,
    pub skipped_days: Vec<SkippedDay>,
    pub truncated: bool,
    pub summary: String,
}

/// Compute cumulative GDD and growth stage for a planting
pub async fn get_gdd(
    State(state): State<AppState>,
    Query(query): Query<GddQuery>,
) -> AppResult<Json<GddResponse>> {
    let request = validate_gdd_query(&query, &state.config.gdd)?;
    let resolved = resolve_location(&state.geocoder, &request.location).await?;
    let key = request.ledger_key();

    let engine = AccumulationEngine::new(
        PgGddLedger::new(state.db.clone()),
        state.weather.clone(),
        state.config.gdd.extraction_policy,
    )
    .with_deadline(state.config.gdd.scan_deadline());

    let result = engine
        .compute_accumulation(&key, resolved.coordinates, Utc::now().date_naive())
        .await?;

    Ok(Json(GddResponse {
        location: key.location,
        latitude: resolved.coordinates.latitude,
        longitude: resolved.coordinates.longitude,
        base_temperature: key.base_temperature,
        planting_date: key.planting_date,
        total_gdd: result.total_gdd,
        growth_stage: result.growth_stage.to_string(),
        growth_stage_code: result.growth_stage,
        daily_gdd: result
            .daily
            .iter()
            .map(|entry| DailyGddPoint {
                date: entry.date,
                gdd: entry.gdd,
            })
            .collect(),
        temperature_debug: result.daily,
        skipped_days: result.skipped,
        truncated: result.truncated,
        summary: result.summary,
    }))
}

/// Stored ledger series response
#[derive(Debug, Serialize)]
pub struct LedgerResponse {
    pub location: String,
    pub planting_date: NaiveDate,
    pub base_temperature: Decimal,
    pub range_sum: Decimal,
    pub records: Vec<DailyGddRecord>,
}

/// Read back the stored series for a planting
pub async fn get_gdd_ledger(
    State(state): State<AppState>,
    Query(query): Query<GddQuery>,
) -> AppResult<Json<LedgerResponse>> {
    let request = validate_gdd_query(&query, &state.config.gdd)?;
    let key = request.ledger_key();
    let ledger = PgGddLedger::new(state.db.clone());

    Ok(Json(ledger_response(&ledger, key).await?))
}

/// Build the ledger view for `key` from any ledger.
/// A series with no stored days is reported as not found.
pub async fn ledger_response<L: GddLedger>(ledger: &L, key: LedgerKey) -> AppResult<LedgerResponse> {
    let records = ledger.list_series(&key).await?;
    if records.is_empty() {
        return Err(AppError::NotFound(format!("Ledger series {}", key)));
    }
    let range_sum = ledger.range_sum(&key).await?;

    Ok(LedgerResponse {
        location: key.location,
        planting_date: key.planting_date,
        base_temperature: key.base_temperature,
        range_sum,
        records,
    })
}

/// One row of the growth stage table
#[derive(Debug, Serialize)]
pub struct StageRangeResponse {
    pub lower: u32,
    pub upper: Option<u32>,
    pub stage: GrowthStage,
    pub label: &'static str,
}

impl From<&StageRange> for StageRangeResponse {
    fn from(range: &StageRange) -> Self {
        Self {
            lower: range.lower,
            upper: range.upper,
            stage: range.stage,
            label: range.stage.label(),
        }
    }
}

/// List the growth stage table
pub async fn list_growth_stages() -> Json<Vec<StageRangeResponse>> {
    Json(
        GrowthStageTable::standard()
            .ranges()
            .iter()
            .map(StageRangeResponse::from)
            .collect(),
    )
}
