//! HTTP handlers for weather feed inspection

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use shared::{
    extract_temperatures, normalize_location, parse_calendar_date, DailyObservations,
    TemperatureRange,
};

use crate::error::{AppError, AppResult};
use crate::external::{ResolvedLocation, WeatherSource};
use crate::handlers::gdd::resolve_location;
use crate::AppState;

/// Query parameters for raw weather lookups
#[derive(Debug, Deserialize)]
pub struct RawWeatherQuery {
    pub location: Option<String>,
    pub date: Option<String>,
}

/// Raw weather response
#[derive(Debug, Serialize)]
pub struct RawWeatherResponse {
    pub location: ResolvedLocation,
    pub observations: DailyObservations,
    /// Min/max under the configured extraction policy, if the day is usable
    pub extracted: Option<TemperatureRange>,
}

/// Fetch one day of normalized hourly samples for manual verification.
/// Defaults to yesterday (UTC).
pub async fn get_raw_weather(
    State(state): State<AppState>,
    Query(query): Query<RawWeatherQuery>,
) -> AppResult<Json<RawWeatherResponse>> {
    let location = match query.location.as_deref() {
        Some(location) => {
            normalize_location(location).map_err(|msg| AppError::validation("location", msg))?
        }
        None => state.config.gdd.default_location.clone(),
    };
    let date = match query.date.as_deref() {
        Some(date) => parse_calendar_date(date).map_err(|msg| AppError::validation("date", msg))?,
        None => Utc::now().date_naive() - Duration::days(1),
    };

    let resolved = resolve_location(&state.geocoder, &location).await?;
    let observations = state
        .weather
        .fetch_day(resolved.coordinates, date)
        .await
        .map_err(|e| AppError::ExternalService(e.to_string()))?;

    tracing::debug!(
        "Fetched {} samples for {} on {}",
        observations.samples.len(),
        resolved.name,
        date
    );

    let extracted = extract_temperatures(state.config.gdd.extraction_policy, &observations).ok();

    Ok(Json(RawWeatherResponse {
        location: resolved,
        observations,
        extracted,
    }))
}
