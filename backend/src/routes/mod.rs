//! Route definitions for the GDD tracker

use axum::{routing::get, Router};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Growing degree day accumulation
        .nest("/gdd", gdd_routes())
        // Weather feed inspection
        .nest("/weather", weather_routes())
}

/// Growing degree day routes
fn gdd_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_gdd))
        .route("/ledger", get(handlers::get_gdd_ledger))
        .route("/stages", get(handlers::list_growth_stages))
}

/// Weather routes
fn weather_routes() -> Router<AppState> {
    Router::new().route("/raw", get(handlers::get_raw_weather))
}
