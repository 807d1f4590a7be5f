//! WebAssembly module for the GDD tracker
//!
//! Provides client-side computation for:
//! - Daily GDD from a min/max pair
//! - Growth stage classification
//! - Min/max extraction from hourly samples
//! - Request validation before hitting the backend

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("gdd-tracker-wasm loaded"));
}

fn to_decimal(value: f64, name: &str) -> Result<Decimal, String> {
    Decimal::try_from(value).map_err(|_| format!("{} must be a finite number", name))
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn daily_gdd(tmax: f64, tmin: f64, base_temp: f64) -> Result<f64, String> {
    let gdd = calculate_gdd(
        to_decimal(tmax, "tmax")?,
        to_decimal(tmin, "tmin")?,
        to_decimal(base_temp, "base_temp")?,
    );
    Ok(to_f64(gdd))
}

fn stage_label(total_gdd: f64) -> Result<String, String> {
    let stage = classify_growth_stage(to_decimal(total_gdd, "total_gdd")?).map_err(|e| e.to_string())?;
    Ok(stage.label().to_string())
}

fn extract(observations_json: &str, policy: &str) -> Result<String, String> {
    let observations: DailyObservations = serde_json::from_str(observations_json)
        .map_err(|e| format!("Invalid observations JSON: {}", e))?;
    let policy: ExtractionPolicy = serde_json::from_value(serde_json::Value::String(policy.to_string()))
        .map_err(|_| format!("Unknown extraction policy: {}", policy))?;

    let range = extract_temperatures(policy, &observations).map_err(|e| e.to_string())?;
    serde_json::to_string(&range).map_err(|e| e.to_string())
}

#[derive(Serialize)]
struct StageRow {
    lower: u32,
    upper: Option<u32>,
    stage: GrowthStage,
    label: &'static str,
}

fn stage_table() -> Result<String, String> {
    let rows: Vec<StageRow> = GrowthStageTable::standard()
        .ranges()
        .iter()
        .map(|range| StageRow {
            lower: range.lower,
            upper: range.upper,
            stage: range.stage,
            label: range.stage.label(),
        })
        .collect();
    serde_json::to_string(&rows).map_err(|e| e.to_string())
}

/// Daily GDD for one day's min/max at a base temperature
#[wasm_bindgen]
pub fn calculate_daily_gdd(tmax: f64, tmin: f64, base_temp: f64) -> Result<f64, JsValue> {
    daily_gdd(tmax, tmin, base_temp).map_err(|e| JsValue::from_str(&e))
}

/// Growth stage label for a cumulative GDD total
#[wasm_bindgen]
pub fn classify_stage(total_gdd: f64) -> Result<String, JsValue> {
    stage_label(total_gdd).map_err(|e| JsValue::from_str(&e))
}

/// Stage table as JSON rows of `{lower, upper, stage, label}`
#[wasm_bindgen]
pub fn growth_stage_table_json() -> Result<String, JsValue> {
    stage_table().map_err(|e| JsValue::from_str(&e))
}

/// Stage labels in table order
#[wasm_bindgen]
pub fn growth_stage_labels() -> js_sys::Array {
    GrowthStageTable::standard()
        .ranges()
        .iter()
        .map(|range| JsValue::from_str(range.stage.label()))
        .collect()
}

/// Extract `{tmin, tmax}` JSON from a day of samples.
/// `policy` is `full_sweep` or `fixed_windows`.
#[wasm_bindgen]
pub fn extract_daily_temperatures(observations_json: &str, policy: &str) -> Result<String, JsValue> {
    extract(observations_json, policy).map_err(|e| JsValue::from_str(&e))
}

/// Check a planting date; returns the error message, or an empty string when valid
#[wasm_bindgen]
pub fn check_planting_date(value: &str) -> String {
    match parse_planting_date(value) {
        Ok(_) => String::new(),
        Err(msg) => msg.to_string(),
    }
}

/// Check a base temperature; returns the error message, or an empty string when valid
#[wasm_bindgen]
pub fn check_base_temperature(value: &str) -> String {
    match parse_base_temperature(value) {
        Ok(_) => String::new(),
        Err(msg) => msg.to_string(),
    }
}
