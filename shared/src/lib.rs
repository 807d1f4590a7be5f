//! Shared types and models for the GDD tracker
//!
//! This crate contains the pure accumulation building blocks (temperature
//! extraction, the daily GDD calculation, growth stage classification) shared
//! between the backend and the browser bindings (via WASM).

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
