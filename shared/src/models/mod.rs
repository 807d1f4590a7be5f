//! Domain models for growing degree day tracking

mod gdd;
mod growth_stage;
mod temperature;

pub use gdd::*;
pub use growth_stage::*;
pub use temperature::*;
