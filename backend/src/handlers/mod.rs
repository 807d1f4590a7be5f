//! HTTP handlers for the GDD tracker

pub mod gdd;
pub mod health;
pub mod weather;

pub use gdd::*;
pub use health::*;
pub use weather::*;
