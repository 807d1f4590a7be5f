//! Business logic services for the GDD tracker

pub mod accumulation;

pub use accumulation::AccumulationEngine;
