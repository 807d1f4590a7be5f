//! External API integrations

pub mod geocoding;
pub mod weather;

pub use geocoding::{GeocodeError, Geocoder, GeocodingClient, ResolvedLocation};
pub use weather::{FetchError, WeatherClient, WeatherSource};
