//! External data sources.
//!
//! - Open-Meteo geocoding + hourly archive (`openmeteo`)

pub mod openmeteo;

pub use openmeteo::{GeoLocation, OpenMeteoClient, WeatherRequest};
