//! Core library for the city weather API.
//!
//! This crate defines:
//! - The WMO weather code translator
//! - The Open-Meteo backed weather service (geocode, then fetch)
//! - The error taxonomy surfaced to callers
//! - Configuration handling and the per-city search hook
//!
//! It is used by `weather-api`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod model;
pub mod observer;
pub mod provider;
pub mod wmo;

pub use config::{Config, LoggingConfig, ServerConfig, UpstreamConfig};
pub use error::WeatherError;
pub use model::{Coordinates, CurrentWeather, ForecastDay, ForecastResponse, WeatherResponse};
pub use observer::{CitySearchCounter, SearchObserver};
pub use provider::{WeatherProvider, open_meteo::WeatherService};
pub use wmo::{Condition, describe};
