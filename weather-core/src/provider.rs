use crate::{ForecastResponse, WeatherError, WeatherResponse};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod open_meteo;

/// Weather lookups keyed by city name, optionally narrowed by an ISO country code.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn get_current_weather(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<WeatherResponse, WeatherError>;

    async fn get_forecast(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<ForecastResponse, WeatherError>;
}
