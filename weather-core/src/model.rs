use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Result of geocoding a city name. Lives for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Provider local time of the reading.
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: u8,
    pub apparent_temperature: f64,
    /// Mean sea level pressure, hPa.
    pub pressure: f64,
    /// km/h
    pub wind_speed: f64,
    pub weather_code: i32,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub weather_code: i32,
    pub description: String,
    pub icon: String,
    pub temp_max: f64,
    pub temp_min: f64,
    pub apparent_temp_max: f64,
    pub apparent_temp_min: f64,
    /// 0-100
    pub precipitation_probability: u8,
    pub wind_speed_max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub city: String,
    pub country: Option<String>,
    pub weather: CurrentWeather,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub city: String,
    pub country: Option<String>,
    /// Chronological, one entry per day returned by the provider.
    pub forecast: Vec<ForecastDay>,
}
