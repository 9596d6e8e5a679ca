//! Open-Meteo backed weather service.
//!
//! Every lookup is two sequential calls: the geocoding API turns a city name
//! into coordinates, then the forecast API is queried at those coordinates.
//! Each call is attempted exactly once; failures surface immediately as a
//! classified [`WeatherError`].

use std::{sync::Arc, time::Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use tracing::{debug, info, instrument, warn};

use super::WeatherProvider;
use crate::{
    config::UpstreamConfig,
    error::{WeatherError, truncate_body},
    model::{Coordinates, CurrentWeather, ForecastDay, ForecastResponse, WeatherResponse},
    observer::{SearchObserver, normalize_city},
    wmo,
};

const USER_AGENT: &str = concat!("weather-api/", env!("CARGO_PKG_VERSION"));

/// First match wins, so there is no point asking for more.
const GEOCODING_MATCHES: &str = "1";

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,is_day,\
                              pressure_msl,wind_speed_10m,weather_code";

const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min,\
                            apparent_temperature_max,apparent_temperature_min,\
                            precipitation_probability_max,wind_speed_10m_max";

#[derive(Debug, Clone)]
pub struct WeatherService {
    http: Client,
    upstream: UpstreamConfig,
    observer: Option<Arc<dyn SearchObserver>>,
}

impl WeatherService {
    pub fn new(upstream: &UpstreamConfig) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(upstream.timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WeatherError::internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_client(http, upstream))
    }

    pub fn with_client(http: Client, upstream: &UpstreamConfig) -> Self {
        Self {
            http,
            upstream: upstream.clone(),
            observer: None,
        }
    }

    /// Attach the hook notified once per successful lookup.
    pub fn with_observer(mut self, observer: Arc<dyn SearchObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Geocode `city`, optionally restricted to `country_code`.
    #[instrument(skip(self))]
    pub async fn resolve_coordinates(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<Coordinates, WeatherError> {
        let mut query = vec![
            ("name", city.trim().to_string()),
            ("count", GEOCODING_MATCHES.to_string()),
            ("language", self.upstream.language.clone()),
            ("format", "json".to_string()),
        ];
        if let Some(code) = country_code {
            query.push(("countryCode", code.trim().to_uppercase()));
        }

        let parsed: GeocodingResponse = self
            .fetch_json(&self.upstream.geocoding_url, &query, "geocoding")
            .await?;

        let Some(first) = parsed.results.unwrap_or_default().into_iter().next() else {
            info!("No geocoding match for '{}'", city);
            return Err(WeatherError::NotFound {
                city: city.to_string(),
            });
        };

        debug!(
            "Resolved '{}' to {} ({:.4}, {:.4})",
            city, first.name, first.latitude, first.longitude
        );

        Ok(Coordinates {
            latitude: first.latitude,
            longitude: first.longitude,
            name: first.name,
            country_code: first.country_code,
        })
    }

    #[instrument(skip(self))]
    pub async fn get_current_weather(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<WeatherResponse, WeatherError> {
        let coords = self.resolve_coordinates(city, country_code).await?;

        let mut query = coordinate_query(&coords);
        query.push(("current", CURRENT_FIELDS.to_string()));
        query.push(("timezone", "auto".to_string()));

        let parsed: CurrentResponse = self
            .fetch_json(&self.upstream.forecast_url, &query, "current weather")
            .await?;
        let current = parsed.current;

        let condition = wmo::describe_at(current.weather_code, current.is_day != Some(0));

        let response = WeatherResponse {
            city: coords.name,
            country: coords.country_code,
            weather: CurrentWeather {
                timestamp: current.time,
                temperature: current.temperature_2m,
                humidity: current.relative_humidity_2m,
                apparent_temperature: current.apparent_temperature,
                pressure: current.pressure_msl,
                wind_speed: current.wind_speed_10m,
                weather_code: current.weather_code,
                description: condition.description.to_string(),
                icon: condition.icon.to_string(),
            },
        };

        self.record_search(city);
        Ok(response)
    }

    #[instrument(skip(self))]
    pub async fn get_forecast(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<ForecastResponse, WeatherError> {
        let coords = self.resolve_coordinates(city, country_code).await?;

        let mut query = coordinate_query(&coords);
        query.push(("daily", DAILY_FIELDS.to_string()));
        query.push(("timezone", "auto".to_string()));
        query.push(("forecast_days", self.upstream.forecast_days.to_string()));

        let parsed: DailyResponse = self
            .fetch_json(&self.upstream.forecast_url, &query, "forecast")
            .await?;

        let forecast = parsed.daily.into_days()?;
        debug!("Forecast for {} has {} days", coords.name, forecast.len());

        let response = ForecastResponse {
            city: coords.name,
            country: coords.country_code,
            forecast,
        };

        self.record_search(city);
        Ok(response)
    }

    fn record_search(&self, city: &str) {
        if let Some(observer) = &self.observer {
            observer.record_search(&normalize_city(city));
        }
    }

    /// Single GET, no retries. Non-2xx becomes `Upstream`, send/read failures `Transport`.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, WeatherError> {
        let started = Instant::now();

        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!("Open-Meteo {} request failed: {}", what, e);
                WeatherError::Transport(e)
            })?;

        let status = res.status();
        let body = res.text().await.map_err(WeatherError::Transport)?;

        debug!(
            "Open-Meteo {} answered {} in {:.3}s",
            what,
            status,
            started.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            warn!("Open-Meteo {} request failed with status {}", what, status);
            return Err(WeatherError::Upstream {
                status,
                body: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            WeatherError::internal(format!("Failed to parse Open-Meteo {what} JSON: {e}"))
        })
    }
}

#[async_trait]
impl WeatherProvider for WeatherService {
    async fn get_current_weather(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<WeatherResponse, WeatherError> {
        WeatherService::get_current_weather(self, city, country_code).await
    }

    async fn get_forecast(
        &self,
        city: &str,
        country_code: Option<&str>,
    ) -> Result<ForecastResponse, WeatherError> {
        WeatherService::get_forecast(self, city, country_code).await
    }
}

fn coordinate_query(coords: &Coordinates) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", coords.latitude.to_string()),
        ("longitude", coords.longitude.to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    /// Omitted entirely by Open-Meteo when nothing matches.
    results: Option<Vec<GeoMatch>>,
}

#[derive(Debug, Deserialize)]
struct GeoMatch {
    latitude: f64,
    longitude: f64,
    name: String,
    country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    current: OmCurrent,
}

#[derive(Debug, Deserialize)]
struct OmCurrent {
    #[serde(deserialize_with = "local_time")]
    time: NaiveDateTime,
    temperature_2m: f64,
    relative_humidity_2m: u8,
    apparent_temperature: f64,
    is_day: Option<u8>,
    pressure_msl: f64,
    wind_speed_10m: f64,
    weather_code: i32,
}

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: OmDaily,
}

/// Day-indexed parallel arrays.
#[derive(Debug, Deserialize)]
struct OmDaily {
    time: Vec<NaiveDate>,
    weather_code: Vec<i32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    apparent_temperature_max: Vec<f64>,
    apparent_temperature_min: Vec<f64>,
    precipitation_probability_max: Vec<Option<u8>>,
    wind_speed_10m_max: Vec<f64>,
}

impl OmDaily {
    fn into_days(self) -> Result<Vec<ForecastDay>, WeatherError> {
        let days = self.time.len();
        let columns = [
            ("weather_code", self.weather_code.len()),
            ("temperature_2m_max", self.temperature_2m_max.len()),
            ("temperature_2m_min", self.temperature_2m_min.len()),
            ("apparent_temperature_max", self.apparent_temperature_max.len()),
            ("apparent_temperature_min", self.apparent_temperature_min.len()),
            (
                "precipitation_probability_max",
                self.precipitation_probability_max.len(),
            ),
            ("wind_speed_10m_max", self.wind_speed_10m_max.len()),
        ];

        if let Some((name, len)) = columns.iter().find(|(_, len)| *len < days) {
            return Err(WeatherError::internal(format!(
                "Open-Meteo daily.{name} has {len} entries, expected {days}"
            )));
        }

        let forecast = self
            .time
            .iter()
            .enumerate()
            .map(|(i, date)| {
                let code = self.weather_code[i];
                let condition = wmo::describe(code);
                ForecastDay {
                    date: *date,
                    weather_code: code,
                    description: condition.description.to_string(),
                    icon: condition.icon.to_string(),
                    temp_max: self.temperature_2m_max[i],
                    temp_min: self.temperature_2m_min[i],
                    apparent_temp_max: self.apparent_temperature_max[i],
                    apparent_temp_min: self.apparent_temperature_min[i],
                    precipitation_probability: self.precipitation_probability_max[i].unwrap_or(0),
                    wind_speed_max: self.wind_speed_10m_max[i],
                }
            })
            .collect();

        Ok(forecast)
    }
}

/// Open-Meteo reports local time without seconds, e.g. `2024-01-20T12:00`.
fn local_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S"))
        .map_err(serde::de::Error::custom)
}
