use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use weather_core::{
    CitySearchCounter, Config, ForecastResponse, WeatherError, WeatherProvider, WeatherResponse,
    WeatherService,
};

#[derive(Debug, Clone)]
pub struct AppState {
    pub provider: Arc<dyn WeatherProvider>,
    pub searches: Arc<CitySearchCounter>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/health", get(health))
        .route("/weather/current", get(current_weather))
        .route("/weather/forecast", get(forecast));

    Router::new()
        .nest("/api", api)
        .route("/metrics", get(metrics))
        .layer(cors)
        .with_state(state)
}

pub async fn serve(config: Config, bind: Option<String>) -> anyhow::Result<()> {
    let searches = Arc::new(CitySearchCounter::new());
    let service = WeatherService::new(&config.upstream)
        .context("Failed to create weather service")?
        .with_observer(searches.clone());

    let state = AppState {
        provider: Arc::new(service),
        searches,
    };

    let addr = bind.unwrap_or(config.server.bind);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Weather API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[derive(Debug, Deserialize)]
pub struct CityParams {
    pub city: Option<String>,
    pub country_code: Option<String>,
}

impl CityParams {
    fn validated(&self) -> Result<(&str, Option<&str>), ApiError> {
        let city = self
            .city
            .as_deref()
            .ok_or_else(|| ApiError::Invalid("city is required".to_string()))?;

        validate_city_query(city, self.country_code.as_deref()).map_err(ApiError::Invalid)
    }
}

/// Trim and check a city query. An empty country code counts as absent.
pub fn validate_city_query<'a>(
    city: &'a str,
    country_code: Option<&'a str>,
) -> Result<(&'a str, Option<&'a str>), String> {
    let city = city.trim();
    if city.is_empty() {
        return Err("city must not be empty".to_string());
    }

    let country_code = country_code.map(str::trim).filter(|c| !c.is_empty());
    if let Some(code) = country_code
        && code.chars().count() > 2
    {
        return Err(format!(
            "country_code must be at most 2 characters, got '{code}'"
        ));
    }

    Ok((city, country_code))
}

#[derive(Debug)]
pub enum ApiError {
    Invalid(String),
    Weather(WeatherError),
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        ApiError::Weather(err)
    }
}

pub fn status_for(err: &WeatherError) -> StatusCode {
    match err {
        WeatherError::NotFound { .. } => StatusCode::NOT_FOUND,
        WeatherError::Upstream { .. } | WeatherError::Transport(_) => StatusCode::BAD_GATEWAY,
        WeatherError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Invalid(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Weather(err) => (status_for(&err), err.to_string()),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

fn log_failure(err: &WeatherError) {
    if err.is_not_found() {
        info!("{}", err);
    } else {
        error!("Weather lookup failed: {:?}", err);
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn current_weather(
    State(state): State<AppState>,
    Query(params): Query<CityParams>,
) -> Result<Json<WeatherResponse>, ApiError> {
    let (city, country_code) = params.validated()?;

    let res = state
        .provider
        .get_current_weather(city, country_code)
        .await
        .inspect_err(log_failure)?;

    Ok(Json(res))
}

async fn forecast(
    State(state): State<AppState>,
    Query(params): Query<CityParams>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let (city, country_code) = params.validated()?;

    let res = state
        .provider
        .get_forecast(city, country_code)
        .await
        .inspect_err(log_failure)?;

    Ok(Json(res))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.searches.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request};
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use weather_core::{CurrentWeather, ForecastDay, SearchObserver};

    #[derive(Debug, Clone, Copy)]
    enum Outcome {
        Success,
        NotFound,
        Upstream(StatusCode),
        Internal,
    }

    #[derive(Debug)]
    struct FakeProvider {
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: AtomicUsize::new(0),
            }
        }

        fn result<T>(&self, city: &str, ok: impl FnOnce() -> T) -> Result<T, WeatherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Success => Ok(ok()),
                Outcome::NotFound => Err(WeatherError::NotFound {
                    city: city.to_string(),
                }),
                Outcome::Upstream(status) => Err(WeatherError::Upstream {
                    status,
                    body: "provider down".into(),
                }),
                Outcome::Internal => Err(WeatherError::internal("bad payload")),
            }
        }
    }

    fn paris_day(day: u32, code: i32, precipitation: u8) -> ForecastDay {
        let condition = weather_core::describe(code);
        ForecastDay {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            weather_code: code,
            description: condition.description.into(),
            icon: condition.icon.into(),
            temp_max: 18.0,
            temp_min: 10.0,
            apparent_temp_max: 17.0,
            apparent_temp_min: 9.0,
            precipitation_probability: precipitation,
            wind_speed_max: 15.0,
        }
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn get_current_weather(
            &self,
            city: &str,
            _country_code: Option<&str>,
        ) -> Result<WeatherResponse, WeatherError> {
            self.result(city, || WeatherResponse {
                city: "Paris".into(),
                country: Some("FR".into()),
                weather: CurrentWeather {
                    timestamp: NaiveDate::from_ymd_opt(2024, 1, 20)
                        .unwrap()
                        .and_hms_opt(12, 0, 0)
                        .unwrap(),
                    temperature: 15.5,
                    humidity: 65,
                    apparent_temperature: 14.2,
                    pressure: 1013.2,
                    wind_speed: 10.5,
                    weather_code: 0,
                    description: "clear sky".into(),
                    icon: "01d".into(),
                },
            })
        }

        async fn get_forecast(
            &self,
            city: &str,
            _country_code: Option<&str>,
        ) -> Result<ForecastResponse, WeatherError> {
            self.result(city, || ForecastResponse {
                city: "Paris".into(),
                country: Some("FR".into()),
                forecast: vec![paris_day(20, 0, 0), paris_day(21, 61, 80)],
            })
        }
    }

    fn app_with(provider: Arc<FakeProvider>) -> (Router, Arc<CitySearchCounter>) {
        let searches = Arc::new(CitySearchCounter::new());
        let state = AppState {
            provider,
            searches: searches.clone(),
        };
        (router(state), searches)
    }

    fn app(outcome: Outcome) -> Router {
        app_with(Arc::new(FakeProvider::new(outcome))).0
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, Value) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = send(app(Outcome::Success), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn current_weather_success() {
        let (status, body) = send(
            app(Outcome::Success),
            "/api/weather/current?city=Paris&country_code=FR",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["city"], "Paris");
        assert_eq!(body["country"], "FR");
        assert_eq!(body["weather"]["temperature"], 15.5);
        assert_eq!(body["weather"]["description"], "clear sky");
        assert_eq!(body["weather"]["icon"], "01d");
    }

    #[tokio::test]
    async fn forecast_success_keeps_order() {
        let (status, body) = send(
            app(Outcome::Success),
            "/api/weather/forecast?city=Paris",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let days = body["forecast"].as_array().unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0]["date"], "2024-01-20");
        assert_eq!(days[1]["description"], "light rain");
        assert_eq!(days[1]["precipitation_probability"], 80);
    }

    #[tokio::test]
    async fn not_found_maps_to_404_with_hint() {
        let (status, body) = send(
            app(Outcome::NotFound),
            "/api/weather/current?city=Nowhereville",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.contains("Nowhereville"));
        assert!(detail.contains("country code"));
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_bad_gateway() {
        let (status, body) = send(
            app(Outcome::Upstream(StatusCode::INTERNAL_SERVER_ERROR)),
            "/api/weather/forecast?city=Paris",
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["detail"].as_str().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn internal_failure_maps_to_500() {
        let (status, body) = send(
            app(Outcome::Internal),
            "/api/weather/current?city=Paris",
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().contains("bad payload"));
    }

    #[test]
    fn transport_failure_maps_to_bad_gateway() {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        assert_eq!(
            status_for(&WeatherError::Transport(err)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn invalid_queries_are_rejected_before_lookup() {
        let provider = Arc::new(FakeProvider::new(Outcome::Success));

        for uri in [
            "/api/weather/current?city=",
            "/api/weather/current?city=%20%20",
            "/api/weather/forecast?city=Paris&country_code=FRA",
        ] {
            let (app, _) = app_with(provider.clone());
            let (status, body) = send(app, uri).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
            assert!(body["detail"].is_string(), "{uri}");
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_city_is_rejected_with_detail() {
        let provider = Arc::new(FakeProvider::new(Outcome::Success));

        for uri in ["/api/weather/current", "/api/weather/forecast?country_code=FR"] {
            let (app, _) = app_with(provider.clone());
            let (status, body) = send(app, uri).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{uri}");
            assert_eq!(body["detail"], "city is required", "{uri}");
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn validate_city_query_trims_and_drops_empty_country() {
        assert_eq!(
            validate_city_query(" Paris ", Some(" fr ")),
            Ok(("Paris", Some("fr")))
        );
        assert_eq!(validate_city_query("Paris", Some("")), Ok(("Paris", None)));
        assert!(validate_city_query("", None).is_err());
        assert!(validate_city_query("Paris", Some("FRA")).is_err());
        assert_eq!(
            validate_city_query("Paris", Some("  FR  ")),
            Ok(("Paris", Some("FR")))
        );
        assert_eq!(
            validate_city_query("Paris", Some(" FRA ")),
            Err("country_code must be at most 2 characters, got 'FRA'".to_string())
        );
    }

    #[tokio::test]
    async fn metrics_lists_recorded_cities() {
        let (app, searches) = app_with(Arc::new(FakeProvider::new(Outcome::Success)));
        searches.record_search("paris");
        searches.record_search("paris");

        let res = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("weather_city_searches_total{city=\"paris\"} 2"));
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let res = app(Outcome::Success)
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            res.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }
}
