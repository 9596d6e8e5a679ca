use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::Local;
use clap::{Parser, Subcommand};
use inquire::{CustomType, Select, Text};
use tracing_subscriber::EnvFilter;
use weather_core::{Config, ForecastResponse, WeatherResponse, WeatherService};

use crate::server;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "weather-api",
    version,
    about = "City weather service backed by Open-Meteo"
)]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        /// Listen address, overrides `server.bind`.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Show current weather for a city.
    Current {
        city: String,

        /// ISO 3166-1 alpha-2 country code, e.g. "FR".
        #[arg(long, short)]
        country: Option<String>,
    },

    /// Show the daily forecast for a city.
    Forecast {
        city: String,

        /// ISO 3166-1 alpha-2 country code, e.g. "FR".
        #[arg(long, short)]
        country: Option<String>,
    },

    /// Interactively write the configuration file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        init_tracing(&config.logging.level);

        match self.command {
            Command::Serve { bind } => server::serve(config, bind).await?,
            Command::Current { city, country } => {
                let (city, country) = server::validate_city_query(&city, country.as_deref())
                    .map_err(|e| anyhow!(e))?;
                let service = WeatherService::new(&config.upstream)?;
                let res = service.get_current_weather(city, country).await?;
                print!("{}", render_current(&res));
            }
            Command::Forecast { city, country } => {
                let (city, country) = server::validate_city_query(&city, country.as_deref())
                    .map_err(|e| anyhow!(e))?;
                let service = WeatherService::new(&config.upstream)?;
                let res = service.get_forecast(city, country).await?;
                print!("{}", render_forecast(&res));
            }
            Command::Configure => configure(config, self.config.as_deref())?,
        }

        Ok(())
    }
}

/// Logs go to stderr so reports on stdout stay clean. `RUST_LOG` wins over the config level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn configure(mut config: Config, path: Option<&Path>) -> anyhow::Result<()> {
    let geocoding_url = Text::new("Geocoding endpoint:")
        .with_default(&config.upstream.geocoding_url)
        .prompt()?;
    config.upstream.geocoding_url = geocoding_url;

    let forecast_url = Text::new("Forecast endpoint:")
        .with_default(&config.upstream.forecast_url)
        .prompt()?;
    config.upstream.forecast_url = forecast_url;

    config.upstream.timeout_seconds = CustomType::<u64>::new("Request timeout (seconds):")
        .with_default(config.upstream.timeout_seconds)
        .with_error_message("Please type a whole number of seconds")
        .prompt()?;

    config.upstream.forecast_days = CustomType::<u8>::new("Forecast days (1-16):")
        .with_default(config.upstream.forecast_days)
        .with_error_message("Please type a number between 1 and 16")
        .prompt()?;

    let language = Text::new("Language for place names:")
        .with_default(&config.upstream.language)
        .prompt()?;
    config.upstream.language = language;

    let bind = Text::new("HTTP listen address:")
        .with_default(&config.server.bind)
        .prompt()?;
    config.server.bind = bind;

    let levels = vec!["error", "warn", "info", "debug", "trace"];
    let cursor = levels
        .iter()
        .position(|l| *l == config.logging.level)
        .unwrap_or(2);
    config.logging.level = Select::new("Log level:", levels)
        .with_starting_cursor(cursor)
        .prompt()?
        .to_string();

    let saved = match path {
        Some(path) => {
            config.save_to(path)?;
            path.to_path_buf()
        }
        None => config.save().context("Failed to save configuration")?,
    };

    println!("Configuration saved to {}", saved.display());
    Ok(())
}

fn place(city: &str, country: Option<&str>) -> String {
    match country {
        Some(country) => format!("{city}, {country}"),
        None => city.to_string(),
    }
}

fn render_current(res: &WeatherResponse) -> String {
    let w = &res.weather;
    format!(
        "{place}: {description} ({icon})\n\
         \x20 Observed:     {observed}\n\
         \x20 Temperature:  {temp:.1} °C (feels like {feels:.1} °C)\n\
         \x20 Humidity:     {humidity} %\n\
         \x20 Pressure:     {pressure:.1} hPa\n\
         \x20 Wind:         {wind:.1} km/h\n",
        place = place(&res.city, res.country.as_deref()),
        description = w.description,
        icon = w.icon,
        observed = w.timestamp.format("%Y-%m-%d %H:%M"),
        temp = w.temperature,
        feels = w.apparent_temperature,
        humidity = w.humidity,
        pressure = w.pressure,
        wind = w.wind_speed,
    )
}

fn render_forecast(res: &ForecastResponse) -> String {
    let today = Local::now().date_naive();
    let mut out = format!(
        "{}-day forecast for {}\n",
        res.forecast.len(),
        place(&res.city, res.country.as_deref())
    );

    for day in &res.forecast {
        let label = if day.date == today {
            "Today".to_string()
        } else {
            day.date.format("%a %d %b").to_string()
        };

        out.push_str(&format!(
            "  {label:<10} {min:>5.1} / {max:>5.1} °C  {rain:>3}% rain  {wind:>5.1} km/h  {description}\n",
            min = day.temp_min,
            max = day.temp_max,
            rain = day.precipitation_probability,
            wind = day.wind_speed_max,
            description = day.description,
        ));
    }

    out
}
