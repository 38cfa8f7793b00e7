use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{Config, WeatherError, WeatherSnapshot, config::DEFAULT_ENDPOINT};

use super::WeatherProvider;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    endpoint: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            http: Client::new(),
        }
    }

    /// Build from config: API key, endpoint override and optional request timeout.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.require_api_key()?.to_owned();

        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            api_key,
            endpoint: config.endpoint().to_string(),
            http,
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_current(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        debug!(endpoint = %self.endpoint, "Requesting current weather");

        let res = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let err = classify_failure(status, &body);
            warn!(status = status.as_u16(), error = %err, "OpenWeather request failed");
            return Err(err);
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_snapshot())
    }
}

fn classify_failure(status: StatusCode, body: &str) -> WeatherError {
    let provider_message = serde_json::from_str::<OwErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty());

    match status {
        StatusCode::UNAUTHORIZED => WeatherError::Unauthorized,
        StatusCode::NOT_FOUND => WeatherError::not_found(provider_message),
        _ => {
            let message = provider_message
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_else(|| "Unknown error".to_string());
            WeatherError::server(status.as_u16(), message)
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: Option<String>,
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: Option<i64>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
    wind: OwWind,
}

impl OwCurrentResponse {
    fn into_snapshot(self) -> WeatherSnapshot {
        let first = self.weather.into_iter().next();
        let (condition_main, condition_description, icon_id) = match first {
            Some(w) => (
                w.main.unwrap_or_default(),
                w.description.unwrap_or_else(|| "N/A".to_string()),
                w.icon.unwrap_or_default(),
            ),
            None => (String::new(), "N/A".to_string(), String::new()),
        };

        WeatherSnapshot {
            name: self.name,
            temperature_c: self.main.temp,
            humidity_pct: self.main.humidity,
            wind_speed_mps: self.wind.speed,
            condition_main,
            condition_description,
            icon_id,
            observed_at: self.dt.and_then(unix_to_utc),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self), fields(city = %city))]
    async fn current_weather(&self, city: &str) -> Result<WeatherSnapshot, WeatherError> {
        self.fetch_current(city).await
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}
