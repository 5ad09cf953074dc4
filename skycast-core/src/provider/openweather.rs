use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::{
    error::WeatherError,
    model::{CityQuery, CurrentWeather, ForecastDay, WeatherReport},
};

use super::WeatherProvider;

const DT_TXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    /// `timeout` of `None` keeps reqwest's default transport behaviour.
    pub fn new(
        api_key: String,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, WeatherError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Sends one GET and returns the body of a successful response.
    async fn get_body(&self, endpoint: &str, city: &str) -> Result<String, WeatherError> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(%url, city, "Requesting OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&[("q", city), ("units", "metric"), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            debug!(endpoint, %status, body = %truncate_body(&body), "OpenWeather request failed");
            return Err(WeatherError::LocationNotFound { status: status.as_u16() });
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    icon: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt_txt: String,
    main: OwMain,
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

fn parse_json<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, WeatherError> {
    serde_json::from_str(body)
        .map_err(|e| WeatherError::InvalidResponse(format!("{what}: {e}")))
}

fn parse_current(body: &str) -> Result<CurrentWeather, WeatherError> {
    let parsed: OwCurrentResponse = parse_json(body, "current weather")?;

    let condition = parsed.weather.into_iter().next().ok_or_else(|| {
        WeatherError::InvalidResponse("current weather has no conditions".to_string())
    })?;

    Ok(CurrentWeather {
        location_name: parsed.name,
        temperature_c: parsed.main.temp,
        condition_code: condition.icon,
        condition_description: condition.description,
    })
}

/// Keeps the readings labelled exactly noon, one per day, in source order.
/// Days without a noon reading are simply absent.
fn parse_forecast(body: &str) -> Result<Vec<ForecastDay>, WeatherError> {
    let parsed: OwForecastResponse = parse_json(body, "forecast")?;

    let mut days = Vec::new();
    for entry in parsed.list {
        let stamp = match NaiveDateTime::parse_from_str(&entry.dt_txt, DT_TXT_FORMAT) {
            Ok(stamp) => stamp,
            Err(err) => {
                debug!(dt_txt = %entry.dt_txt, error = %err, "Skipping unparseable forecast reading");
                continue;
            }
        };
        if (stamp.hour(), stamp.minute(), stamp.second()) != (12, 0, 0) {
            continue;
        }

        let condition = entry.weather.into_iter().next().ok_or_else(|| {
            WeatherError::InvalidResponse(format!("forecast reading {} has no conditions", entry.dt_txt))
        })?;

        days.push(ForecastDay {
            date: stamp.date(),
            temperature_c: entry.main.temp,
            condition_code: condition.icon,
        });
    }

    Ok(days)
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self), fields(city = %query))]
    async fn fetch_weather(&self, query: &CityQuery) -> Result<WeatherReport, WeatherError> {
        if query.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }

        // Both requests run to completion before either status is looked at.
        let (current, forecast) = tokio::join!(
            self.get_body("weather", query.as_str()),
            self.get_body("forecast", query.as_str()),
        );
        let (current, forecast) = (current?, forecast?);

        let report = WeatherReport {
            current: parse_current(&current)?,
            forecast: parse_forecast(&forecast)?,
        };

        info!(
            location = %report.current.location_name,
            days = report.forecast.len(),
            "Weather fetched"
        );
        Ok(report)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
