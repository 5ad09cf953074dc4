use crate::{CityQuery, Config, WeatherError, WeatherReport, provider::openweather::OpenWeatherProvider};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Source of current conditions plus a daily forecast for a city.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Fetches both current conditions and the forecast. Either both succeed or
    /// the whole call fails; there is no partial report.
    async fn fetch_weather(&self, query: &CityQuery) -> Result<WeatherReport, WeatherError>;
}

/// Construct the OpenWeather provider from config.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    build_provider(config.effective_api_key(), config)
}

fn build_provider(
    api_key: Option<String>,
    config: &Config,
) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let api_key = api_key.ok_or_else(|| {
        anyhow::anyhow!(
            "No OpenWeather API key configured.\n\
                 Hint: run `skycast configure` or set {}.",
            crate::config::API_KEY_ENV
        )
    })?;

    let provider = OpenWeatherProvider::new(api_key, &config.base_url, config.timeout())?;
    Ok(Box::new(provider))
}
