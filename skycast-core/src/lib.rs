//! Core library for the `skycast` weather lookup.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather gateway (current conditions + noon-filtered forecast)
//! - Recent-search history and its persistence
//! - The controller that drives a search end to end
//!
//! It is used by `skycast-cli`, but can also be reused by other front ends.

pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod model;
pub mod provider;
pub mod store;

pub use config::Config;
pub use controller::{AppState, Controller, Phase};
pub use error::WeatherError;
pub use history::SearchHistory;
pub use model::{CityQuery, CurrentWeather, ForecastDay, WeatherReport, round_temperature};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider};
pub use store::{FileStore, MemoryStore, PreferenceStore};
