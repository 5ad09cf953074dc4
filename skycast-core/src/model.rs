use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-text location typed by the user. Surrounding whitespace is trimmed;
/// an empty query is the "do nothing" sentinel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityQuery(String);

impl CityQuery {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CityQuery {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CityQuery {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Conditions right now, as reported by the current-weather endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    /// Canonical location name returned by the provider.
    pub location_name: String,
    pub temperature_c: f64,
    /// Provider icon id, e.g. "01d".
    pub condition_code: String,
    pub condition_description: String,
}

impl CurrentWeather {
    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@4x.png", self.condition_code)
    }
}

/// One representative (noon) reading per calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temperature_c: f64,
    pub condition_code: String,
}

impl ForecastDay {
    /// Short English weekday, e.g. "Mon".
    pub fn weekday_label(&self) -> String {
        self.date.format("%a").to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub current: CurrentWeather,
    pub forecast: Vec<ForecastDay>,
}

/// Rounds to the nearest whole degree, halves toward positive infinity.
pub fn round_temperature(celsius: f64) -> i64 {
    let floor = celsius.floor();
    if celsius - floor >= 0.5 { floor as i64 + 1 } else { floor as i64 }
}
