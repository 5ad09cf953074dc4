//! Plain-text rendering of the controller state.

use skycast_core::{AppState, CurrentWeather, ForecastDay, SearchHistory, round_temperature};

pub const LOADING_LINE: &str = "Updating forecast... ⏳";

/// Terminal stand-in for the provider's icon images.
pub fn condition_glyph(code: &str) -> &'static str {
    match code.get(..2) {
        Some("01") => "☀️",
        Some("02") => "🌤️",
        Some("03" | "04") => "☁️",
        Some("09") => "🌧️",
        Some("10") => "🌦️",
        Some("11") => "⛈️",
        Some("13") => "❄️",
        Some("50") => "🌫️",
        _ => "·",
    }
}

pub fn current_card(current: &CurrentWeather) -> String {
    format!(
        "{}\n  {} {}°C  {}",
        current.location_name,
        condition_glyph(&current.condition_code),
        round_temperature(current.temperature_c),
        current.condition_description,
    )
}

pub fn forecast_cards(days: &[ForecastDay]) -> String {
    days.iter()
        .map(|d| {
            format!(
                "{} {} {}°",
                d.weekday_label(),
                condition_glyph(&d.condition_code),
                round_temperature(d.temperature_c)
            )
        })
        .collect::<Vec<_>>()
        .join("   ")
}

pub fn history_chips(history: &SearchHistory) -> String {
    history.entries().iter().map(|c| format!("[{c}]")).collect::<Vec<_>>().join(" ")
}

/// Full screen for a state. Weather is hidden while loading.
pub fn screen(state: &AppState) -> String {
    let mut out = Vec::new();

    if let Some(title) = &state.title {
        out.push(format!("== {title} =="));
    }
    if !state.history.is_empty() {
        out.push(format!("Recent: {}", history_chips(&state.history)));
    }
    if state.loading {
        out.push(LOADING_LINE.to_string());
    }
    if let Some(error) = &state.error {
        out.push(format!("Error: {error}"));
    }
    if let (Some(weather), false) = (&state.weather, state.loading) {
        out.push(current_card(weather));
        if !state.forecast.is_empty() {
            out.push(format!("  {}", forecast_cards(&state.forecast)));
        }
    }

    out.join("\n")
}
