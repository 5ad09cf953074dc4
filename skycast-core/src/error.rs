use thiserror::Error;

/// Failures on the fetch path. Everything here ends up as the controller's
/// error message; nothing is retried.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Blank query; callers treat this as a no-op, never as a visible error.
    #[error("Empty city query")]
    EmptyQuery,

    /// One of the endpoints answered with a non-success status.
    #[error("Location not found")]
    LocationNotFound { status: u16 },

    /// Transport-level failure (DNS, connect, timeout, broken body).
    #[error("Network error: {0}")]
    Network(String),

    /// Success status but the body did not have the expected shape.
    #[error("Invalid response from weather service: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::Network(err.to_string())
    }
}
