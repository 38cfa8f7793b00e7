use thiserror::Error;

/// Failures surfaced by a weather fetch, each rendering as a single user-facing message.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("API key error (Unauthorized). Please check the api_key in your config file. (401)")]
    Unauthorized,

    #[error("City not found: {message} (404)")]
    NotFound { message: String },

    #[error("Server error: {status}, {message}")]
    Server { status: u16, message: String },

    #[error("Error: {0}")]
    Transport(reqwest::Error),

    #[error("Failed to parse weather response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Weather task failed: {0}")]
    Task(String),
}

// The request URL carries the API key, so it never travels with the error.
impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }
}

impl WeatherError {
    pub fn not_found(message: Option<String>) -> Self {
        Self::NotFound { message: message.unwrap_or_else(|| "Please check the spelling.".to_string()) }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }
}
