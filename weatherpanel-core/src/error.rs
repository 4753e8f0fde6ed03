/// Text shown in place of the location whenever a lookup fails.
pub const NOT_FOUND_PLACEHOLDER: &str = "No Location Found";

/// Failure of a weather lookup.
///
/// The variants exist for logging. Every one of them means the same thing to
/// a user: the location (or its data) was not found.
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("request to weather provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("weather provider returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed weather response: {0}")]
    Malformed(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        NOT_FOUND_PLACEHOLDER
    }
}

impl From<serde_json::Error> for WeatherError {
    fn from(err: serde_json::Error) -> Self {
        WeatherError::Malformed(err.to_string())
    }
}

/// Failure of the geolocation capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    Unavailable,
}

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("Enter a location to search for")]
    EmptyLocation,
}
