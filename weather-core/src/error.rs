use reqwest::StatusCode;
use thiserror::Error;

/// Failures surfaced by weather lookups.
///
/// None of these are retried internally; each outbound call is attempted once.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// Geocoding returned no match for the requested city.
    #[error("City '{city}' not found. Check the spelling or add a country code.")]
    NotFound { city: String },

    /// The provider answered with a non-success status.
    #[error("Weather provider responded with status {status}: {body}")]
    Upstream { status: StatusCode, body: String },

    /// The provider could not be reached (DNS, refused connection, timeout).
    #[error("Could not reach the weather provider: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl WeatherError {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Status returned by the provider, if the failure came from one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            WeatherError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, WeatherError::NotFound { .. })
    }
}

/// Cap provider error bodies so a full HTML error page does not end up in a message.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
