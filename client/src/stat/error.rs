use thiserror::Error;

/// Failures reported by the sign-in and GraphQL endpoints.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// The response decoded, but not into the records we expected.
    #[error("unexpected response: {0}")]
    DataShape(String),
}

impl GatewayError {
    pub fn is_auth(&self) -> bool {
        matches!(self, GatewayError::Auth(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::DataShape(e.to_string())
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::DataShape(e.to_string())
    }
}
