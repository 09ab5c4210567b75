//! Environment-backed configuration.

use crate::error::ConfigError;

/// Runtime configuration shared by all MediaKit servers.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google Cloud project ID (required)
    pub project_id: String,
    /// Region the Vertex AI endpoints live in
    pub location: String,
    /// Default bucket for media artifacts
    pub media_bucket: Option<String>,
    /// Port for the HTTP transport
    pub port: u16,
}

impl Config {
    /// Load configuration from the environment, reading a `.env` file first
    /// if one is present.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if `PROJECT_ID` is not set and
    /// `ConfigError::InvalidValue` if `PORT` does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let project_id = std::env::var("PROJECT_ID")
            .map_err(|_| ConfigError::MissingEnvVar("PROJECT_ID".to_string()))?;

        let location = std::env::var("LOCATION").unwrap_or_else(|_| "us-central1".to_string());
        let media_bucket = std::env::var("MEDIA_BUCKET").ok();

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string(), raw))?,
            Err(_) => 8080,
        };

        Ok(Self {
            project_id,
            location,
            media_bucket,
            port,
        })
    }

    /// URL of a Vertex AI publisher-model verb, e.g.
    /// `model_endpoint("veo-2.0-generate-001", "predictLongRunning")`.
    pub fn model_endpoint(&self, model: &str, verb: &str) -> String {
        format!(
            "https://{}-aiplatform.googleapis.com/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
            self.location, self.project_id, self.location, model, verb
        )
    }
}
