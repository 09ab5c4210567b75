//! Music generation against the Vertex AI Lyria long-running endpoints.
//!
//! Lyria uses the same start/poll shape as Veo: `:predictLongRunning`
//! returns an operation handle, `:fetchPredictOperation` reports status and,
//! on completion, carries base64 audio predictions. The wait loop lives in
//! `mediakit_common::operation`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use mediakit_common::auth::{scopes, Credentials};
use mediakit_common::config::Config;
use mediakit_common::error::{Error, FieldError};
use mediakit_common::media::{numbered_variant, SavedArtifact};
use mediakit_common::operation::{wait_for_operation, OperationStatus, PollConfig};
use mediakit_common::storage::{ObjectUri, StorageClient};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::catalog;

/// Model used for every request.
pub const MODEL: &str = "lyria-002";

/// Samples generated when the request does not ask for more.
pub const DEFAULT_SAMPLE_COUNT: u8 = 1;

/// Fixed delay between status probes.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Total wait budget for one generation job.
pub const MAX_WAIT_SECS: u64 = 300;

/// Music generation parameters.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct MusicGenerateParams {
    /// Text prompt describing the music.
    pub prompt: String,

    /// What to avoid in the generated music.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,

    /// Number of samples to generate (1-4).
    #[serde(default = "default_sample_count")]
    pub sample_count: u8,

    /// Random seed for reproducible generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Local path to save the WAV(s) to. Multi-sample outputs get a numbered
    /// suffix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,

    /// `gs://` URI to upload the WAV(s) to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_gcs_uri: Option<String>,
}

fn default_sample_count() -> u8 {
    DEFAULT_SAMPLE_COUNT
}

impl MusicGenerateParams {
    /// Validate, accumulating every field failure.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        let model = catalog::LYRIA;

        if self.prompt.trim().is_empty() {
            errors.push(FieldError::new("prompt", "prompt cannot be empty"));
        }

        if self.sample_count < 1 || self.sample_count > model.max_samples {
            errors.push(FieldError::new(
                "sample_count",
                format!("must be between 1 and {}, got {}", model.max_samples, self.sample_count),
            ));
        }

        if let Some(ref uri) = self.output_gcs_uri {
            if !uri.starts_with("gs://") {
                errors.push(FieldError::new(
                    "output_gcs_uri",
                    format!("must start with 'gs://', got '{uri}'"),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// One generated audio sample as inline data.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedAudio {
    /// Base64-encoded WAV bytes
    pub data: String,
    /// MIME type reported by the API
    pub mime_type: String,
}

/// Where the generated audio ended up.
#[derive(Debug)]
pub enum MusicGenerateResult {
    /// Inline base64 payloads (no output location was requested)
    Inline(Vec<GeneratedAudio>),
    /// Written to local files
    Files(Vec<SavedArtifact>),
    /// Uploaded to Cloud Storage
    Remote(Vec<SavedArtifact>),
}

/// Music generation handler.
pub struct MusicHandler {
    pub config: Config,
    pub http: reqwest::Client,
    pub creds: Credentials,
    pub storage: StorageClient,
    poll: PollConfig,
    endpoint_root: Option<String>,
}

impl MusicHandler {
    /// Handler over discovered Application Default Credentials.
    #[instrument(level = "debug", name = "music_handler_new", skip_all)]
    pub async fn new(config: Config) -> Result<Self, Error> {
        let creds = Credentials::discover().await?;
        let storage = StorageClient::new(Credentials::discover().await?);

        Ok(Self {
            config,
            http: reqwest::Client::new(),
            creds,
            storage,
            poll: PollConfig {
                interval: Duration::from_secs(POLL_INTERVAL_SECS),
                max_wait: Duration::from_secs(MAX_WAIT_SECS),
            },
            endpoint_root: None,
        })
    }

    #[cfg(test)]
    fn with_deps(
        config: Config,
        creds: Credentials,
        storage: StorageClient,
        poll: PollConfig,
        endpoint_root: Option<String>,
    ) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            creds,
            storage,
            poll,
            endpoint_root,
        }
    }

    fn endpoint(&self, verb: &str) -> String {
        match &self.endpoint_root {
            Some(root) => format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
                root, self.config.project_id, self.config.location, MODEL, verb
            ),
            None => self.config.model_endpoint(MODEL, verb),
        }
    }

    /// Generate music from a text prompt.
    #[instrument(level = "info", name = "generate_music", skip(self, params))]
    pub async fn generate(&self, params: MusicGenerateParams) -> Result<MusicGenerateResult, Error> {
        params.validate().map_err(Error::from_fields)?;

        info!(samples = params.sample_count, "starting music generation job");

        let request = LyriaRequest {
            instances: vec![LyriaInstance {
                prompt: params.prompt.clone(),
                negative_prompt: params.negative_prompt.clone(),
            }],
            parameters: LyriaParameters {
                sample_count: params.sample_count,
                seed: params.seed,
            },
        };

        let start_endpoint = self.endpoint("predictLongRunning");
        let token = self.creds.bearer_token(&[scopes::CLOUD_PLATFORM]).await?;

        debug!(endpoint = %start_endpoint, "starting operation");
        let response = self
            .http
            .post(&start_endpoint)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&start_endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http(&start_endpoint, status.as_u16(), body));
        }

        let started: StartResponse = response.json().await.map_err(|e| {
            Error::http(&start_endpoint, status.as_u16(), format!("unparseable body: {e}"))
        })?;

        info!(operation = %started.name, "operation started");

        let status_endpoint = self.endpoint("fetchPredictOperation");
        let operation_name = started.name.clone();

        let samples = wait_for_operation(&started.name, self.poll, || {
            self.probe_operation(&status_endpoint, &operation_name)
        })
        .await?;

        info!(count = samples.len(), "received audio samples");
        self.route_output(samples, &params).await
    }

    /// One status probe against `fetchPredictOperation`.
    async fn probe_operation(
        &self,
        endpoint: &str,
        operation_name: &str,
    ) -> Result<OperationStatus<Vec<GeneratedAudio>>, Error> {
        let token = self.creds.bearer_token(&[scopes::CLOUD_PLATFORM]).await?;

        let response = self
            .http
            .post(endpoint)
            .bearer_auth(&token)
            .json(&FetchOperationRequest {
                operation_name: operation_name.to_string(),
            })
            .send()
            .await
            .map_err(|e| Error::from_reqwest(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http(endpoint, status.as_u16(), body));
        }

        let parsed: OperationStatusResponse = response
            .json()
            .await
            .map_err(|e| Error::http(endpoint, status.as_u16(), format!("unparseable status: {e}")))?;

        if !parsed.done.unwrap_or(false) {
            return Ok(OperationStatus::Running);
        }

        if let Some(error) = parsed.error {
            return Ok(OperationStatus::Failed {
                code: error.code,
                message: error.message.unwrap_or_else(|| "unknown error".to_string()),
            });
        }

        let samples: Vec<GeneratedAudio> = parsed
            .response
            .map(|r| r.predictions)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| {
                p.bytes_base64_encoded.map(|data| GeneratedAudio {
                    data,
                    mime_type: p.mime_type.unwrap_or_else(|| "audio/wav".to_string()),
                })
            })
            .collect();

        if samples.is_empty() {
            return Ok(OperationStatus::Failed {
                code: None,
                message: "operation finished without audio samples".to_string(),
            });
        }

        Ok(OperationStatus::Done(samples))
    }

    async fn route_output(
        &self,
        samples: Vec<GeneratedAudio>,
        params: &MusicGenerateParams,
    ) -> Result<MusicGenerateResult, Error> {
        if let Some(ref uri) = params.output_gcs_uri {
            return self.upload_all(samples, uri).await.map(MusicGenerateResult::Remote);
        }
        if let Some(ref path) = params.output_file {
            return self.save_all(samples, path).await.map(MusicGenerateResult::Files);
        }
        Ok(MusicGenerateResult::Inline(samples))
    }

    async fn upload_all(
        &self,
        samples: Vec<GeneratedAudio>,
        target: &str,
    ) -> Result<Vec<SavedArtifact>, Error> {
        let mut artifacts = Vec::with_capacity(samples.len());

        for (i, sample) in samples.iter().enumerate() {
            let data = BASE64
                .decode(&sample.data)
                .map_err(|e| Error::validation(format!("API returned invalid base64: {e}")))?;

            let uri_str = if samples.len() == 1 {
                target.to_string()
            } else {
                numbered_variant(target, i)
            };

            let uri = ObjectUri::parse(&uri_str)?;
            self.storage.upload(&uri, &data, &sample.mime_type).await?;
            artifacts.push(SavedArtifact {
                location: uri_str,
                size_bytes: data.len() as u64,
            });
        }

        info!(count = artifacts.len(), "uploaded audio samples");
        Ok(artifacts)
    }

    async fn save_all(
        &self,
        samples: Vec<GeneratedAudio>,
        target: &str,
    ) -> Result<Vec<SavedArtifact>, Error> {
        let mut artifacts = Vec::with_capacity(samples.len());

        for (i, sample) in samples.iter().enumerate() {
            let data = BASE64
                .decode(&sample.data)
                .map_err(|e| Error::validation(format!("API returned invalid base64: {e}")))?;

            let path = if samples.len() == 1 {
                target.to_string()
            } else {
                numbered_variant(target, i)
            };

            if let Some(parent) = Path::new(&path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }

            tokio::fs::write(&path, &data).await?;
            artifacts.push(SavedArtifact {
                location: path,
                size_bytes: data.len() as u64,
            });
        }

        info!(count = artifacts.len(), "saved audio samples");
        Ok(artifacts)
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Lyria generation request.
#[derive(Debug, Serialize)]
pub struct LyriaRequest {
    pub instances: Vec<LyriaInstance>,
    pub parameters: LyriaParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyriaInstance {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LyriaParameters {
    pub sample_count: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Response of `:predictLongRunning`.
#[derive(Debug, Deserialize)]
pub struct StartResponse {
    /// Operation handle to poll with
    pub name: String,
}

/// Request body of `:fetchPredictOperation`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOperationRequest {
    pub operation_name: String,
}

/// Response of `:fetchPredictOperation`.
#[derive(Debug, Deserialize)]
pub struct OperationStatusResponse {
    pub done: Option<bool>,
    pub error: Option<StatusError>,
    pub response: Option<LyriaResult>,
}

#[derive(Debug, Deserialize)]
pub struct StatusError {
    pub code: Option<i32>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LyriaResult {
    #[serde(default)]
    pub predictions: Vec<LyriaPrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyriaPrediction {
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
}
