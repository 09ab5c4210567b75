//! Video generation against the Vertex AI Veo long-running endpoints.
//!
//! Generation is a two-step flow: `:predictLongRunning` starts the job and
//! returns an operation handle, `:fetchPredictOperation` reports its status.
//! The wait loop itself lives in `mediakit_common::operation`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use mediakit_common::auth::{scopes, Credentials};
use mediakit_common::config::Config;
use mediakit_common::error::{Error, FieldError};
use mediakit_common::media::SavedArtifact;
use mediakit_common::operation::{wait_for_operation, OperationStatus, PollConfig};
use mediakit_common::storage::{ObjectUri, StorageClient};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::catalog;

/// Model used when the request does not name one.
pub const DEFAULT_MODEL: &str = "veo-3.0-generate-preview";

/// Aspect ratio used when the request does not name one.
pub const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// Clip length used when the request does not name one.
pub const DEFAULT_DURATION_SECONDS: u8 = 8;

/// Fixed delay between status probes.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Total wait budget for one generation job.
pub const MAX_WAIT_SECS: u64 = 600;

/// Text-to-video parameters.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct VideoFromTextParams {
    /// Text prompt describing the video.
    pub prompt: String,

    /// Model ID or alias. Defaults to "veo-3.0-generate-preview".
    #[serde(default = "default_model")]
    pub model: String,

    /// Aspect ratio (16:9 or 9:16).
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,

    /// Clip length in seconds (4, 6, or 8).
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u8,

    /// `gs://` URI the API writes the video to (required by Veo).
    pub output_gcs_uri: String,

    /// Whether to generate an audio track (Veo 3 only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_audio: Option<bool>,

    /// Random seed for reproducible generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Also download the finished video to a local file.
    #[serde(default)]
    pub download_local: bool,

    /// Local path for the download; derived from the object name if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

/// Image-to-video parameters.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct VideoFromImageParams {
    /// Source image: base64 data, a local file path, or a `gs://` URI.
    pub image: String,

    /// Text prompt describing the desired motion.
    pub prompt: String,

    /// Model ID or alias. Defaults to "veo-3.0-generate-preview".
    #[serde(default = "default_model")]
    pub model: String,

    /// Aspect ratio (16:9 or 9:16).
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,

    /// Clip length in seconds (4, 6, or 8).
    #[serde(default = "default_duration_seconds")]
    pub duration_seconds: u8,

    /// `gs://` URI the API writes the video to (required by Veo).
    pub output_gcs_uri: String,

    /// Random seed for reproducible generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Also download the finished video to a local file.
    #[serde(default)]
    pub download_local: bool,

    /// Local path for the download; derived from the object name if unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_aspect_ratio() -> String {
    DEFAULT_ASPECT_RATIO.to_string()
}

fn default_duration_seconds() -> u8 {
    DEFAULT_DURATION_SECONDS
}

fn validate_common(
    errors: &mut Vec<FieldError>,
    model_name: &str,
    prompt: &str,
    aspect_ratio: &str,
    duration_seconds: u8,
    output_gcs_uri: &str,
) {
    let model = catalog::resolve(model_name);
    if model.is_none() {
        errors.push(FieldError::new(
            "model",
            format!("unknown model '{}'; known models: {}", model_name, catalog::known_ids()),
        ));
    }

    if prompt.trim().is_empty() {
        errors.push(FieldError::new("prompt", "prompt cannot be empty"));
    }

    if let Some(model) = model {
        if !model.aspect_ratios.contains(&aspect_ratio) {
            errors.push(FieldError::new(
                "aspect_ratio",
                format!(
                    "'{}' is not supported by {}; options: {}",
                    aspect_ratio,
                    model.id,
                    model.aspect_ratios.join(", ")
                ),
            ));
        }

        if !model.durations.contains(&duration_seconds) {
            let allowed: Vec<String> = model.durations.iter().map(u8::to_string).collect();
            errors.push(FieldError::new(
                "duration_seconds",
                format!("must be one of [{}] for {}, got {}", allowed.join(", "), model.id, duration_seconds),
            ));
        }
    }

    if !output_gcs_uri.starts_with("gs://") {
        errors.push(FieldError::new(
            "output_gcs_uri",
            format!("must start with 'gs://', got '{output_gcs_uri}'"),
        ));
    }
}

impl VideoFromTextParams {
    /// Validate against the resolved model's constraints.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        validate_common(
            &mut errors,
            &self.model,
            &self.prompt,
            &self.aspect_ratio,
            self.duration_seconds,
            &self.output_gcs_uri,
        );

        if self.generate_audio.is_some() {
            if let Some(model) = catalog::resolve(&self.model) {
                if !model.supports_audio {
                    errors.push(FieldError::new(
                        "generate_audio",
                        format!("{} cannot generate audio", model.id),
                    ));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl VideoFromImageParams {
    /// Validate against the resolved model's constraints.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        validate_common(
            &mut errors,
            &self.model,
            &self.prompt,
            &self.aspect_ratio,
            self.duration_seconds,
            &self.output_gcs_uri,
        );

        if self.image.trim().is_empty() {
            errors.push(FieldError::new("image", "image cannot be empty"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Result of a video generation job.
#[derive(Debug)]
pub struct VideoGenerateResult {
    /// `gs://` URI of the produced video.
    pub remote_uri: String,
    /// Local copy, when a download was requested.
    pub local: Option<SavedArtifact>,
}

/// Video generation handler.
pub struct VideoHandler {
    pub config: Config,
    pub http: reqwest::Client,
    pub creds: Credentials,
    pub storage: StorageClient,
    poll: PollConfig,
    endpoint_root: Option<String>,
}

impl VideoHandler {
    /// Handler over discovered Application Default Credentials.
    #[instrument(level = "debug", name = "video_handler_new", skip_all)]
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

    fn endpoint(&self, model: &str, verb: &str) -> String {
        match &self.endpoint_root {
            Some(root) => format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:{}",
                root, self.config.project_id, self.config.location, model, verb
            ),
            None => self.config.model_endpoint(model, verb),
        }
    }

    /// Generate a video from a text prompt.
    #[instrument(level = "info", name = "video_from_text", skip(self, params), fields(model = %params.model))]
    pub async fn generate_from_text(
        &self,
        params: VideoFromTextParams,
    ) -> Result<VideoGenerateResult, Error> {
        params.validate().map_err(Error::from_fields)?;

        let model = catalog::resolve(&params.model)
            .ok_or_else(|| Error::validation(format!("unknown model: {}", params.model)))?;

        let request = VeoRequest {
            instances: vec![VeoInstance {
                prompt: params.prompt.clone(),
                image: None,
            }],
            parameters: VeoParameters {
                aspect_ratio: Some(params.aspect_ratio.clone()),
                storage_uri: params.output_gcs_uri.clone(),
                duration_seconds: Some(params.duration_seconds),
                generate_audio: if model.supports_audio { params.generate_audio } else { None },
                seed: params.seed,
            },
        };

        info!(model_id = model.id, "starting text-to-video job");
        let outputs = self.run_job(model.id, &request).await?;
        self.finish(outputs, &params.output_gcs_uri, params.download_local, params.local_path.as_deref())
            .await
    }

    /// Generate a video animating a source image.
    #[instrument(level = "info", name = "video_from_image", skip(self, params), fields(model = %params.model))]
    pub async fn generate_from_image(
        &self,
        params: VideoFromImageParams,
    ) -> Result<VideoGenerateResult, Error> {
        params.validate().map_err(Error::from_fields)?;

        let model = catalog::resolve(&params.model)
            .ok_or_else(|| Error::validation(format!("unknown model: {}", params.model)))?;

        let image_data = self.resolve_image_input(&params.image).await?;

        let request = VeoRequest {
            instances: vec![VeoInstance {
                prompt: params.prompt.clone(),
                image: Some(VeoImage {
                    bytes_base64_encoded: image_data,
                }),
            }],
            parameters: VeoParameters {
                aspect_ratio: Some(params.aspect_ratio.clone()),
                storage_uri: params.output_gcs_uri.clone(),
                duration_seconds: Some(params.duration_seconds),
                generate_audio: None,
                seed: params.seed,
            },
        };

        info!(model_id = model.id, "starting image-to-video job");
        let outputs = self.run_job(model.id, &request).await?;
        self.finish(outputs, &params.output_gcs_uri, params.download_local, params.local_path.as_deref())
            .await
    }

    /// Start the long-running job and wait for its outputs.
    async fn run_job(&self, model: &str, request: &VeoRequest) -> Result<Vec<VideoArtifact>, Error> {
        let start_endpoint = self.endpoint(model, "predictLongRunning");
        let token = self.creds.bearer_token(&[scopes::CLOUD_PLATFORM]).await?;

        debug!(endpoint = %start_endpoint, "starting operation");
        let response = self
            .http
            .post(&start_endpoint)
            .bearer_auth(&token)
            .json(request)
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

        let status_endpoint = self.endpoint(model, "fetchPredictOperation");
        let operation_name = started.name.clone();

        wait_for_operation(&started.name, self.poll, || {
            self.probe_operation(&status_endpoint, &operation_name)
        })
        .await
    }

    /// One status probe against `fetchPredictOperation`.
    async fn probe_operation(
        &self,
        endpoint: &str,
        operation_name: &str,
    ) -> Result<OperationStatus<Vec<VideoArtifact>>, Error> {
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

        match parsed.response.and_then(|r| r.videos) {
            Some(videos) if !videos.is_empty() => Ok(OperationStatus::Done(videos)),
            _ => Ok(OperationStatus::Failed {
                code: None,
                message: "operation finished without a result payload".to_string(),
            }),
        }
    }

    /// Pick the produced video and optionally download it.
    async fn finish(
        &self,
        outputs: Vec<VideoArtifact>,
        requested_uri: &str,
        download_local: bool,
        local_path: Option<&str>,
    ) -> Result<VideoGenerateResult, Error> {
        let remote_uri = outputs
            .first()
            .and_then(|v| v.gcs_uri.clone())
            .unwrap_or_else(|| requested_uri.to_string());

        info!(uri = %remote_uri, "video ready");

        if !download_local {
            return Ok(VideoGenerateResult {
                remote_uri,
                local: None,
            });
        }

        let uri = ObjectUri::parse(&remote_uri)?;
        let target = match local_path {
            Some(path) => path.to_string(),
            None => format!("./{}", uri.file_name()),
        };

        let data = self.storage.download(&uri).await?;
        tokio::fs::write(&target, &data).await?;
        info!(path = %target, bytes = data.len(), "video downloaded");

        Ok(VideoGenerateResult {
            remote_uri,
            local: Some(SavedArtifact {
                location: target,
                size_bytes: data.len() as u64,
            }),
        })
    }

    /// Turn the `image` argument into base64 data: a `gs://` URI is
    /// downloaded, an existing local file is read, anything that decodes as
    /// base64 passes through.
    async fn resolve_image_input(&self, image: &str) -> Result<String, Error> {
        if image.starts_with("gs://") {
            let uri = ObjectUri::parse(image)?;
            let data = self.storage.download(&uri).await?;
            return Ok(BASE64.encode(&data));
        }

        let path = Path::new(image);
        if path.exists() {
            let data = tokio::fs::read(path).await?;
            return Ok(BASE64.encode(&data));
        }

        if BASE64.decode(image).is_ok() {
            return Ok(image.to_string());
        }

        Err(Error::validation(
            "image is neither a gs:// URI, an existing file, nor base64 data",
        ))
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Veo generation request. The same shape serves text-to-video and
/// image-to-video; the instance just gains an image.
#[derive(Debug, Serialize)]
pub struct VeoRequest {
    pub instances: Vec<VeoInstance>,
    pub parameters: VeoParameters,
}

#[derive(Debug, Serialize)]
pub struct VeoInstance {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<VeoImage>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VeoImage {
    pub bytes_base64_encoded: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VeoParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(rename = "storageUri")]
    pub storage_uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate_audio: Option<bool>,
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
    pub response: Option<VeoResult>,
}

#[derive(Debug, Deserialize)]
pub struct StatusError {
    pub code: Option<i32>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VeoResult {
    pub videos: Option<Vec<VideoArtifact>>,
}

/// One produced video.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoArtifact {
    pub gcs_uri: Option<String>,
    pub mime_type: Option<String>,
}
