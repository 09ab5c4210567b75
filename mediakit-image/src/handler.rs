//! Image generation against the Vertex AI Imagen `:predict` endpoint.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use mediakit_common::auth::{scopes, Credentials};
use mediakit_common::config::Config;
use mediakit_common::error::{Error, FieldError};
use mediakit_common::media::{content_type_for, numbered_variant, SavedArtifact};
use mediakit_common::storage::{ObjectUri, StorageClient};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::catalog;

/// Model used when the request does not name one.
pub const DEFAULT_MODEL: &str = "imagen-3.0-generate-002";

/// Aspect ratio used when the request does not name one.
pub const DEFAULT_ASPECT_RATIO: &str = "1:1";

/// Samples generated when the request does not ask for more.
pub const DEFAULT_SAMPLE_COUNT: u8 = 1;

/// Image generation parameters.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ImageGenerateParams {
    /// Text prompt describing the image.
    pub prompt: String,

    /// Model ID or alias. Defaults to "imagen-3.0-generate-002".
    #[serde(default = "default_model")]
    pub model: String,

    /// Number of samples to generate (1-4).
    #[serde(default = "default_sample_count")]
    pub sample_count: u8,

    /// Aspect ratio for the generated images.
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,

    /// What to avoid in the generated images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,

    /// Random seed for reproducible generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Local path to save the image(s) to. Multi-sample outputs get a
    /// numbered suffix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,

    /// `gs://` URI to upload the image(s) to. Takes precedence over
    /// `output_file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_gcs_uri: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_sample_count() -> u8 {
    DEFAULT_SAMPLE_COUNT
}

fn default_aspect_ratio() -> String {
    DEFAULT_ASPECT_RATIO.to_string()
}

impl ImageGenerateParams {
    /// Validate against the resolved model's constraints, accumulating every
    /// field failure.
    pub fn validate(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();

        let model = catalog::resolve(&self.model);
        if model.is_none() {
            errors.push(FieldError::new(
                "model",
                format!("unknown model '{}'; known models: {}", self.model, catalog::known_ids()),
            ));
        }

        if self.prompt.trim().is_empty() {
            errors.push(FieldError::new("prompt", "prompt cannot be empty"));
        }

        if let Some(model) = model {
            if self.prompt.len() > model.max_prompt_length {
                errors.push(FieldError::new(
                    "prompt",
                    format!(
                        "prompt is {} characters, {} allows at most {}",
                        self.prompt.len(),
                        model.id,
                        model.max_prompt_length
                    ),
                ));
            }

            if !model.aspect_ratios.contains(&self.aspect_ratio.as_str()) {
                errors.push(FieldError::new(
                    "aspect_ratio",
                    format!(
                        "'{}' is not supported by {}; options: {}",
                        self.aspect_ratio,
                        model.id,
                        model.aspect_ratios.join(", ")
                    ),
                ));
            }

            if self.sample_count < 1 || self.sample_count > model.max_samples {
                errors.push(FieldError::new(
                    "sample_count",
                    format!("must be between 1 and {}, got {}", model.max_samples, self.sample_count),
                ));
            }
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

/// One generated image as inline data.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type reported by the API
    pub mime_type: String,
}

/// Where the generated images ended up.
#[derive(Debug)]
pub enum ImageGenerateResult {
    /// Inline base64 payloads (no output location was requested)
    Inline(Vec<GeneratedImage>),
    /// Written to local files
    Files(Vec<SavedArtifact>),
    /// Uploaded to Cloud Storage
    Remote(Vec<SavedArtifact>),
}

/// Image generation handler.
pub struct ImageHandler {
    pub config: Config,
    pub http: reqwest::Client,
    pub creds: Credentials,
    pub storage: StorageClient,
    endpoint_root: Option<String>,
}

impl ImageHandler {
    /// Handler over discovered Application Default Credentials.
    #[instrument(level = "debug", name = "image_handler_new", skip_all)]
    pub async fn new(config: Config) -> Result<Self, Error> {
        let creds = Credentials::discover().await?;
        let storage = StorageClient::new(Credentials::discover().await?);

        Ok(Self {
            config,
            http: reqwest::Client::new(),
            creds,
            storage,
            endpoint_root: None,
        })
    }

    #[cfg(test)]
    fn with_deps(
        config: Config,
        creds: Credentials,
        storage: StorageClient,
        endpoint_root: Option<String>,
    ) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            creds,
            storage,
            endpoint_root,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        match &self.endpoint_root {
            Some(root) => format!(
                "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
                root, self.config.project_id, self.config.location, model
            ),
            None => self.config.model_endpoint(model, "predict"),
        }
    }

    /// Generate images from a text prompt.
    #[instrument(level = "info", name = "generate_image", skip(self, params), fields(model = %params.model))]
    pub async fn generate(&self, params: ImageGenerateParams) -> Result<ImageGenerateResult, Error> {
        params.validate().map_err(Error::from_fields)?;

        let model = catalog::resolve(&params.model)
            .ok_or_else(|| Error::validation(format!("unknown model: {}", params.model)))?;

        info!(model_id = model.id, samples = params.sample_count, "calling Imagen");

        let request = ImagenRequest {
            instances: vec![ImagenInstance {
                prompt: params.prompt.clone(),
            }],
            parameters: ImagenParameters {
                sample_count: params.sample_count,
                aspect_ratio: params.aspect_ratio.clone(),
                negative_prompt: params.negative_prompt.clone(),
                seed: params.seed,
            },
        };

        let endpoint = self.endpoint(model.id);
        let token = self.creds.bearer_token(&[scopes::CLOUD_PLATFORM]).await?;

        debug!(endpoint = %endpoint, "posting predict request");
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&token)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http(&endpoint, status.as_u16(), body));
        }

        let api_response: ImagenResponse = response
            .json()
            .await
            .map_err(|e| Error::http(&endpoint, status.as_u16(), format!("unparseable body: {e}")))?;

        let images: Vec<GeneratedImage> = api_response
            .predictions
            .into_iter()
            .filter_map(|p| {
                p.bytes_base64_encoded.map(|data| GeneratedImage {
                    data,
                    mime_type: p.mime_type.unwrap_or_else(|| "image/png".to_string()),
                })
            })
            .collect();

        if images.is_empty() {
            return Err(Error::http(&endpoint, status.as_u16(), "response contained no image payloads"));
        }

        info!(count = images.len(), "received images");
        self.route_output(images, &params).await
    }

    async fn route_output(
        &self,
        images: Vec<GeneratedImage>,
        params: &ImageGenerateParams,
    ) -> Result<ImageGenerateResult, Error> {
        if let Some(ref uri) = params.output_gcs_uri {
            return self.upload_all(images, uri).await.map(ImageGenerateResult::Remote);
        }
        if let Some(ref path) = params.output_file {
            return self.save_all(images, path).await.map(ImageGenerateResult::Files);
        }
        Ok(ImageGenerateResult::Inline(images))
    }

    async fn upload_all(
        &self,
        images: Vec<GeneratedImage>,
        target: &str,
    ) -> Result<Vec<SavedArtifact>, Error> {
        let mut artifacts = Vec::with_capacity(images.len());

        for (i, image) in images.iter().enumerate() {
            let data = BASE64
                .decode(&image.data)
                .map_err(|e| Error::validation(format!("API returned invalid base64: {e}")))?;

            let uri_str = if images.len() == 1 {
                target.to_string()
            } else {
                numbered_variant(target, i)
            };

            let uri = ObjectUri::parse(&uri_str)?;
            self.storage.upload(&uri, &data, &image.mime_type).await?;
            artifacts.push(SavedArtifact {
                location: uri_str,
                size_bytes: data.len() as u64,
            });
        }

        info!(count = artifacts.len(), "uploaded images");
        Ok(artifacts)
    }

    async fn save_all(
        &self,
        images: Vec<GeneratedImage>,
        target: &str,
    ) -> Result<Vec<SavedArtifact>, Error> {
        let mut artifacts = Vec::with_capacity(images.len());

        for (i, image) in images.iter().enumerate() {
            let data = BASE64
                .decode(&image.data)
                .map_err(|e| Error::validation(format!("API returned invalid base64: {e}")))?;

            let path = if images.len() == 1 {
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
            debug!(path = %path, mime = %content_type_for(Path::new(&path)), "wrote image");
            artifacts.push(SavedArtifact {
                location: path,
                size_bytes: data.len() as u64,
            });
        }

        info!(count = artifacts.len(), "saved images");
        Ok(artifacts)
    }
}

// =============================================================================
// Wire types
// =============================================================================

/// Imagen predict request.
#[derive(Debug, Serialize)]
pub struct ImagenRequest {
    pub instances: Vec<ImagenInstance>,
    pub parameters: ImagenParameters,
}

#[derive(Debug, Serialize)]
pub struct ImagenInstance {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagenParameters {
    pub sample_count: u8,
    pub aspect_ratio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
}

/// Imagen predict response.
#[derive(Debug, Deserialize)]
pub struct ImagenResponse {
    #[serde(default)]
    pub predictions: Vec<ImagenPrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagenPrediction {
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
}
