//! MCP server for video generation.
//!
//! Exposes the `video_generate` and `video_from_image` tools and a
//! `video://models` resource.

use crate::handler::{
    VideoFromImageParams, VideoFromTextParams, VideoGenerateResult, VideoHandler,
};
use crate::resources;
use mediakit_common::config::Config;
use mediakit_common::error::Error;
use rmcp::{
    model::{
        CallToolResult, Content, ListResourcesResult, ReadResourceResult, ResourceContents,
        ServerCapabilities, ServerInfo, Tool,
    },
    ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// MCP server handler for video generation.
#[derive(Clone)]
pub struct VideoServer {
    /// Lazily constructed so listing tools needs no credentials.
    handler: Arc<RwLock<Option<VideoHandler>>>,
    config: Config,
}

/// Wire-level parameters of the `video_generate` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct VideoGenerateToolParams {
    /// Text prompt describing the video
    pub prompt: String,
    /// Model ID or alias (default: veo-3.0-generate-preview)
    #[serde(default)]
    pub model: Option<String>,
    /// Aspect ratio (16:9 or 9:16, default 16:9)
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    /// Clip length in seconds (4, 6, or 8; default 8)
    #[serde(default)]
    pub duration_seconds: Option<u8>,
    /// gs:// URI the video is written to (required)
    pub output_gcs_uri: String,
    /// Generate an audio track (Veo 3 only)
    #[serde(default)]
    pub generate_audio: Option<bool>,
    /// Random seed for reproducibility
    #[serde(default)]
    pub seed: Option<i64>,
    /// Also download the finished video locally
    #[serde(default)]
    pub download_local: Option<bool>,
    /// Local path for the download
    #[serde(default)]
    pub local_path: Option<String>,
}

impl From<VideoGenerateToolParams> for VideoFromTextParams {
    fn from(p: VideoGenerateToolParams) -> Self {
        Self {
            prompt: p.prompt,
            model: p.model.unwrap_or_else(|| crate::handler::DEFAULT_MODEL.to_string()),
            aspect_ratio: p
                .aspect_ratio
                .unwrap_or_else(|| crate::handler::DEFAULT_ASPECT_RATIO.to_string()),
            duration_seconds: p
                .duration_seconds
                .unwrap_or(crate::handler::DEFAULT_DURATION_SECONDS),
            output_gcs_uri: p.output_gcs_uri,
            generate_audio: p.generate_audio,
            seed: p.seed,
            download_local: p.download_local.unwrap_or(false),
            local_path: p.local_path,
        }
    }
}

/// Wire-level parameters of the `video_from_image` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct VideoFromImageToolParams {
    /// Source image: base64 data, a local file path, or a gs:// URI
    pub image: String,
    /// Text prompt describing the desired motion
    pub prompt: String,
    /// Model ID or alias (default: veo-3.0-generate-preview)
    #[serde(default)]
    pub model: Option<String>,
    /// Aspect ratio (16:9 or 9:16, default 16:9)
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    /// Clip length in seconds (4, 6, or 8; default 8)
    #[serde(default)]
    pub duration_seconds: Option<u8>,
    /// gs:// URI the video is written to (required)
    pub output_gcs_uri: String,
    /// Random seed for reproducibility
    #[serde(default)]
    pub seed: Option<i64>,
    /// Also download the finished video locally
    #[serde(default)]
    pub download_local: Option<bool>,
    /// Local path for the download
    #[serde(default)]
    pub local_path: Option<String>,
}

impl From<VideoFromImageToolParams> for VideoFromImageParams {
    fn from(p: VideoFromImageToolParams) -> Self {
        Self {
            image: p.image,
            prompt: p.prompt,
            model: p.model.unwrap_or_else(|| crate::handler::DEFAULT_MODEL.to_string()),
            aspect_ratio: p
                .aspect_ratio
                .unwrap_or_else(|| crate::handler::DEFAULT_ASPECT_RATIO.to_string()),
            duration_seconds: p
                .duration_seconds
                .unwrap_or(crate::handler::DEFAULT_DURATION_SECONDS),
            output_gcs_uri: p.output_gcs_uri,
            seed: p.seed,
            download_local: p.download_local.unwrap_or(false),
            local_path: p.local_path,
        }
    }
}

/// The tools this server advertises. Pure so schemas are testable.
pub fn tool_definitions() -> Vec<Tool> {
    fn schema_map<T: JsonSchema>() -> Arc<serde_json::Map<String, serde_json::Value>> {
        match serde_json::to_value(schemars::schema_for!(T)) {
            Ok(serde_json::Value::Object(map)) => Arc::new(map),
            _ => Arc::new(serde_json::Map::new()),
        }
    }

    vec![
        Tool {
            name: Cow::Borrowed("video_generate"),
            description: Some(Cow::Borrowed(
                "Generate a video from a text prompt using Vertex AI Veo. \
                 The job runs asynchronously; the call returns once the video has been \
                 written to output_gcs_uri.",
            )),
            input_schema: schema_map::<VideoGenerateToolParams>(),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        },
        Tool {
            name: Cow::Borrowed("video_from_image"),
            description: Some(Cow::Borrowed(
                "Animate a source image into a video using Vertex AI Veo. \
                 Accepts base64 data, a local file path, or a gs:// URI as the image. \
                 Returns the gs:// URI of the generated video.",
            )),
            input_schema: schema_map::<VideoFromImageToolParams>(),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        },
    ]
}

impl VideoServer {
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            config,
        }
    }

    async fn ensure_handler(&self) -> Result<(), Error> {
        let mut handler = self.handler.write().await;
        if handler.is_none() {
            *handler = Some(VideoHandler::new(self.config.clone()).await?);
        }
        Ok(())
    }

    /// Run the `video_generate` tool.
    pub async fn generate_video(
        &self,
        params: VideoGenerateToolParams,
    ) -> Result<CallToolResult, McpError> {
        info!(prompt = %params.prompt, "video_generate invoked");

        self.ensure_handler()
            .await
            .map_err(|e| McpError::internal_error(format!("handler init failed: {e}"), None))?;

        let guard = self.handler.read().await;
        let handler = guard
            .as_ref()
            .ok_or_else(|| McpError::internal_error("handler not initialized", None))?;

        let result = handler
            .generate_from_text(params.into())
            .await
            .map_err(|e| McpError::internal_error(format!("video generation failed: {e}"), None))?;

        Ok(CallToolResult::success(format_result(&result)))
    }

    /// Run the `video_from_image` tool.
    pub async fn generate_video_from_image(
        &self,
        params: VideoFromImageToolParams,
    ) -> Result<CallToolResult, McpError> {
        info!(prompt = %params.prompt, "video_from_image invoked");

        self.ensure_handler()
            .await
            .map_err(|e| McpError::internal_error(format!("handler init failed: {e}"), None))?;

        let guard = self.handler.read().await;
        let handler = guard
            .as_ref()
            .ok_or_else(|| McpError::internal_error("handler not initialized", None))?;

        let result = handler
            .generate_from_image(params.into())
            .await
            .map_err(|e| McpError::internal_error(format!("video generation failed: {e}"), None))?;

        Ok(CallToolResult::success(format_result(&result)))
    }
}

fn format_result(result: &VideoGenerateResult) -> Vec<Content> {
    let mut message = format!("Video generated: {}", result.remote_uri);
    if let Some(local) = &result.local {
        message.push_str(&format!(
            "\nDownloaded to: {} ({} bytes)",
            local.location, local.size_bytes
        ));
    }
    vec![Content::text(message)]
}

impl ServerHandler for VideoServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Video generation server backed by Vertex AI Veo. \
                 Use video_generate for text-to-video and video_from_image to animate an image."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<rmcp::model::ListToolsResult, McpError>> + Send + '_
    {
        async move {
            Ok(rmcp::model::ListToolsResult {
                tools: tool_definitions(),
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn call_tool(
        &self,
        params: rmcp::model::CallToolRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let arguments = params
                .arguments
                .map(serde_json::Value::Object)
                .ok_or_else(|| McpError::invalid_params("missing parameters", None))?;

            match params.name.as_ref() {
                "video_generate" => {
                    let tool_params: VideoGenerateToolParams = serde_json::from_value(arguments)
                        .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?;
                    self.generate_video(tool_params).await
                }
                "video_from_image" => {
                    let tool_params: VideoFromImageToolParams = serde_json::from_value(arguments)
                        .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?;
                    self.generate_video_from_image(tool_params).await
                }
                _ => Err(McpError::invalid_params(format!("unknown tool: {}", params.name), None)),
            }
        }
    }

    fn list_resources(
        &self,
        _params: Option<rmcp::model::PaginatedRequestParam>,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListResourcesResult, McpError>> + Send + '_ {
        async move {
            let models = rmcp::model::Resource {
                raw: rmcp::model::RawResource {
                    uri: "video://models".to_string(),
                    name: "Available Video Models".to_string(),
                    title: None,
                    description: Some("Veo models this server can call".to_string()),
                    mime_type: Some("application/json".to_string()),
                    size: None,
                    icons: None,
                    meta: None,
                },
                annotations: None,
            };

            Ok(ListResourcesResult {
                resources: vec![models],
                next_cursor: None,
                meta: None,
            })
        }
    }

    fn read_resource(
        &self,
        params: rmcp::model::ReadResourceRequestParam,
        _context: rmcp::service::RequestContext<rmcp::service::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            debug!(uri = %params.uri, "reading resource");
            match params.uri.as_str() {
                "video://models" => Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(resources::models_json(), params.uri.clone())],
                }),
                other => Err(McpError::resource_not_found(format!("unknown resource: {other}"), None)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            project_id: "demo-project".to_string(),
            location: "us-central1".to_string(),
            media_bucket: None,
            port: 8080,
        }
    }

    #[test]
    fn server_info_advertises_tools_and_resources() {
        let info = VideoServer::new(test_config()).get_info();
        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn both_tools_are_advertised_with_schemas() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names, vec!["video_generate", "video_from_image"]);
        for tool in &tools {
            assert!(!tool.input_schema.is_empty());
            assert!(tool.description.is_some());
        }
    }

    #[test]
    fn t2v_tool_params_defaults_applied_on_conversion() {
        let tool_params = VideoGenerateToolParams {
            prompt: "a sailboat".to_string(),
            model: None,
            aspect_ratio: None,
            duration_seconds: None,
            output_gcs_uri: "gs://media/out.mp4".to_string(),
            generate_audio: None,
            seed: None,
            download_local: None,
            local_path: None,
        };

        let params: VideoFromTextParams = tool_params.into();
        assert_eq!(params.model, crate::handler::DEFAULT_MODEL);
        assert_eq!(params.aspect_ratio, crate::handler::DEFAULT_ASPECT_RATIO);
        assert_eq!(params.duration_seconds, crate::handler::DEFAULT_DURATION_SECONDS);
        assert!(!params.download_local);
    }

    #[test]
    fn i2v_tool_params_explicit_values_survive_conversion() {
        let tool_params = VideoFromImageToolParams {
            image: "base64data".to_string(),
            prompt: "make it move".to_string(),
            model: Some("veo-2".to_string()),
            aspect_ratio: Some("9:16".to_string()),
            duration_seconds: Some(6),
            output_gcs_uri: "gs://media/out.mp4".to_string(),
            seed: Some(11),
            download_local: Some(true),
            local_path: Some("/tmp/out.mp4".to_string()),
        };

        let params: VideoFromImageParams = tool_params.into();
        assert_eq!(params.model, "veo-2");
        assert_eq!(params.aspect_ratio, "9:16");
        assert_eq!(params.duration_seconds, 6);
        assert!(params.download_local);
        assert_eq!(params.local_path.as_deref(), Some("/tmp/out.mp4"));
    }
}
