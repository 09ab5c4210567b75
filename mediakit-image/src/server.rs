//! MCP server for image generation.
//!
//! Exposes the `image_generate` tool and an `image://models` resource.

use crate::handler::{ImageGenerateParams, ImageGenerateResult, ImageHandler};
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

/// MCP server handler for image generation.
#[derive(Clone)]
pub struct ImageServer {
    /// Lazily constructed so listing tools needs no credentials.
    handler: Arc<RwLock<Option<ImageHandler>>>,
    config: Config,
}

/// Wire-level parameters of the `image_generate` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ImageGenerateToolParams {
    /// Text prompt describing the image
    pub prompt: String,
    /// Model ID or alias (default: imagen-3.0-generate-002)
    #[serde(default)]
    pub model: Option<String>,
    /// Number of samples to generate (1-4, default 1)
    #[serde(default)]
    pub sample_count: Option<u8>,
    /// Aspect ratio (1:1, 3:4, 4:3, 9:16, 16:9; default 1:1)
    #[serde(default)]
    pub aspect_ratio: Option<String>,
    /// What to avoid in the generated images
    #[serde(default)]
    pub negative_prompt: Option<String>,
    /// Random seed for reproducibility
    #[serde(default)]
    pub seed: Option<i64>,
    /// Local path to save the image(s) to
    #[serde(default)]
    pub output_file: Option<String>,
    /// gs:// URI to upload the image(s) to
    #[serde(default)]
    pub output_gcs_uri: Option<String>,
}

impl From<ImageGenerateToolParams> for ImageGenerateParams {
    fn from(p: ImageGenerateToolParams) -> Self {
        Self {
            prompt: p.prompt,
            model: p.model.unwrap_or_else(|| crate::handler::DEFAULT_MODEL.to_string()),
            sample_count: p.sample_count.unwrap_or(crate::handler::DEFAULT_SAMPLE_COUNT),
            aspect_ratio: p
                .aspect_ratio
                .unwrap_or_else(|| crate::handler::DEFAULT_ASPECT_RATIO.to_string()),
            negative_prompt: p.negative_prompt,
            seed: p.seed,
            output_file: p.output_file,
            output_gcs_uri: p.output_gcs_uri,
        }
    }
}

/// The tools this server advertises. Pure so schemas are testable.
pub fn tool_definitions() -> Vec<Tool> {
    let schema = schemars::schema_for!(ImageGenerateToolParams);
    let schema_map = match serde_json::to_value(&schema) {
        Ok(serde_json::Value::Object(map)) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    };

    vec![Tool {
        name: Cow::Borrowed("image_generate"),
        description: Some(Cow::Borrowed(
            "Generate images from a text prompt using Vertex AI Imagen. \
             Returns inline base64 images, or writes them to output_file / output_gcs_uri.",
        )),
        input_schema: schema_map,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }]
}

impl ImageServer {
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            config,
        }
    }

    async fn ensure_handler(&self) -> Result<(), Error> {
        let mut handler = self.handler.write().await;
        if handler.is_none() {
            *handler = Some(ImageHandler::new(self.config.clone()).await?);
        }
        Ok(())
    }

    /// Run the `image_generate` tool.
    pub async fn generate_image(
        &self,
        params: ImageGenerateToolParams,
    ) -> Result<CallToolResult, McpError> {
        info!(prompt = %params.prompt, "image_generate invoked");

        self.ensure_handler()
            .await
            .map_err(|e| McpError::internal_error(format!("handler init failed: {e}"), None))?;

        let guard = self.handler.read().await;
        let handler = guard
            .as_ref()
            .ok_or_else(|| McpError::internal_error("handler not initialized", None))?;

        let result = handler
            .generate(params.into())
            .await
            .map_err(|e| McpError::internal_error(format!("image generation failed: {e}"), None))?;

        Ok(CallToolResult::success(format_result(result)))
    }
}

fn format_result(result: ImageGenerateResult) -> Vec<Content> {
    match result {
        ImageGenerateResult::Inline(images) => images
            .into_iter()
            .map(|img| Content::image(img.data, img.mime_type))
            .collect(),
        ImageGenerateResult::Files(artifacts) => {
            let lines: Vec<String> = artifacts
                .iter()
                .map(|a| format!("{} ({} bytes)", a.location, a.size_bytes))
                .collect();
            vec![Content::text(format!("Images saved to: {}", lines.join(", ")))]
        }
        ImageGenerateResult::Remote(artifacts) => {
            let lines: Vec<String> = artifacts
                .iter()
                .map(|a| format!("{} ({} bytes)", a.location, a.size_bytes))
                .collect();
            vec![Content::text(format!("Images uploaded to: {}", lines.join(", ")))]
        }
    }
}

impl ServerHandler for ImageServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Image generation server backed by Vertex AI Imagen. \
                 Use image_generate to create images from a text prompt."
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
            match params.name.as_ref() {
                "image_generate" => {
                    let tool_params: ImageGenerateToolParams = params
                        .arguments
                        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
                        .transpose()
                        .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?
                        .ok_or_else(|| McpError::invalid_params("missing parameters", None))?;

                    self.generate_image(tool_params).await
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
                    uri: "image://models".to_string(),
                    name: "Available Image Models".to_string(),
                    title: None,
                    description: Some("Imagen models this server can call".to_string()),
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
                "image://models" => Ok(ReadResourceResult {
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
        let info = ImageServer::new(test_config()).get_info();
        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }

    #[test]
    fn tool_definitions_carry_a_schema() {
        let tools = tool_definitions();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "image_generate");
        assert!(!tools[0].input_schema.is_empty());
    }

    #[test]
    fn tool_params_defaults_applied_on_conversion() {
        let tool_params = ImageGenerateToolParams {
            prompt: "a fox".to_string(),
            model: None,
            sample_count: None,
            aspect_ratio: None,
            negative_prompt: None,
            seed: None,
            output_file: None,
            output_gcs_uri: None,
        };

        let params: ImageGenerateParams = tool_params.into();
        assert_eq!(params.model, crate::handler::DEFAULT_MODEL);
        assert_eq!(params.sample_count, crate::handler::DEFAULT_SAMPLE_COUNT);
        assert_eq!(params.aspect_ratio, crate::handler::DEFAULT_ASPECT_RATIO);
    }

    #[test]
    fn tool_params_explicit_values_survive_conversion() {
        let tool_params = ImageGenerateToolParams {
            prompt: "a fox".to_string(),
            model: Some("imagen-4".to_string()),
            sample_count: Some(3),
            aspect_ratio: Some("16:9".to_string()),
            negative_prompt: Some("blurry".to_string()),
            seed: Some(7),
            output_file: Some("/tmp/fox.png".to_string()),
            output_gcs_uri: None,
        };

        let params: ImageGenerateParams = tool_params.into();
        assert_eq!(params.model, "imagen-4");
        assert_eq!(params.sample_count, 3);
        assert_eq!(params.aspect_ratio, "16:9");
        assert_eq!(params.negative_prompt.as_deref(), Some("blurry"));
        assert_eq!(params.seed, Some(7));
    }
}
