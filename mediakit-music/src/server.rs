//! MCP server for music generation.
//!
//! Exposes the `music_generate` tool.

use crate::handler::{MusicGenerateParams, MusicGenerateResult, MusicHandler};
use mediakit_common::config::Config;
use mediakit_common::error::Error;
use rmcp::{
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo, Tool},
    ErrorData as McpError, ServerHandler,
};
use schemars::JsonSchema;
use serde::Deserialize;
use std::borrow::Cow;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// MCP server handler for music generation.
#[derive(Clone)]
pub struct MusicServer {
    /// Lazily constructed so listing tools needs no credentials.
    handler: Arc<RwLock<Option<MusicHandler>>>,
    config: Config,
}

/// Wire-level parameters of the `music_generate` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MusicGenerateToolParams {
    /// Text prompt describing the music
    pub prompt: String,
    /// What to avoid in the generated music
    #[serde(default)]
    pub negative_prompt: Option<String>,
    /// Number of samples to generate (1-4, default 1)
    #[serde(default)]
    pub sample_count: Option<u8>,
    /// Random seed for reproducibility
    #[serde(default)]
    pub seed: Option<i64>,
    /// Local path to save the WAV(s) to
    #[serde(default)]
    pub output_file: Option<String>,
    /// gs:// URI to upload the WAV(s) to
    #[serde(default)]
    pub output_gcs_uri: Option<String>,
}

impl From<MusicGenerateToolParams> for MusicGenerateParams {
    fn from(p: MusicGenerateToolParams) -> Self {
        Self {
            prompt: p.prompt,
            negative_prompt: p.negative_prompt,
            sample_count: p.sample_count.unwrap_or(crate::handler::DEFAULT_SAMPLE_COUNT),
            seed: p.seed,
            output_file: p.output_file,
            output_gcs_uri: p.output_gcs_uri,
        }
    }
}

/// The tools this server advertises. Pure so schemas are testable.
pub fn tool_definitions() -> Vec<Tool> {
    let schema = schemars::schema_for!(MusicGenerateToolParams);
    let schema_map = match serde_json::to_value(&schema) {
        Ok(serde_json::Value::Object(map)) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    };

    vec![Tool {
        name: Cow::Borrowed("music_generate"),
        description: Some(Cow::Borrowed(
            "Generate instrumental music from a text prompt using Vertex AI Lyria. \
             The job runs asynchronously; the call returns once the audio is ready, \
             as inline base64 WAV data or written to output_file / output_gcs_uri.",
        )),
        input_schema: schema_map,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }]
}

impl MusicServer {
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            config,
        }
    }

    async fn ensure_handler(&self) -> Result<(), Error> {
        let mut handler = self.handler.write().await;
        if handler.is_none() {
            *handler = Some(MusicHandler::new(self.config.clone()).await?);
        }
        Ok(())
    }

    /// Run the `music_generate` tool.
    pub async fn generate_music(
        &self,
        params: MusicGenerateToolParams,
    ) -> Result<CallToolResult, McpError> {
        info!(prompt = %params.prompt, "music_generate invoked");

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
            .map_err(|e| McpError::internal_error(format!("music generation failed: {e}"), None))?;

        Ok(CallToolResult::success(format_result(result)))
    }
}

fn format_result(result: MusicGenerateResult) -> Vec<Content> {
    match result {
        MusicGenerateResult::Inline(samples) => samples
            .into_iter()
            .map(|s| Content::text(format!("data:{};base64,{}", s.mime_type, s.data)))
            .collect(),
        MusicGenerateResult::Files(artifacts) => {
            let lines: Vec<String> = artifacts
                .iter()
                .map(|a| format!("{} ({} bytes)", a.location, a.size_bytes))
                .collect();
            vec![Content::text(format!("Audio saved to: {}", lines.join(", ")))]
        }
        MusicGenerateResult::Remote(artifacts) => {
            let lines: Vec<String> = artifacts
                .iter()
                .map(|a| format!("{} ({} bytes)", a.location, a.size_bytes))
                .collect();
            vec![Content::text(format!("Audio uploaded to: {}", lines.join(", ")))]
        }
    }
}

impl ServerHandler for MusicServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Music generation server backed by Vertex AI Lyria. \
                 Use music_generate to create instrumental music from a text prompt."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
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
                "music_generate" => {
                    let tool_params: MusicGenerateToolParams = params
                        .arguments
                        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
                        .transpose()
                        .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?
                        .ok_or_else(|| McpError::invalid_params("missing parameters", None))?;

                    self.generate_music(tool_params).await
                }
                _ => Err(McpError::invalid_params(format!("unknown tool: {}", params.name), None)),
            }
        }
    }
}
