//! MCP server for local media processing.
//!
//! Exposes the ffmpeg/ffprobe operations and the sequential batch runner.

use crate::handler::{
    AvToolHandler, BatchParams, ConcatParams, ConvertAudioParams, MediaInfoParams, MuxParams,
    VideoToGifParams, VolumeAdjustParams,
};
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

/// MCP server handler for ffmpeg operations.
#[derive(Clone)]
pub struct AvToolServer {
    /// Lazily constructed so listing tools needs no credentials.
    handler: Arc<RwLock<Option<AvToolHandler>>>,
    config: Config,
}

/// Build one tool definition from a parameter type.
fn tool_for<T: JsonSchema>(name: &'static str, description: &'static str) -> Tool {
    let schema = schemars::schema_for!(T);
    let schema_map = match serde_json::to_value(&schema) {
        Ok(serde_json::Value::Object(map)) => Arc::new(map),
        _ => Arc::new(serde_json::Map::new()),
    };

    Tool {
        name: Cow::Borrowed(name),
        description: Some(Cow::Borrowed(description)),
        input_schema: schema_map,
        annotations: None,
        icons: None,
        meta: None,
        output_schema: None,
        title: None,
    }
}

/// The tools this server advertises. Pure so schemas are testable.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        tool_for::<MediaInfoParams>(
            "ffmpeg_media_info",
            "Inspect a media file with ffprobe: container format, duration, and streams. \
             Accepts a local path or a gs:// URI.",
        ),
        tool_for::<ConvertAudioParams>(
            "ffmpeg_convert_wav_to_mp3",
            "Convert a WAV file to MP3 at the given bitrate. \
             Inputs and outputs may be local paths or gs:// URIs.",
        ),
        tool_for::<VideoToGifParams>(
            "ffmpeg_video_to_gif",
            "Convert a video (or a trimmed section of it) to an animated GIF.",
        ),
        tool_for::<MuxParams>(
            "ffmpeg_mux_audio_video",
            "Combine a video stream and an audio stream into one file, \
             cutting to the shorter of the two.",
        ),
        tool_for::<ConcatParams>(
            "ffmpeg_concat_media",
            "Concatenate two or more media files in order into one output file.",
        ),
        tool_for::<VolumeAdjustParams>(
            "ffmpeg_adjust_volume",
            "Adjust audio volume by a multiplier (e.g. '0.5') or a dB offset (e.g. '-3dB').",
        ),
        tool_for::<BatchParams>(
            "ffmpeg_batch",
            "Run a list of ffmpeg operations strictly sequentially with a fixed pause \
             between items. A failing item is recorded and the batch continues; the \
             final report carries per-item outcomes and the success/failure counts.",
        ),
    ]
}

/// Parse tool arguments into a parameter type.
fn parse_params<T: for<'de> Deserialize<'de>>(
    arguments: Option<serde_json::Map<String, serde_json::Value>>,
) -> Result<T, McpError> {
    arguments
        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
        .transpose()
        .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?
        .ok_or_else(|| McpError::invalid_params("missing parameters", None))
}

impl AvToolServer {
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            config,
        }
    }

    async fn ensure_handler(&self) -> Result<(), Error> {
        let mut handler = self.handler.write().await;
        if handler.is_none() {
            *handler = Some(AvToolHandler::new(self.config.clone()).await?);
        }
        Ok(())
    }

    async fn dispatch(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<CallToolResult, McpError> {
        info!(tool = name, "avtool invoked");

        self.ensure_handler()
            .await
            .map_err(|e| McpError::internal_error(format!("handler init failed: {e}"), None))?;

        let guard = self.handler.read().await;
        let handler = guard
            .as_ref()
            .ok_or_else(|| McpError::internal_error("handler not initialized", None))?;

        let internal = |e: Error| McpError::internal_error(format!("operation failed: {e}"), None);

        let content = match name {
            "ffmpeg_media_info" => {
                let info = handler.media_info(parse_params(arguments)?).await.map_err(internal)?;
                let json = serde_json::to_string_pretty(&info)
                    .map_err(|e| McpError::internal_error(format!("serialization failed: {e}"), None))?;
                vec![Content::text(json)]
            }
            "ffmpeg_convert_wav_to_mp3" => {
                let output = handler.convert_audio(parse_params(arguments)?).await.map_err(internal)?;
                vec![Content::text(format!("Audio converted to: {output}"))]
            }
            "ffmpeg_video_to_gif" => {
                let output = handler.video_to_gif(parse_params(arguments)?).await.map_err(internal)?;
                vec![Content::text(format!("GIF written to: {output}"))]
            }
            "ffmpeg_mux_audio_video" => {
                let output = handler.mux(parse_params(arguments)?).await.map_err(internal)?;
                vec![Content::text(format!("Muxed file written to: {output}"))]
            }
            "ffmpeg_concat_media" => {
                let output = handler.concat(parse_params(arguments)?).await.map_err(internal)?;
                vec![Content::text(format!("Concatenated file written to: {output}"))]
            }
            "ffmpeg_adjust_volume" => {
                let output = handler.adjust_volume(parse_params(arguments)?).await.map_err(internal)?;
                vec![Content::text(format!("Adjusted audio written to: {output}"))]
            }
            "ffmpeg_batch" => {
                let report = handler.run_batch(parse_params(arguments)?).await;
                let json = serde_json::to_string_pretty(&report)
                    .map_err(|e| McpError::internal_error(format!("serialization failed: {e}"), None))?;
                vec![Content::text(json)]
            }
            other => return Err(McpError::invalid_params(format!("unknown tool: {other}"), None)),
        };

        Ok(CallToolResult::success(content))
    }
}

impl ServerHandler for AvToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Local media processing server driving ffmpeg and ffprobe. \
                 Operations accept local paths or gs:// URIs; ffmpeg_batch runs a list \
                 of operations sequentially and reports per-item outcomes."
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
        async move { self.dispatch(params.name.as_ref(), params.arguments).await }
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
    fn server_info_mentions_ffmpeg() {
        let info = AvToolServer::new(test_config()).get_info();
        assert!(info.instructions.unwrap().contains("ffmpeg"));
    }

    #[test]
    fn all_tools_are_advertised_with_schemas() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(
            names,
            vec![
                "ffmpeg_media_info",
                "ffmpeg_convert_wav_to_mp3",
                "ffmpeg_video_to_gif",
                "ffmpeg_mux_audio_video",
                "ffmpeg_concat_media",
                "ffmpeg_adjust_volume",
                "ffmpeg_batch",
            ]
        );
        for tool in &tools {
            assert!(!tool.input_schema.is_empty());
            assert!(tool.description.is_some());
        }
    }

    #[test]
    fn parse_params_reads_valid_arguments() {
        let mut args = serde_json::Map::new();
        args.insert("input".to_string(), serde_json::Value::String("clip.mp4".to_string()));

        let params: MediaInfoParams = parse_params(Some(args)).unwrap();
        assert_eq!(params.input, "clip.mp4");
    }

    #[test]
    fn parse_params_rejects_missing_arguments() {
        let result: Result<MediaInfoParams, _> = parse_params(None);
        assert!(result.is_err());
    }
}
