//! MCP server for speech synthesis.
//!
//! Exposes the `speech_synthesize` and `speech_list_voices` tools.

use crate::handler::{SpeechHandler, SpeechResult, SpeechSynthesizeParams};
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

/// MCP server handler for speech synthesis.
#[derive(Clone)]
pub struct SpeechServer {
    /// Lazily constructed so listing tools needs no credentials.
    handler: Arc<RwLock<Option<SpeechHandler>>>,
    config: Config,
}

/// Wire-level parameters of the `speech_synthesize` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SpeechSynthesizeToolParams {
    /// Text to synthesize
    pub text: String,
    /// Voice name (default: a Chirp3-HD voice)
    #[serde(default)]
    pub voice: Option<String>,
    /// Language code such as "en-US"
    #[serde(default)]
    pub language_code: Option<String>,
    /// Speaking rate (0.25-4.0, default 1.0)
    #[serde(default)]
    pub speaking_rate: Option<f32>,
    /// Pitch adjustment in semitones (-20.0 to 20.0, default 0.0)
    #[serde(default)]
    pub pitch: Option<f32>,
    /// Custom pronunciations applied via SSML
    #[serde(default)]
    pub pronunciations: Option<Vec<crate::handler::Pronunciation>>,
    /// Local path to save the WAV to
    #[serde(default)]
    pub output_file: Option<String>,
}

impl From<SpeechSynthesizeToolParams> for SpeechSynthesizeParams {
    fn from(p: SpeechSynthesizeToolParams) -> Self {
        Self {
            text: p.text,
            voice: p.voice,
            language_code: p
                .language_code
                .unwrap_or_else(|| crate::handler::DEFAULT_LANGUAGE_CODE.to_string()),
            speaking_rate: p.speaking_rate.unwrap_or(1.0),
            pitch: p.pitch.unwrap_or(0.0),
            pronunciations: p.pronunciations,
            output_file: p.output_file,
        }
    }
}

/// Wire-level parameters of the `speech_list_voices` tool.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListVoicesToolParams {
    /// Narrow the list to one language code, e.g. "en-US"
    #[serde(default)]
    pub language_code: Option<String>,
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
            name: Cow::Borrowed("speech_synthesize"),
            description: Some(Cow::Borrowed(
                "Synthesize speech from text using Google Cloud TTS Chirp3-HD voices. \
                 Returns inline base64 WAV data or writes it to output_file. \
                 Custom word pronunciations can be given in IPA or X-SAMPA.",
            )),
            input_schema: schema_map::<SpeechSynthesizeToolParams>(),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        },
        Tool {
            name: Cow::Borrowed("speech_list_voices"),
            description: Some(Cow::Borrowed(
                "List the available Chirp3-HD voices, optionally narrowed to a language code.",
            )),
            input_schema: schema_map::<ListVoicesToolParams>(),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        },
    ]
}

impl SpeechServer {
    pub fn new(config: Config) -> Self {
        Self {
            handler: Arc::new(RwLock::new(None)),
            config,
        }
    }

    async fn ensure_handler(&self) -> Result<(), Error> {
        let mut handler = self.handler.write().await;
        if handler.is_none() {
            *handler = Some(SpeechHandler::new(self.config.clone()).await?);
        }
        Ok(())
    }

    /// Run the `speech_synthesize` tool.
    pub async fn synthesize(
        &self,
        params: SpeechSynthesizeToolParams,
    ) -> Result<CallToolResult, McpError> {
        info!("speech_synthesize invoked");

        self.ensure_handler()
            .await
            .map_err(|e| McpError::internal_error(format!("handler init failed: {e}"), None))?;

        let guard = self.handler.read().await;
        let handler = guard
            .as_ref()
            .ok_or_else(|| McpError::internal_error("handler not initialized", None))?;

        let result = handler
            .synthesize(params.into())
            .await
            .map_err(|e| McpError::internal_error(format!("speech synthesis failed: {e}"), None))?;

        let content = match result {
            SpeechResult::Inline { data, mime_type } => {
                vec![Content::text(format!("data:{mime_type};base64,{data}"))]
            }
            SpeechResult::File(artifact) => vec![Content::text(format!(
                "Audio saved to: {} ({} bytes)",
                artifact.location, artifact.size_bytes
            ))],
        };

        Ok(CallToolResult::success(content))
    }

    /// Run the `speech_list_voices` tool.
    pub async fn list_voices(
        &self,
        params: ListVoicesToolParams,
    ) -> Result<CallToolResult, McpError> {
        info!("speech_list_voices invoked");

        self.ensure_handler()
            .await
            .map_err(|e| McpError::internal_error(format!("handler init failed: {e}"), None))?;

        let guard = self.handler.read().await;
        let handler = guard
            .as_ref()
            .ok_or_else(|| McpError::internal_error("handler not initialized", None))?;

        let voices = handler
            .list_voices(params.language_code.as_deref())
            .await
            .map_err(|e| McpError::internal_error(format!("voice listing failed: {e}"), None))?;

        let json = serde_json::to_string_pretty(&voices)
            .map_err(|e| McpError::internal_error(format!("serialization failed: {e}"), None))?;

        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}

impl ServerHandler for SpeechServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Speech synthesis server backed by Google Cloud TTS. \
                 Use speech_synthesize to turn text into audio and speech_list_voices \
                 to discover voices."
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
                "speech_synthesize" => {
                    let tool_params: SpeechSynthesizeToolParams = params
                        .arguments
                        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
                        .transpose()
                        .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?
                        .ok_or_else(|| McpError::invalid_params("missing parameters", None))?;

                    self.synthesize(tool_params).await
                }
                "speech_list_voices" => {
                    let tool_params: ListVoicesToolParams = params
                        .arguments
                        .map(|args| serde_json::from_value(serde_json::Value::Object(args)))
                        .transpose()
                        .map_err(|e| McpError::invalid_params(format!("invalid parameters: {e}"), None))?
                        .unwrap_or(ListVoicesToolParams { language_code: None });

                    self.list_voices(tool_params).await
                }
                _ => Err(McpError::invalid_params(format!("unknown tool: {}", params.name), None)),
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
    fn server_info_advertises_tools() {
        let info = SpeechServer::new(test_config()).get_info();
        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn both_tools_are_advertised_with_schemas() {
        let tools = tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert_eq!(names, vec!["speech_synthesize", "speech_list_voices"]);
        for tool in &tools {
            assert!(!tool.input_schema.is_empty());
        }
    }

    #[test]
    fn tool_params_defaults_applied_on_conversion() {
        let tool_params = SpeechSynthesizeToolParams {
            text: "hello".to_string(),
            voice: None,
            language_code: None,
            speaking_rate: None,
            pitch: None,
            pronunciations: None,
            output_file: None,
        };

        let params: SpeechSynthesizeParams = tool_params.into();
        assert_eq!(params.language_code, crate::handler::DEFAULT_LANGUAGE_CODE);
        assert_eq!(params.speaking_rate, 1.0);
        assert_eq!(params.pitch, 0.0);
    }
}
