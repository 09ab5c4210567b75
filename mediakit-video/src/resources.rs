//! Static MCP resources exposed by the video server.

use crate::catalog;

/// JSON document listing the model catalog.
pub fn models_json() -> String {
    serde_json::to_string_pretty(catalog::MODELS).unwrap_or_else(|_| "[]".to_string())
}
