//! Tool schema checks across every server crate.

use serde_json::Value;

/// A tool's input schema must be a JSON Schema object with object-typed
/// parameters.
fn check_schema(schema: &Value) -> Result<(), String> {
    let obj = schema.as_object().ok_or("schema must be a JSON object")?;

    if let Some(type_val) = obj.get("type") {
        if type_val != "object" {
            return Err(format!("expected type 'object', got {type_val}"));
        }
    }

    if let Some(properties) = obj.get("properties") {
        if !properties.is_object() {
            return Err("properties must be an object".to_string());
        }
    }

    Ok(())
}

fn check_tool(tool: &rmcp::model::Tool) -> Result<(), String> {
    if tool.name.is_empty() {
        return Err("tool name is empty".to_string());
    }

    match tool.description.as_deref() {
        None => return Err(format!("tool '{}' has no description", tool.name)),
        Some("") => return Err(format!("tool '{}' has an empty description", tool.name)),
        Some(_) => {}
    }

    if tool.input_schema.is_empty() {
        return Err(format!("tool '{}' has no input schema", tool.name));
    }

    let schema_value = serde_json::to_value(&*tool.input_schema)
        .map_err(|e| format!("tool '{}' schema does not serialize: {e}", tool.name))?;
    check_schema(&schema_value).map_err(|e| format!("tool '{}': {e}", tool.name))
}

/// Every tool definition in the workspace.
fn all_tools() -> Vec<rmcp::model::Tool> {
    let mut tools = Vec::new();
    tools.extend(mediakit_image::server::tool_definitions());
    tools.extend(mediakit_video::server::tool_definitions());
    tools.extend(mediakit_music::server::tool_definitions());
    tools.extend(mediakit_speech::server::tool_definitions());
    tools.extend(mediakit_avtool::server::tool_definitions());
    tools
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_tool_passes_the_schema_checks() {
        for tool in all_tools() {
            check_tool(&tool).unwrap();
        }
    }

    #[test]
    fn tool_names_are_unique_across_the_suite() {
        let mut seen = HashSet::new();
        for tool in all_tools() {
            assert!(seen.insert(tool.name.to_string()), "duplicate tool name: {}", tool.name);
        }
    }

    #[test]
    fn required_fields_appear_in_schemas() {
        let tools = all_tools();

        let image = tools.iter().find(|t| t.name == "image_generate").unwrap();
        let schema = serde_json::to_value(&*image.input_schema).unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        assert!(required.contains(&"prompt"));

        let video = tools.iter().find(|t| t.name == "video_generate").unwrap();
        let schema = serde_json::to_value(&*video.input_schema).unwrap();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        assert!(required.contains(&"prompt"));
        assert!(required.contains(&"output_gcs_uri"));
    }

    #[test]
    fn schema_check_rejects_malformed_schemas() {
        assert!(check_schema(&serde_json::json!([1, 2, 3])).is_err());
        assert!(check_schema(&serde_json::json!({"type": "array"})).is_err());
        assert!(check_schema(&serde_json::json!({
            "type": "object",
            "properties": {"prompt": {"type": "string"}}
        }))
        .is_ok());
    }
}
