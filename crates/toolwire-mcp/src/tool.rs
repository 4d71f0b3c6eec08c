//! Wraps an MCP server tool as a `toolwire_types::Tool`.

use crate::client::{McpClient, ToolDescriptor};
use crate::schema::ParameterSchema;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use toolwire_types::{ToolContext, ToolDefinition, ToolError, ToolOutput};

/// A tool backed by an MCP server.
///
/// Holds the validated parameter contract and a shared handle to the owning
/// server's client, so executions always see the server's current session.
pub struct McpTool {
    server_name: String,
    name: String,
    description: String,
    parameters: ParameterSchema,
    client: Arc<McpClient>,
}

impl McpTool {
    /// Create a new MCP tool wrapper from an already translated schema.
    pub fn new(
        descriptor: ToolDescriptor,
        parameters: ParameterSchema,
        client: Arc<McpClient>,
    ) -> Self {
        Self {
            server_name: client.server_name().to_string(),
            name: descriptor.name,
            description: descriptor.description,
            parameters,
            client,
        }
    }

    /// The server this tool belongs to.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &ParameterSchema {
        &self.parameters
    }
}

impl toolwire_types::Tool for McpTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.parameters.to_json_schema(),
        }
    }

    fn execute(
        &self,
        input: serde_json::Value,
        ctx: ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send + '_>> {
        Box::pin(async move {
            let arguments = self.parameters.validate(&self.name, input)?;

            let result = self
                .client
                .call_tool(&self.name, arguments, &ctx.cancel)
                .await
                .map_err(|e| {
                    tracing::warn!(
                        "MCP tool '{}' on '{}' failed: {e}",
                        self.name,
                        self.server_name
                    );
                    ToolError::from(e)
                })?;

            Ok(normalize_result(result))
        })
    }
}

/// Flatten a `tools/call` result for the model.
///
/// A `content` array becomes its items' text joined by newlines; any other
/// `content` is returned as is; without `content` the whole result is returned.
pub fn normalize_result(result: serde_json::Value) -> ToolOutput {
    let is_error = result
        .get("isError")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    let content = match result.get("content") {
        Some(serde_json::Value::Array(items)) => Some(serde_json::Value::String(
            items.iter().map(item_text).collect::<Vec<_>>().join("\n"),
        )),
        Some(content) if !content.is_null() => Some(content.clone()),
        _ => None,
    };

    ToolOutput {
        content: content.unwrap_or(result),
        is_error,
    }
}

fn item_text(item: &serde_json::Value) -> String {
    if let Some(text) = item.get("text").and_then(serde_json::Value::as_str) {
        return text.to_string();
    }
    match item {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientInfo, McpServerConfig, McpTimeouts};
    use serde_json::json;
    use toolwire_types::Tool;

    fn sample_tool() -> McpTool {
        let descriptor = ToolDescriptor {
            name: "search".to_string(),
            description: "Search records".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        };
        let parameters = ParameterSchema::translate(&descriptor.input_schema).unwrap();
        // Nothing listens here; tests below never reach the network.
        let client = McpClient::new(
            McpServerConfig::http("records", "http://127.0.0.1:9/mcp"),
            reqwest::Client::new(),
            McpTimeouts::default(),
            ClientInfo::default(),
        )
        .unwrap();
        McpTool::new(descriptor, parameters, Arc::new(client))
    }

    #[test]
    fn normalize_joins_content_text() {
        let out = normalize_result(json!({"content": [{"text": "a"}, {"text": "b"}]}));
        assert_eq!(out.content, json!("a\nb"));
        assert!(!out.is_error);
    }

    #[test]
    fn normalize_scalar_content_verbatim() {
        let out = normalize_result(json!({"content": "c"}));
        assert_eq!(out.content, json!("c"));
    }

    #[test]
    fn normalize_without_content_returns_whole_result() {
        let out = normalize_result(json!({"foo": 1}));
        assert_eq!(out.content, json!({"foo": 1}));

        let out = normalize_result(serde_json::Value::Null);
        assert_eq!(out.content, serde_json::Value::Null);
    }

    #[test]
    fn normalize_mixed_items() {
        let out = normalize_result(json!({
            "content": [
                {"type": "text", "text": "first"},
                "second",
                {"type": "image", "data": "AAA"}
            ],
            "isError": true
        }));
        assert_eq!(
            out.content,
            json!("first\nsecond\n{\"type\":\"image\",\"data\":\"AAA\"}")
        );
        assert!(out.is_error);
    }

    #[test]
    fn definition_uses_translated_schema() {
        let tool = sample_tool();
        let def = tool.definition();
        assert_eq!(def.name, "search");
        assert_eq!(def.description, "Search records");
        assert_eq!(def.input_schema["required"], json!(["query"]));
        assert_eq!(tool.server_name(), "records");
    }

    #[tokio::test]
    async fn invalid_arguments_fail_before_any_request() {
        let tool = sample_tool();
        let result = tool
            .execute(json!({"query": 42}), ToolContext::default())
            .await;
        match result {
            Err(ToolError::InvalidArguments { tool, message }) => {
                assert_eq!(tool, "search");
                assert!(message.contains("'query'"));
            }
            other => panic!("Expected InvalidArguments, got {other:?}"),
        }
    }

    #[test]
    fn mcp_tool_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<McpTool>();
    }
}
