//! MCP request handling shared by every transport binding.
//!
//! A transport hands each incoming message to `McpServer::handle_message`
//! and writes back whatever response comes out; `None` means the message
//! was a notification (or a client reply) and nothing is sent.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::render::{OutputFormat, format_output};
use crate::tools::ToolRouter;

use super::messages::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, ListToolsResult, RequestId,
};

/// Protocol front end over a tool router
#[derive(Clone)]
pub struct McpServer {
    router: Arc<dyn ToolRouter>,
    format: OutputFormat,
}

impl McpServer {
    pub fn new(router: Arc<dyn ToolRouter>) -> Self {
        Self {
            router,
            format: OutputFormat::default(),
        }
    }

    /// Set the output format used for `tools/call` content
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Handle one raw JSON line
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                warn!("Unparsable message: {}", e);
                Some(JsonRpcResponse::error(
                    None,
                    JsonRpcError::parse_error(format!("Parse error: {}", e)),
                ))
            }
        }
    }

    /// Handle one already-parsed JSON message
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let is_reply = value.get("method").is_none()
            && (value.get("result").is_some() || value.get("error").is_some());
        if is_reply {
            debug!("Ignoring client reply");
            return None;
        }

        let id = value
            .get("id")
            .cloned()
            .and_then(|id| serde_json::from_value::<RequestId>(id).ok());
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            )),
        }
    }

    /// Handle one request or notification
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!("Notification: {}", request.method);
            return None;
        }

        let id = request.id.clone();
        let result = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(serde_json::json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(request.params).await,
            other => {
                warn!("Unsupported method: {}", other);
                Err(JsonRpcError::method_not_found(other))
            }
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = parse_params(params)?;
        let result = InitializeResult::new(params);
        info!(
            "Session initialized (protocol {}, format {})",
            result.protocol_version, self.format
        );
        to_value(result)
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        to_value(ListToolsResult {
            tools: self.router.list_tools(),
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(params)?;
        let output = self.router.call_tool(&params.name, params.arguments).await;
        let text = format_output(&params.name, &output, self.format);
        to_value(CallToolResult::text(text, output.is_error()))
    }
}

/// Absent params read as `{}`
fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let value = match params {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(value) => value,
    };
    serde_json::from_value(value).map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(format!("Internal error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{BangumiClient, MockTransport, RawResponse};
    use crate::mcp::messages::ErrorCode;
    use crate::tools::Dispatcher;
    use reqwest::Method;
    use serde_json::json;

    fn server_with(mock: MockTransport) -> McpServer {
        let client = BangumiClient::new(Arc::new(mock));
        McpServer::new(Arc::new(Dispatcher::new(client).unwrap()))
    }

    async fn call(server: &McpServer, message: Value) -> Value {
        let response = server.handle_value(message).await.unwrap();
        serde_json::to_value(response).unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server_with(MockTransport::new());
        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"protocolVersion": "2024-11-05"}}),
        )
        .await;
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "Bangumi-MCP");
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let server = server_with(MockTransport::new());
        let response = server
            .handle_value(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_client_reply_ignored() {
        let server = server_with(MockTransport::new());
        let response = server.handle_value(json!({"jsonrpc": "2.0", "id": 4, "result": {}})).await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let server = server_with(MockTransport::new());
        let response = call(&server, json!({"jsonrpc": "2.0", "id": "p", "method": "ping"})).await;
        assert_eq!(response["id"], "p");
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_tools_list() {
        let server = server_with(MockTransport::new());
        let response = call(&server, json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"})).await;
        let tools = response["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 37);
        assert_eq!(tools[0]["name"], "get_current_time");
        assert!(tools[0]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn test_tools_call_structured() {
        let mock = MockTransport::new().with_response(
            Method::GET,
            "/v0/subjects/999999",
            RawResponse::json(404, &json!({"title": "Not Found", "description": "subject not found"})),
        );
        let server = server_with(mock);
        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                "params": {"name": "get_subject_info", "arguments": {"subject_id": 999999}}
            }),
        )
        .await;

        let result = &response["result"];
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        let payload: Value = serde_json::from_str(text).unwrap();
        assert_eq!(payload["title"], "Not Found");
    }

    #[tokio::test]
    async fn test_tools_call_text_format() {
        let server = server_with(MockTransport::new()).with_format(OutputFormat::Text);
        let response = call(
            &server,
            json!({
                "jsonrpc": "2.0", "id": 5, "method": "tools/call",
                "params": {"name": "get_subject_info", "arguments": {}}
            }),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["content"][0]["text"], "subject_id parameter is required\n");
    }

    #[tokio::test]
    async fn test_tools_call_bad_params() {
        let server = server_with(MockTransport::new());
        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 6, "method": "tools/call", "params": {"arguments": {}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], ErrorCode::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server_with(MockTransport::new());
        let response = call(&server, json!({"jsonrpc": "2.0", "id": 7, "method": "resources/list"})).await;
        assert_eq!(response["error"]["code"], ErrorCode::METHOD_NOT_FOUND);
        assert_eq!(response["id"], 7);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let server = server_with(MockTransport::new());
        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.id, None);
        assert_eq!(response.error.unwrap().code, ErrorCode::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_invalid_request_keeps_id() {
        let server = server_with(MockTransport::new());
        let response = call(&server, json!({"jsonrpc": "2.0", "id": 8, "method": 42})).await;
        assert_eq!(response["id"], 8);
        assert_eq!(response["error"]["code"], ErrorCode::INVALID_REQUEST);
    }
}
