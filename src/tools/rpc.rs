//! JSON-RPC 2.0 dispatch for the tool server.

use serde::Serialize;
use serde_json::{json, Value};

use super::{ToolError, ToolRegistry};

pub const RUBIK_INFO_URI: &str = "rubik://info";

const PROTOCOL_VERSION: &str = "2024-11-05";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

/// Identity reported by `initialize` and the `rubik://info` resource.
#[derive(Clone, Debug)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "Rubik MCP Server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "MCP server for a yoga coach running on a Rubik board.".to_string(),
        }
    }
}

#[derive(Serialize)]
struct RubikInfo<'a> {
    server_name: &'a str,
    version: &'a str,
    description: &'a str,
    capabilities: Vec<&'static str>,
}

struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Routes JSON-RPC messages to registered tools and resources.
pub struct RpcDispatcher {
    info: ServerInfo,
    registry: ToolRegistry,
}

impl RpcDispatcher {
    pub fn new(info: ServerInfo, registry: ToolRegistry) -> Self {
        Self { info, registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Shut the registered tools down.
    pub fn shutdown(&mut self) {
        self.registry.shutdown();
    }

    /// Handle one raw message. Notifications produce no response.
    pub fn handle(&mut self, body: &[u8]) -> Option<Value> {
        let message: Value = match serde_json::from_slice(body) {
            Ok(message) => message,
            Err(err) => {
                return Some(error_response(
                    Value::Null,
                    RpcError::new(PARSE_ERROR, format!("parse error: {}", err)),
                ))
            }
        };
        self.handle_message(message)
    }

    pub fn handle_message(&mut self, message: Value) -> Option<Value> {
        let id = message.get("id").cloned();
        let method = match validate_envelope(&message) {
            Ok(method) => method,
            Err(err) => return Some(error_response(id.unwrap_or(Value::Null), err)),
        };
        let params = message.get("params").cloned().unwrap_or(Value::Null);

        let Some(id) = id else {
            log::debug!("notification: {}", method);
            return None;
        };
        log::info!("rpc request: {}", method);
        let response = match self.dispatch(method, &params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(err) => error_response(id, err),
        };
        Some(response)
    }

    fn dispatch(&mut self, method: &str, params: &Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.list_tools()),
            "tools/call" => self.call_tool(params),
            "resources/list" => Ok(self.list_resources()),
            "resources/read" => self.read_resource(params),
            other => Err(RpcError::new(
                METHOD_NOT_FOUND,
                format!("method not found: {}", other),
            )),
        }
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": { "name": self.info.name, "version": self.info.version },
            "capabilities": { "tools": {}, "resources": {} }
        })
    }

    fn list_tools(&self) -> Value {
        let tools: Vec<Value> = self
            .registry
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "inputSchema": tool.input_schema(),
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    fn call_tool(&mut self, params: &Value) -> Result<Value, RpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, "tools/call requires a tool name"))?;
        let arguments = match params.get("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(arguments @ Value::Object(_)) => arguments.clone(),
            Some(_) => {
                return Err(RpcError::new(
                    INVALID_PARAMS,
                    "tool arguments must be an object",
                ))
            }
        };
        let tool = self
            .registry
            .get_mut(name)
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, format!("unknown tool: {}", name)))?;

        match tool.call(&arguments) {
            Ok(output) => Ok(tool_result(output_text(&output), false)),
            Err(ToolError::InvalidArguments(msg)) => Err(RpcError::new(
                INVALID_PARAMS,
                format!("{}: invalid arguments: {}", name, msg),
            )),
            Err(ToolError::Failed(err)) => {
                log::warn!("tool {} failed: {:#}", name, err);
                Ok(tool_result(format!("{:#}", err), true))
            }
        }
    }

    fn list_resources(&self) -> Value {
        json!({
            "resources": [{
                "uri": RUBIK_INFO_URI,
                "name": "rubik_info",
                "description": "Basic information about this server.",
                "mimeType": "application/json"
            }]
        })
    }

    fn read_resource(&self, params: &Value) -> Result<Value, RpcError> {
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::new(INVALID_PARAMS, "resources/read requires a uri"))?;
        if uri != RUBIK_INFO_URI {
            return Err(RpcError::new(
                INVALID_PARAMS,
                format!("unknown resource: {}", uri),
            ));
        }
        let info = RubikInfo {
            server_name: &self.info.name,
            version: &self.info.version,
            description: &self.info.description,
            capabilities: self.registry.names(),
        };
        let text = serde_json::to_string(&info)
            .map_err(|err| RpcError::new(INTERNAL_ERROR, err.to_string()))?;
        Ok(json!({
            "contents": [{ "uri": RUBIK_INFO_URI, "mimeType": "application/json", "text": text }]
        }))
    }
}

fn validate_envelope(message: &Value) -> Result<&str, RpcError> {
    let object = message
        .as_object()
        .ok_or_else(|| RpcError::new(INVALID_REQUEST, "request must be a JSON object"))?;
    if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(RpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\""));
    }
    match object.get("id") {
        None | Some(Value::Null) | Some(Value::String(_)) | Some(Value::Number(_)) => {}
        Some(_) => return Err(RpcError::new(INVALID_REQUEST, "id must be a string or number")),
    }
    object
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| RpcError::new(INVALID_REQUEST, "method must be a string"))
}

// Strings go out verbatim; everything else as compact JSON.
fn output_text(output: &Value) -> String {
    match output {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}

fn error_response(id: Value, err: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": err.code, "message": err.message }
    })
}
