//! Tool server for assistant clients.
//!
//! Tools are registered in a `ToolRegistry` and invoked over JSON-RPC 2.0
//! (`tools/list`, `tools/call`). The `rubik://info` resource describes the
//! server and lists the registered tools.

pub mod builtin;
mod registry;
mod rpc;
mod server;

use serde_json::Value;
use thiserror::Error;

pub use builtin::{SoftwareInfoTool, TalkToYogi, YogaPoseEstimation};
pub use registry::ToolRegistry;
pub use rpc::{RpcDispatcher, ServerInfo, RUBIK_INFO_URI};
pub use server::{ToolServer, ToolServerConfig, DEFAULT_TOOLS_ADDR};

/// Failure of a single tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The caller sent arguments the tool cannot accept.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The tool ran and failed.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// A callable tool.
pub trait Tool: Send {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the `arguments` object.
    fn input_schema(&self) -> Value;

    fn call(&mut self, arguments: &Value) -> Result<Value, ToolError>;

    /// Release held resources. Called once when the server stops.
    fn shutdown(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Read a required string argument.
pub(crate) fn string_argument<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{}' must be a string", key)))
}

fn empty_object_schema() -> Value {
    serde_json::json!({ "type": "object", "properties": {} })
}
