use anyhow::Result;

use super::rpc::{RpcDispatcher, ServerInfo};
use super::ToolRegistry;
use crate::http::{spawn_service, HttpRequest, HttpResponse, HttpService, ServerHandle};

pub const DEFAULT_TOOLS_ADDR: &str = "0.0.0.0:8000";

#[derive(Clone, Debug)]
pub struct ToolServerConfig {
    pub addr: String,
    pub info: ServerInfo,
}

impl Default for ToolServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_TOOLS_ADDR.to_string(),
            info: ServerInfo::default(),
        }
    }
}

/// HTTP binding of the tool dispatcher.
///
/// Routes:
/// - `POST /mcp` → one JSON-RPC message; notifications get `202` and no body
/// - `GET /health`
///
/// Tools are shut down on the server thread once the server stops.
pub struct ToolServer {
    cfg: ToolServerConfig,
    registry: ToolRegistry,
}

impl ToolServer {
    pub fn new(cfg: ToolServerConfig, registry: ToolRegistry) -> Self {
        Self { cfg, registry }
    }

    pub fn spawn(self) -> Result<ServerHandle> {
        log::info!(
            "{} {} serving tools: {}",
            self.cfg.info.name,
            self.cfg.info.version,
            self.registry.names().join(", ")
        );
        let service = ToolService {
            dispatcher: RpcDispatcher::new(self.cfg.info, self.registry),
        };
        spawn_service("tool server", &self.cfg.addr, service)
    }
}

struct ToolService {
    dispatcher: RpcDispatcher,
}

impl HttpService for ToolService {
    fn handle(&mut self, request: &HttpRequest) -> HttpResponse {
        route(&mut self.dispatcher, request)
    }

    fn shutdown(&mut self) {
        log::info!("shutting down tools");
        self.dispatcher.shutdown();
    }
}

fn route(dispatcher: &mut RpcDispatcher, request: &HttpRequest) -> HttpResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/mcp") => match dispatcher.handle(&request.body) {
            Some(response) => HttpResponse::json(200, &response),
            None => HttpResponse::accepted(),
        },
        (_, "/mcp") => HttpResponse::error(405, "method_not_allowed"),
        ("GET", "/health") => HttpResponse::json(200, &serde_json::json!({ "status": "ok" })),
        (_, "/health") => HttpResponse::error(405, "method_not_allowed"),
        _ => HttpResponse::error(404, "not_found"),
    }
}
