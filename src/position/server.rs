use anyhow::Result;
use serde::Serialize;

use super::catalog::PositionCatalog;
use crate::http::{spawn_server, HttpRequest, HttpResponse, ServerHandle};

pub const DEFAULT_POSITION_ADDR: &str = "0.0.0.0:5000";

#[derive(Clone, Debug)]
pub struct PositionConfig {
    pub addr: String,
    pub catalog: PositionCatalog,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_POSITION_ADDR.to_string(),
            catalog: PositionCatalog::default(),
        }
    }
}

#[derive(Serialize)]
struct PositionBody<'a> {
    position: &'a str,
}

#[derive(Serialize)]
struct InstructionsBody<'a> {
    position: Option<&'a str>,
    instructions: &'a str,
}

#[derive(Serialize)]
struct CatalogBody<'a> {
    positions: &'a [String],
}

/// HTTP server for target positions.
///
/// Routes:
/// - `GET /get_position` → a random catalog entry
/// - `GET /get_instructions[?position=<name>]` → hold instructions
/// - `GET /positions` → the full catalog
/// - `GET /health`
pub struct PositionServer {
    cfg: PositionConfig,
}

impl PositionServer {
    pub fn new(cfg: PositionConfig) -> Self {
        Self { cfg }
    }

    pub fn spawn(self) -> Result<ServerHandle> {
        let catalog = self.cfg.catalog;
        spawn_server("position server", &self.cfg.addr, move |request| {
            route(&catalog, request)
        })
    }
}

fn route(catalog: &PositionCatalog, request: &HttpRequest) -> HttpResponse {
    if request.method != "GET" {
        return HttpResponse::error(405, "method_not_allowed");
    }
    match request.path.as_str() {
        "/health" => HttpResponse::json(200, &serde_json::json!({ "status": "ok" })),
        "/get_position" => {
            let position = catalog.choose(&mut rand::thread_rng());
            log::info!("serving target position: {}", position);
            HttpResponse::json(200, &PositionBody { position })
        }
        "/get_instructions" => match request.query_param("position") {
            Some(position) if !catalog.contains(position) => {
                HttpResponse::error(404, "unknown_position")
            }
            position => HttpResponse::json(
                200,
                &InstructionsBody {
                    position,
                    instructions: catalog.instructions(),
                },
            ),
        },
        "/positions" => HttpResponse::json(
            200,
            &CatalogBody {
                positions: catalog.positions(),
            },
        ),
        _ => HttpResponse::error(404, "not_found"),
    }
}
