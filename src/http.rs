//! Minimal blocking HTTP/1.1 plumbing shared by the position and tool servers.
//!
//! One accept thread per server, a non-blocking listener polled every 50 ms,
//! and a shutdown flag. Handlers run on the accept thread, one request per
//! connection.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const ACCEPT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: "application/json",
                body,
            },
            Err(err) => {
                log::error!("failed to serialize response body: {}", err);
                Self::error(500, "internal_error")
            }
        }
    }

    /// Empty body, for requests that need no reply.
    pub fn accepted() -> Self {
        Self {
            status: 202,
            content_type: "application/json",
            body: Vec::new(),
        }
    }

    pub fn error(status: u16, code: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": code }))
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// Request shutdown and wait for the server thread.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        self.wait()
    }

    /// Block until the server thread exits.
    pub fn join(mut self) -> Result<()> {
        self.wait()
    }

    fn wait(&mut self) -> Result<()> {
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("http server thread panicked"))?;
        }
        Ok(())
    }
}

/// Request handler owned by a server thread.
pub trait HttpService: Send + 'static {
    fn handle(&mut self, request: &HttpRequest) -> HttpResponse;

    /// Runs once on the server thread after the accept loop exits.
    fn shutdown(&mut self) {}
}

struct FnService<H>(H);

impl<H> HttpService for FnService<H>
where
    H: FnMut(&HttpRequest) -> HttpResponse + Send + 'static,
{
    fn handle(&mut self, request: &HttpRequest) -> HttpResponse {
        (self.0)(request)
    }
}

/// Bind `addr` and serve requests with `handler` on a background thread.
pub fn spawn_server<H>(name: &'static str, addr: &str, handler: H) -> Result<ServerHandle>
where
    H: FnMut(&HttpRequest) -> HttpResponse + Send + 'static,
{
    spawn_service(name, addr, FnService(handler))
}

/// Bind `addr` and serve requests with `service` on a background thread.
///
/// `service.shutdown()` runs after the loop stops, whether it was stopped or failed.
pub fn spawn_service<S: HttpService>(
    name: &'static str,
    addr: &str,
    mut service: S,
) -> Result<ServerHandle> {
    let configured_addr: SocketAddr = addr
        .parse()
        .map_err(|e| anyhow!("invalid {} listen address '{}': {}", name, addr, e))?;
    let listener = TcpListener::bind(configured_addr)?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_thread = shutdown.clone();
    let join = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            if let Err(err) = run_server(name, listener, &mut service, &shutdown_thread) {
                log::error!("{} stopped: {}", name, err);
            }
            service.shutdown();
        })?;

    Ok(ServerHandle {
        addr,
        shutdown,
        join: Some(join),
    })
}

fn run_server<S: HttpService>(
    name: &str,
    listener: TcpListener,
    service: &mut S,
    shutdown: &AtomicBool,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, _)) => {
                if let Err(err) = handle_connection(stream, service) {
                    log::warn!("{} request rejected: {}", name, err);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL);
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection<S: HttpService>(mut stream: TcpStream, service: &mut S) -> Result<()> {
    stream.set_nonblocking(false)?;
    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            write_response(&mut stream, &HttpResponse::error(400, "bad_request"))?;
            return Err(err);
        }
    };
    log::debug!("{} {}", request.method, request.path);
    let response = service.handle(&request);
    write_response(&mut stream, &response)
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 1024];
    let mut data = Vec::new();
    let header_end = loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before end of headers"));
        }
        data.extend_from_slice(&buf[..n]);
        if data.len() > MAX_REQUEST_BYTES {
            return Err(anyhow!("request too large"));
        }
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let text = String::from_utf8_lossy(&data[..header_end]).into_owned();
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| anyhow!("invalid content-length '{}'", value))?,
        None => 0,
    };
    let total = header_end
        .checked_add(4)
        .and_then(|len| len.checked_add(content_length))
        .filter(|&len| len <= MAX_REQUEST_BYTES);
    if total.is_none() {
        return Err(anyhow!("request too large"));
    }
    let mut body = data[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before end of body"));
        }
        body.extend_from_slice(&buf[..n]);
    }
    body.truncate(content_length);

    let (path, query) = match raw_path.split_once('?') {
        Some((path, query)) => (
            path.to_string(),
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (raw_path.to_string(), Vec::new()),
    };

    Ok(HttpRequest {
        method: method.to_string(),
        path,
        query,
        body,
    })
}

fn write_response(stream: &mut TcpStream, response: &HttpResponse) -> Result<()> {
    let status_line = match response.status {
        200 => "HTTP/1.1 200 OK",
        202 => "HTTP/1.1 202 Accepted",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        content_type = response.content_type,
        len = response.body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(&response.body)?;
    Ok(())
}
