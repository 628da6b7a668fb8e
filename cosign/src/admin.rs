// Copyright (c) 2024 Botho Foundation

//! Administrative JSON-RPC API.
//!
//! A small JSON-RPC 2.0 endpoint over HTTP for managing cluster membership
//! from an operator tool. It listens on loopback by default. When the
//! registry holds a cluster key, every call must present it in the
//! `X-Cluster-Key` header.
//!
//! Methods:
//! - `cluster_listPeers`
//! - `cluster_addPeer {peer}`
//! - `cluster_getKey`
//! - `cluster_setKey {key}`
//! - `node_setLocation {location}`
//! - `node_getIdentity`

use anyhow::Result;
use cosign_common::PeerIdentity;
use cosign_gossip::SharedRegistry;
use http_body_util::{BodyExt, Full};
use hyper::{
    body::Bytes, server::conn::http1, service::service_fn, Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr};
use tokio::{net::TcpListener, select, sync::watch, task::JoinHandle};
use tracing::{debug, error, info, warn};

/// Header carrying the cluster key.
pub const CLUSTER_KEY_HEADER: &str = "X-Cluster-Key";

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
/// Missing or wrong cluster key.
pub const UNAUTHORIZED: i32 = -32001;

/// Settings for the admin endpoint.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Whether to serve the API at all.
    pub enabled: bool,

    /// Address to listen on.
    pub listen_addr: SocketAddr,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 7302)),
        }
    }
}

/// JSON-RPC request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

/// JSON-RPC response
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

/// JSON-RPC error
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_string(),
            }),
            id,
        }
    }
}

/// A bound admin endpoint.
pub struct AdminServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    registry: SharedRegistry,
}

impl AdminServer {
    /// Bind the endpoint.
    pub async fn bind(addr: SocketAddr, registry: SharedRegistry) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            registry,
        })
    }

    /// Address the endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve on a background task until the handle is shut down or dropped.
    pub fn spawn(self) -> AdminHandle {
        let local_addr = self.local_addr;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        AdminHandle {
            local_addr,
            shutdown_tx,
            task,
        }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("Admin API listening on {}", self.local_addr);

        loop {
            let (stream, _) = select! {
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "Failed to accept admin connection");
                        continue;
                    }
                },
                _ = shutdown.changed() => break,
            };

            let io = TokioIo::new(stream);
            let registry = self.registry.clone();
            tokio::spawn(async move {
                let service = service_fn(|req| handle_request(req, registry.clone()));
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving admin connection: {:?}", err);
                }
            });
        }
    }
}

/// Handle to a running admin endpoint.
pub struct AdminHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AdminHandle {
    /// Address the endpoint is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Admin task ended abnormally");
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    registry: SharedRegistry,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.method() != Method::POST {
        return Ok(plain_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed",
        ));
    }

    let presented_key = req
        .headers()
        .get(CLUSTER_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string);

    let body_bytes = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            error!("Failed to read request body: {}", e);
            return Ok(plain_response(StatusCode::BAD_REQUEST, "Failed to read body"));
        }
    };

    let rpc_request: JsonRpcRequest = match serde_json::from_slice(&body_bytes) {
        Ok(req) => req,
        Err(e) => {
            debug!("Failed to parse JSON-RPC request: {}", e);
            return Ok(json_response(JsonRpcResponse::error(
                Value::Null,
                PARSE_ERROR,
                "Parse error",
            )));
        }
    };

    debug!(method = %rpc_request.method, "Admin request");

    let response = if authorized(&registry, presented_key.as_deref()) {
        handle_rpc_method(&rpc_request, &registry)
    } else {
        warn!(method = %rpc_request.method, "Rejected admin call with bad cluster key");
        JsonRpcResponse::error(rpc_request.id.clone(), UNAUTHORIZED, "Unauthorized")
    };

    Ok(json_response(response))
}

/// Check the presented key against the registry's cluster key.
pub fn authorized(registry: &SharedRegistry, presented: Option<&str>) -> bool {
    match registry.cluster_key() {
        None => true,
        Some(expected) => presented
            .map(|key| constant_time_eq(key.as_bytes(), expected.as_bytes()))
            .unwrap_or(false),
    }
}

/// Dispatch one JSON-RPC call.
pub fn handle_rpc_method(request: &JsonRpcRequest, registry: &SharedRegistry) -> JsonRpcResponse {
    let id = request.id.clone();

    match request.method.as_str() {
        // Cluster membership
        "cluster_listPeers" => JsonRpcResponse::success(id, json!(registry.list())),
        "cluster_addPeer" => handle_add_peer(id, &request.params, registry),

        // Cluster key
        "cluster_getKey" => JsonRpcResponse::success(id, json!({ "key": registry.cluster_key() })),
        "cluster_setKey" => handle_set_key(id, &request.params, registry),

        // Local node
        "node_setLocation" => handle_set_location(id, &request.params, registry),
        "node_getIdentity" => JsonRpcResponse::success(id, json!(registry.local())),

        _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, &format!("Method not found: {}", request.method)),
    }
}

fn handle_add_peer(id: Value, params: &Value, registry: &SharedRegistry) -> JsonRpcResponse {
    let peer: PeerIdentity = match params.get("peer").cloned().map(serde_json::from_value) {
        Some(Ok(peer)) => peer,
        Some(Err(e)) => return JsonRpcResponse::error(id, INVALID_PARAMS, &format!("Invalid peer: {e}")),
        None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing peer"),
    };
    if let Err(e) = peer.validate() {
        return JsonRpcResponse::error(id, INVALID_PARAMS, &format!("Invalid peer: {e}"));
    }

    let added = registry.add_manual(peer.as_learned());
    info!(peer = %peer, added, "Operator added cluster member");
    JsonRpcResponse::success(id, json!({ "added": added }))
}

fn handle_set_key(id: Value, params: &Value, registry: &SharedRegistry) -> JsonRpcResponse {
    let key = match params.get("key") {
        Some(Value::String(key)) if !key.is_empty() => Some(key.clone()),
        Some(Value::Null) | Some(Value::String(_)) => None,
        _ => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing key"),
    };
    let enabled = key.is_some();
    registry.set_cluster_key(key);
    info!(enabled, "Cluster key updated");
    JsonRpcResponse::success(id, json!({ "enabled": enabled }))
}

fn handle_set_location(id: Value, params: &Value, registry: &SharedRegistry) -> JsonRpcResponse {
    match params.get("location").and_then(Value::as_str) {
        Some(location) if !location.trim().is_empty() => {
            registry.set_location(location.trim());
            info!(location = location.trim(), "Advertised location updated");
            JsonRpcResponse::success(id, json!(registry.local()))
        }
        _ => JsonRpcResponse::error(id, INVALID_PARAMS, "Missing location"),
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn json_response(response: JsonRpcResponse) -> Response<Full<Bytes>> {
    match serde_json::to_vec(&response) {
        Ok(body) => {
            let mut resp = Response::new(Full::new(Bytes::from(body)));
            resp.headers_mut().insert(
                hyper::header::CONTENT_TYPE,
                hyper::header::HeaderValue::from_static("application/json"),
            );
            resp
        }
        Err(e) => {
            error!("Failed to encode JSON-RPC response: {}", e);
            plain_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<Full<Bytes>> {
    let mut resp = Response::new(Full::new(Bytes::from_static(message.as_bytes())));
    *resp.status_mut() = status;
    resp
}
