//! Liveness and version probes

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde_json::json;

/// GET /health - liveness probe
pub fn health_check(node_id: &str) -> Response<Full<Bytes>> {
    let body = json!({
        "status": "ok",
        "node": node_id,
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response")
}

/// GET /version - deployment verification
pub fn version_info() -> Response<Full<Bytes>> {
    let body = json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .expect("static response")
}
