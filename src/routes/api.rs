//! JSON API handlers
//!
//! One handler per call in the contract. Every mutating call derives
//! ownership from the verified bearer identity; request bodies carry
//! no trusted owner field (a `userId` claim is passed to the policy
//! layer and rejected unless it names the caller).

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::server::AppState;
use crate::types::{PickgateError, UserId};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEventRequest {
    pub event_uuid: Uuid,
    pub event_type: String,
    #[serde(default)]
    pub target_id: Option<Uuid>,
    /// Optional owner claim; anything but the caller itself is rejected
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub meta: JsonValue,
}

/// Owner-scoped view of a recorded event. The owner field itself is
/// implied by the bearer identity and never echoed.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventView {
    event_uuid: Uuid,
    event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_id: Option<Uuid>,
    meta: JsonValue,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSavedRequest {
    pub target_id: Uuid,
    pub saved: bool,
    pub event_uuid: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub target_id: Uuid,
    #[serde(default)]
    pub operator_id: Option<Uuid>,
    #[serde(default = "default_slot")]
    pub slot: String,
}

fn default_slot() -> String {
    "main".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRequest {
    pub ticket: String,
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CodeResponse {
    ok: bool,
    code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TicketResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ticket: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BurnResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevSigninRequest {
    /// Existing identity to sign back in as; omitted mints a fresh one
    #[serde(default)]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DevSigninResponse {
    token: String,
    user_id: UserId,
    expires_at: u64,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/v1/events
pub async fn handle_log_event(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let (identity, body) = match authed_body::<LogEventRequest>(req, &state).await {
        Ok(parts) => parts,
        Err(e) => return error_response(&e),
    };

    let ok = state.ingest.log_event(
        identity,
        body.user_id,
        body.event_uuid,
        &body.event_type,
        body.target_id,
        body.meta,
    );
    json_response(&OkResponse { ok })
}

/// GET /api/v1/events?limit=N
///
/// The caller's own rows only; any other identity's rows are simply
/// absent, indistinguishable from not existing.
pub async fn handle_list_events(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let identity = match identity_of(&req, &state) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    let limit = query_limit(&req).unwrap_or(50).min(500);
    let events: Vec<EventView> = state
        .ingest
        .list_events(identity, limit)
        .into_iter()
        .map(|row| EventView {
            event_uuid: row.event_uuid,
            event_type: row.event_type,
            target_id: row.target_id,
            meta: row.meta,
            created_at: row.created_at,
        })
        .collect();
    json_response(&events)
}

/// POST /api/v1/saved
pub async fn handle_set_saved(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let (identity, body) = match authed_body::<SetSavedRequest>(req, &state).await {
        Ok(parts) => parts,
        Err(e) => return error_response(&e),
    };

    let ok = state
        .saved
        .set_saved(identity, body.target_id, body.saved, body.event_uuid);
    json_response(&OkResponse { ok })
}

/// GET /api/v1/saved?limit=N
pub async fn handle_get_saved(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let identity = match identity_of(&req, &state) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    let limit = query_limit(&req).unwrap_or(50).min(200);
    let saved = state.saved.get_saved(identity, limit);
    json_response(&saved)
}

/// GET /api/v1/picks/{slug}
pub fn handle_get_pick(slug: &str, state: &AppState) -> Response<Full<Bytes>> {
    match state.content.get_pick(slug) {
        Some(pick) => json_response(&pick),
        None => not_found_response(),
    }
}

/// POST /api/v1/transfer-codes
pub async fn handle_create_transfer_code(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let identity = match identity_of(&req, &state) {
        Ok(id) => id,
        Err(e) => return error_response(&e),
    };

    let code = state.transfer.create(identity);
    json_response(&CodeResponse { ok: true, code })
}

/// POST /api/v1/transfer-codes/redeem
pub async fn handle_redeem_transfer_code(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let (identity, body) = match authed_body::<RedeemRequest>(req, &state).await {
        Ok(parts) => parts,
        Err(e) => return error_response(&e),
    };

    let ok = state.transfer.redeem(identity, &body.code);
    json_response(&OkResponse { ok })
}

/// POST /api/v1/clickout/mint
pub async fn handle_mint_ticket(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let (_identity, body) = match authed_body::<MintRequest>(req, &state).await {
        Ok(parts) => parts,
        Err(e) => return error_response(&e),
    };

    let ticket = state
        .clickout
        .mint(body.target_id, body.operator_id, &body.slot);
    json_response(&TicketResponse {
        ok: ticket.is_some(),
        ticket,
    })
}

/// POST /api/v1/clickout/burn
pub async fn handle_burn_ticket(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    let (_identity, body) = match authed_body::<BurnRequest>(req, &state).await {
        Ok(parts) => parts,
        Err(e) => return error_response(&e),
    };

    let redirect_url = state.clickout.burn(&body.ticket);
    json_response(&BurnResponse {
        ok: redirect_url.is_some(),
        redirect_url,
    })
}

/// POST /auth/dev-signin (dev mode only)
///
/// Stand-in for the external identity provider so black-box probes can
/// obtain bearer tokens. Refused outright in production.
pub async fn handle_dev_signin(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Response<Full<Bytes>> {
    if !state.args.dev_mode {
        return not_found_response();
    }

    // An empty body means "mint a fresh identity".
    let bytes = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            return error_response(&PickgateError::BadRequest(format!(
                "Failed to read body: {}",
                e
            )))
        }
    };
    let body: DevSigninRequest = if bytes.is_empty() {
        DevSigninRequest { user_id: None }
    } else {
        match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) => {
                return error_response(&PickgateError::BadRequest(format!(
                    "Invalid JSON body: {}",
                    e
                )))
            }
        }
    };

    let user_id = body.user_id.unwrap_or_default();
    match state.jwt.issue(user_id) {
        Ok((token, expires_at)) => json_response(&DevSigninResponse {
            token,
            user_id,
            expires_at,
        }),
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Slugs are lowercase ASCII alphanumerics plus '-' and '_'. The path
/// segment is matched verbatim with no percent-decoding, so an encoded
/// slug can never name a row; anything outside the charset is a plain
/// 404.
pub(crate) fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

fn query_limit(req: &Request<Incoming>) -> Option<usize> {
    req.uri().query().and_then(|q| {
        q.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            if key == "limit" {
                value.parse::<usize>().ok()
            } else {
                None
            }
        })
    })
}

fn identity_of(
    req: &Request<Incoming>,
    state: &AppState,
) -> crate::types::Result<UserId> {
    let header = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());
    state.jwt.identity_from_header(header)
}

async fn read_json<T: serde::de::DeserializeOwned>(
    req: Request<Incoming>,
) -> crate::types::Result<T> {
    let bytes = req
        .into_body()
        .collect()
        .await
        .map_err(|e| PickgateError::BadRequest(format!("Failed to read body: {}", e)))?
        .to_bytes();

    serde_json::from_slice(&bytes)
        .map_err(|e| PickgateError::BadRequest(format!("Invalid JSON body: {}", e)))
}

async fn authed_body<T: serde::de::DeserializeOwned>(
    req: Request<Incoming>,
    state: &AppState,
) -> crate::types::Result<(UserId, T)> {
    let identity = identity_of(&req, state)?;
    let body = read_json(req).await?;
    Ok((identity, body))
}

/// Build a successful JSON response
fn json_response<T: Serialize>(data: &T) -> Response<Full<Bytes>> {
    let body = serde_json::to_vec(data).unwrap_or_default();
    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Cache-Control", "no-cache")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| fallback_error())
}

/// Map a structural failure to an HTTP response. Bodies stay generic;
/// detail goes to the log, not the caller.
fn error_response(err: &PickgateError) -> Response<Full<Bytes>> {
    debug!("Structural failure: {}", err);
    let (status, message) = match err {
        PickgateError::Unauthorized | PickgateError::Auth(_) => {
            (StatusCode::UNAUTHORIZED, "Unauthorized")
        }
        PickgateError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Bad request"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error"),
    };

    let body = serde_json::json!({ "error": message });
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap_or_else(|_| fallback_error())
}

pub(crate) fn not_found_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(r#"{"error":"Not found"}"#)))
        .unwrap_or_else(|_| fallback_error())
}

fn fallback_error() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(Full::new(Bytes::from(r#"{"error":"Internal error"}"#)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_charset() {
        assert!(is_valid_slug("test-game"));
        assert!(is_valid_slug("game_2"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Test-Game"));
        assert!(!is_valid_slug("test%2dgame"));
        assert!(!is_valid_slug("a/b"));
        assert!(!is_valid_slug("gäme"));
    }
}
