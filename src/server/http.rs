//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection, and a
//! method/path match for dispatch. All state is shared through a
//! single `Arc<AppState>`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::JwtValidator;
use crate::clickout::{ClickoutService, RedirectTable};
use crate::config::Args;
use crate::content::ContentService;
use crate::ingest::{IngestConfig, IngestService};
use crate::routes;
use crate::saved::SavedService;
use crate::store::{ContentStore, InteractionStore, SavedStore};
use crate::transfer::TransferCodeService;
use crate::types::Result;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub jwt: JwtValidator,
    pub ingest: Arc<IngestService>,
    pub saved: Arc<SavedService>,
    pub content: Arc<ContentService>,
    pub transfer: Arc<TransferCodeService>,
    pub clickout: Arc<ClickoutService>,
    /// Content table handle, kept for seeding
    pub content_store: Arc<ContentStore>,
}

impl AppState {
    /// Wire up stores and services from configuration
    pub fn new(args: Args) -> Result<Self> {
        let interactions = Arc::new(InteractionStore::new());
        let saved_store = Arc::new(SavedStore::new());
        let content_store = Arc::new(ContentStore::new());

        let jwt = JwtValidator::new(&args.jwt_secret()?, args.jwt_expiry_seconds);

        let ingest = Arc::new(IngestService::new(
            IngestConfig {
                allowed_event_types: args.event_types(),
                rate_limit_per_minute: args.rate_limit_per_minute,
            },
            Arc::clone(&interactions),
        ));

        let saved = Arc::new(SavedService::new(
            Arc::clone(&saved_store),
            Arc::clone(&content_store),
            Arc::clone(&ingest),
        ));

        let content = Arc::new(ContentService::new(Arc::clone(&content_store)));

        let transfer = Arc::new(TransferCodeService::new(
            Arc::clone(&interactions),
            Arc::clone(&saved_store),
        ));

        let clickout = Arc::new(ClickoutService::new(
            RedirectTable::new(),
            args.clickout_hosts(),
        ));

        Ok(Self {
            args,
            jwt,
            ingest,
            saved,
            content,
            transfer,
            clickout,
            content_store,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Pickgate listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - dev sign-in endpoint active");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            routes::health_check(&state.args.node_id.to_string())
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // Dev sign-in (identity-provider stand-in; 404 in production)
        (Method::POST, "/auth/dev-signin") => routes::handle_dev_signin(req, state).await,

        // Interaction ingestion and owner-scoped readback
        (Method::POST, "/api/v1/events") => routes::handle_log_event(req, state).await,
        (Method::GET, "/api/v1/events") => routes::handle_list_events(req, state).await,

        // Saved-state toggle and listing
        (Method::POST, "/api/v1/saved") => routes::handle_set_saved(req, state).await,
        (Method::GET, "/api/v1/saved") => routes::handle_get_saved(req, state).await,

        // Public pick lookup
        (Method::GET, p) if p.starts_with("/api/v1/picks/") => {
            let slug = p.strip_prefix("/api/v1/picks/").unwrap_or("");
            if routes::api::is_valid_slug(slug) {
                routes::handle_get_pick(slug, &state)
            } else {
                routes::api::not_found_response()
            }
        }

        // Transfer codes
        (Method::POST, "/api/v1/transfer-codes") => {
            routes::handle_create_transfer_code(req, state).await
        }
        (Method::POST, "/api/v1/transfer-codes/redeem") => {
            routes::handle_redeem_transfer_code(req, state).await
        }

        // Clickout tickets
        (Method::POST, "/api/v1/clickout/mint") => routes::handle_mint_ticket(req, state).await,
        (Method::POST, "/api/v1/clickout/burn") => routes::handle_burn_ticket(req, state).await,

        _ => routes::api::not_found_response(),
    };

    Ok(response)
}
