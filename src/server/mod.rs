//! Locker service
//!
//! The edge service backing the claim/transfer protocol: three
//! stateless routes over one sled key-value tree. Responses are plain
//! text and always status 200 — clients inspect the body (`OK`,
//! `NOT_FOUND`, `DELETED`), not the status code. The service is
//! payload-agnostic and performs no authentication or ownership
//! checks: anyone who knows an address can read, overwrite, or delete
//! it. That trade-off is part of the protocol, not an accident.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::ServiceConfig;

/// Body of a `/save` request.
#[derive(Debug, Deserialize)]
struct SaveRequest {
    id: String,
    data: String,
}

/// Query string of `/get` and `/delete`.
#[derive(Debug, Deserialize)]
struct IdQuery {
    id: String,
}

/// Locker service instance.
pub struct LockerService {
    config: ServiceConfig,
    db: sled::Db,
}

impl LockerService {
    /// Open (or create) the store and build the service.
    pub fn new(config: ServiceConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let db = sled::open(config.data_dir.join("lockers"))?;
        Ok(Self { config, db })
    }

    /// Start serving and block until shutdown.
    pub async fn start(&self) -> anyhow::Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid address: {}", e))?;

        let app = self.build_router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind: {}", e))?;

        info!("Locker service listening on {}", addr);
        info!("Lockers are unauthenticated; address uniqueness is the client's job");

        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }

    /// Build the Axum router. Public so tests can serve it on an
    /// ephemeral port.
    pub fn build_router(&self) -> Router {
        let db = Arc::new(self.db.clone());

        // Permissive CORS answers OPTIONS pre-flight for any origin.
        let cors = tower_http::cors::CorsLayer::permissive();

        Router::new()
            .route("/", get(root_handler))
            .route("/save", post(save_handler))
            .route("/get", get(get_handler))
            .route("/delete", get(delete_handler))
            .with_state(db)
            .layer(cors)
    }
}

/// Liveness banner.
async fn root_handler() -> String {
    format!("Party Locker Online ({})", env!("CARGO_PKG_VERSION"))
}

/// Unconditionally overwrite the record at `id`. The data's shape is
/// never inspected.
async fn save_handler(State(db): State<Arc<sled::Db>>, Form(req): Form<SaveRequest>) -> String {
    match db.insert(req.id.as_bytes(), req.data.as_bytes()) {
        Ok(_) => {
            info!("Stored {} bytes at locker {}", req.data.len(), req.id);
            "OK".to_string()
        }
        Err(e) => {
            warn!("Store failed for locker {}: {}", req.id, e);
            "ERROR".to_string()
        }
    }
}

/// Non-destructive read; absence is the fixed `NOT_FOUND` token.
async fn get_handler(State(db): State<Arc<sled::Db>>, Query(query): Query<IdQuery>) -> String {
    match db.get(query.id.as_bytes()) {
        Ok(Some(value)) => String::from_utf8_lossy(&value).into_owned(),
        Ok(None) => "NOT_FOUND".to_string(),
        Err(e) => {
            warn!("Read failed for locker {}: {}", query.id, e);
            "NOT_FOUND".to_string()
        }
    }
}

/// Remove the record. Acknowledged even if nothing was stored.
async fn delete_handler(State(db): State<Arc<sled::Db>>, Query(query): Query<IdQuery>) -> String {
    match db.remove(query.id.as_bytes()) {
        Ok(_) => {
            info!("Deleted locker {}", query.id);
            "DELETED".to_string()
        }
        Err(e) => {
            warn!("Delete failed for locker {}: {}", query.id, e);
            "ERROR".to_string()
        }
    }
}
