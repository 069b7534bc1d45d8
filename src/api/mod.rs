//! JSON HTTP API over the flow and workflow stores.

pub mod cross_module;
pub mod error;
pub mod flows;
pub mod health;
pub mod modules;
pub mod search;
pub mod update_flow;

use std::{fmt, net::SocketAddr};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, MatchedPath, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::catalog::Catalog;
use crate::config::Settings;
use crate::cross_module::CrossModuleStore;
use crate::logger::RequestMetrics;
use crate::search::SearchEngine;
use crate::store::FlowStore;

const BODY_LIMIT: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppState {
    pub flows: FlowStore,
    pub workflows: CrossModuleStore,
    pub search: SearchEngine,
    pub metrics: RequestMetrics,
}

impl AppState {
    pub fn new(flows: FlowStore, workflows: CrossModuleStore) -> Self {
        let search = SearchEngine::new(flows.clone(), workflows.clone());
        Self {
            flows,
            workflows,
            search,
            metrics: RequestMetrics::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let flows = FlowStore::new(&settings.data_dir, &settings.backup_dir, Catalog::builtin());
        let workflows = CrossModuleStore::new(flows.clone(), settings.cross_module_files.clone());
        Self::new(flows, workflows)
    }
}

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health::health))
        .nest("/flows", flows::routes())
        .nest("/modules", modules::routes())
        .nest("/cross-module", cross_module::routes())
        .nest("/search", search::routes())
        .route("/update-flow", post(update_flow::update_flow))
        .route_layer(middleware::from_fn_with_state(state.clone(), track_request));

    Router::new()
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}

/// A response that ends a request as failed.
struct ServerFailure(Response);

impl fmt::Display for ServerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}", self.0.status())
    }
}

async fn track_request(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| req.uri().path().to_owned(), |p| p.as_str().to_owned());
    let name = format!("{} {route}", req.method());
    let outcome = state
        .metrics
        .instrument_request(&name, async move {
            let response = next.run(req).await;
            if response.status().is_server_error() {
                Err(ServerFailure(response))
            } else {
                Ok(response)
            }
        })
        .await;
    match outcome {
        Ok(response) | Err(ServerFailure(response)) => response,
    }
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "API server listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("serving HTTP")
}
