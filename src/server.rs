//! HTTP front end: a single lookup endpoint wrapping the racer.
//!
//! - `GET /?cep=<query>`: 200 with the winner, 400 without a query, 408 on
//!   timeout, 502 when every provider failed
//! - `GET /health`
//! - `GET /stats`: per-provider statistics as JSON

use std::{collections::BTreeMap, fmt::Write as _};

use anyhow::{Context, Result};
use axum::{
    extract::{Query as Params, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    client::{ProviderStatsSnapshot, Racer},
    config::ProviderId,
    env::Settings,
    types::{Query, RaceResult},
};

/// Query-string parameter carrying the lookup key.
pub const QUERY_PARAM: &str = "cep";

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    cep: Option<String>,
}

/// Builds the router serving lookups through `racer`.
pub fn build_router(racer: Racer) -> Router {
    Router::new()
        .route("/", get(lookup))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .with_state(racer)
}

/// Binds `settings.addr` and serves until Ctrl-C.
pub async fn serve(settings: Settings) -> Result<()> {
    let racer = Racer::new(settings.providers, settings.race)
        .context("invalid race configuration")?;
    let app = build_router(racer);

    let listener = tokio::net::TcpListener::bind(settings.addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.addr))?;
    info!(addr = %settings.addr, "lookup server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn lookup(State(racer): State<Racer>, Params(params): Params<LookupParams>) -> Response {
    let query = match params.cep.as_deref().map(Query::new) {
        Some(Ok(query)) => query,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                format!(
                    "missing required query parameter `{p}`, e.g. /?{p}=01001000\n",
                    p = QUERY_PARAM
                ),
            )
                .into_response();
        }
    };

    match racer.race(&query).await {
        RaceResult::Won { provider, body } => {
            (StatusCode::OK, format!("provider: {provider}\n\n{body}")).into_response()
        }
        RaceResult::TimedOut => (
            StatusCode::REQUEST_TIMEOUT,
            format!(
                "no provider answered within {}ms\n",
                racer.config().deadline.as_millis()
            ),
        )
            .into_response(),
        RaceResult::AllFailed { failures } => {
            let mut text = String::from("all providers failed\n");
            for (provider, reason) in &failures {
                let _ = writeln!(text, "- {provider}: {reason}");
            }
            (StatusCode::BAD_GATEWAY, text).into_response()
        }
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn stats(State(racer): State<Racer>) -> Json<BTreeMap<ProviderId, ProviderStatsSnapshot>> {
    Json(racer.provider_stats().into_iter().collect())
}
