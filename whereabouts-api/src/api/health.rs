//! Health endpoint
//!
//! Unauthenticated. Reports UP only when the database answers and both
//! upstream services respond to a ping within the configured timeout.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::clients::UpstreamError;
use crate::AppState;

const UP: &str = "UP";
const DOWN: &str = "DOWN";

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub components: BTreeMap<&'static str, ComponentHealth>,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn up() -> Self {
        Self { status: UP, error: None }
    }

    fn down(error: impl Into<String>) -> Self {
        Self {
            status: DOWN,
            error: Some(error.into()),
        }
    }

    fn is_up(&self) -> bool {
        self.status == UP
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let timeout = state.health_timeout;

    let db = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => ComponentHealth::up(),
        Err(e) => ComponentHealth::down(e.to_string()),
    };
    let prison_api = ping(timeout, state.prison_api.ping()).await;
    let case_notes_api = ping(timeout, state.case_notes_api.ping()).await;

    let mut components = BTreeMap::new();
    components.insert("db", db);
    components.insert("prisonApi", prison_api);
    components.insert("caseNotesApi", case_notes_api);

    let healthy = components.values().all(ComponentHealth::is_up);
    if !healthy {
        warn!("Health check failed: {:?}", components);
    }

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if healthy { UP } else { DOWN },
            module: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            components,
        }),
    )
}

async fn ping<F>(timeout: Duration, probe: F) -> ComponentHealth
where
    F: Future<Output = Result<(), UpstreamError>>,
{
    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(())) => ComponentHealth::up(),
        Ok(Err(e)) => ComponentHealth::down(e.to_string()),
        Err(_) => ComponentHealth::down(UpstreamError::Timeout.to_string()),
    }
}
