//! whereabouts-api library
//!
//! Records whether prisoners attended their scheduled activities, pushes the
//! outcome to the Prison API, raises incentive level warning case notes and
//! serves location groups used to build unlock lists.

pub mod api;
pub mod auth;
pub mod clients;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::{ApiError, ApiResult};

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::info;
use whereabouts_common::config::{LocationGroupSource, TomlConfig};

use crate::clients::{CaseNotesApi, CaseNotesClient, PrisonApi, PrisonApiClient, ServiceTokenProvider};
use crate::services::{
    AttendanceService, LocationGroupService, PropertiesLocationGroupService,
    UpstreamLocationGroupService,
};

/// Default bound on each upstream ping made by the health endpoint
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_millis(1000);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub prison_api: Arc<dyn PrisonApi>,
    pub case_notes_api: Arc<dyn CaseNotesApi>,
    pub location_groups: Arc<dyn LocationGroupService>,
    pub tokens: Arc<ServiceTokenProvider>,
    pub health_timeout: Duration,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        prison_api: Arc<dyn PrisonApi>,
        case_notes_api: Arc<dyn CaseNotesApi>,
        location_groups: Arc<dyn LocationGroupService>,
        tokens: Arc<ServiceTokenProvider>,
    ) -> Self {
        Self {
            db,
            prison_api,
            case_notes_api,
            location_groups,
            tokens,
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
        }
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    /// Build state with reqwest-backed clients from configuration
    pub fn from_config(db: SqlitePool, config: &TomlConfig) -> whereabouts_common::Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| whereabouts_common::Error::Config(format!("HTTP client: {}", e)))?;

        let prison_api: Arc<dyn PrisonApi> =
            Arc::new(PrisonApiClient::new(http.clone(), &config.prison_api.url));
        let case_notes_api: Arc<dyn CaseNotesApi> =
            Arc::new(CaseNotesClient::new(http.clone(), &config.case_notes_api.url));
        let tokens = Arc::new(ServiceTokenProvider::new(http, config.oauth.clone()));

        let location_groups: Arc<dyn LocationGroupService> = match config.location_groups.source {
            LocationGroupSource::Properties => Arc::new(PropertiesLocationGroupService::from_file(
                &config.location_groups.properties_file,
            )?),
            LocationGroupSource::Upstream => {
                info!("Location groups served from the Prison API");
                Arc::new(UpstreamLocationGroupService::new(prison_api.clone()))
            }
        };

        Ok(Self::new(db, prison_api, case_notes_api, location_groups, tokens)
            .with_health_timeout(Duration::from_millis(config.health.timeout_ms)))
    }

    pub fn attendance_service(&self) -> AttendanceService {
        AttendanceService::new(
            self.db.clone(),
            self.prison_api.clone(),
            self.case_notes_api.clone(),
            self.tokens.clone(),
        )
    }
}

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::attendance_routes())
        .merge(api::absence_reason_routes())
        .merge(api::statistics_routes())
        .merge(api::offender_event_routes())
        .merge(api::location_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
