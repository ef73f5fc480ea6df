//! Legacy offender event endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing::info;
use whereabouts_common::TimePeriod;

use crate::auth::AuthContext;
use crate::db::offender_events;
use crate::models::{CreateOffenderEvent, OffenderEvent};
use crate::{ApiResult, AppState};

pub fn offender_event_routes() -> Router<AppState> {
    Router::new()
        .route("/whereabouts/offender-event", post(create_offender_event))
        .route("/whereabouts/offender-event/:prison_id", get(get_offender_events))
}

#[derive(Debug, Deserialize)]
pub struct OffenderEventQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub period: Option<TimePeriod>,
}

/// POST /whereabouts/offender-event
pub async fn create_offender_event(
    ctx: AuthContext,
    State(state): State<AppState>,
    body: Result<Json<CreateOffenderEvent>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<OffenderEvent>)> {
    let Json(request) = body?;
    request.validate()?;

    let event = offender_events::insert(
        &state.db,
        &request,
        ctx.username(),
        Local::now().naive_local(),
    )
    .await?;
    info!(id = event.id, booking_id = event.booking_id, "Recorded offender event");
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /whereabouts/offender-event/{prison}?date&period
pub async fn get_offender_events(
    _ctx: AuthContext,
    State(state): State<AppState>,
    Path(prison_id): Path<String>,
    query: Result<Query<OffenderEventQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<OffenderEvent>>> {
    let Query(query) = query?;
    let events =
        offender_events::find_by_prison(&state.db, &prison_id, query.date, query.period).await?;
    Ok(Json(events))
}
