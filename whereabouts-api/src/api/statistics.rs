//! Attendance statistics endpoint

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use whereabouts_common::TimePeriod;

use crate::auth::AuthContext;
use crate::models::AttendanceStats;
use crate::services::attendance_stats;
use crate::{ApiResult, AppState};

pub fn statistics_routes() -> Router<AppState> {
    Router::new().route(
        "/attendance-statistics/:prison_id/over-date-range",
        get(get_attendance_stats),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub from_date: NaiveDate,
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
    #[serde(default)]
    pub period: Option<TimePeriod>,
}

/// GET /attendance-statistics/{prison}/over-date-range?fromDate&toDate&period
pub async fn get_attendance_stats(
    ctx: AuthContext,
    State(state): State<AppState>,
    Path(prison_id): Path<String>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<Json<AttendanceStats>> {
    let Query(query) = query?;
    let service_token = state.tokens.service_token(&ctx).await?;
    let stats = attendance_stats(
        &state.db,
        state.prison_api.as_ref(),
        &service_token,
        &prison_id,
        query.period,
        query.from_date,
        query.to_date,
    )
    .await?;
    Ok(Json(stats))
}
