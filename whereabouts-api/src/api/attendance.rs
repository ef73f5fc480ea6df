//! Attendance endpoints
//!
//! Single and batch recording, update by id, and the read queries used by
//! the unlock list and absence reports.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;
use whereabouts_common::{AbsentReason, TimePeriod};

use crate::auth::AuthContext;
use crate::models::{
    Attendance, AttendancesResponse, CreateAttendance, CreateAttendances, UpdateAttendance,
};
use crate::{ApiError, ApiResult, AppState};

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route("/attendance", post(create_attendance))
        .route("/attendance/:id", put(update_attendance))
        .route("/attendance/:prison_id/:event_location_id", get(get_attendance))
        .route("/attendances", post(create_attendances))
        .route(
            "/attendances/:prison_id",
            get(get_attendance_for_bookings).post(post_attendance_for_bookings),
        )
        .route("/attendances/:prison_id/absences/:reason", get(get_absences))
}

#[derive(Debug, Deserialize)]
pub struct DatePeriodQuery {
    pub date: NaiveDate,
    pub period: TimePeriod,
}

#[derive(Debug, Deserialize)]
pub struct BookingsQuery {
    pub date: NaiveDate,
    pub period: TimePeriod,
    /// Comma separated booking ids
    pub bookings: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsencesQuery {
    pub from_date: NaiveDate,
    #[serde(default)]
    pub to_date: Option<NaiveDate>,
    #[serde(default)]
    pub period: Option<TimePeriod>,
}

/// POST /attendance
pub async fn create_attendance(
    ctx: AuthContext,
    State(state): State<AppState>,
    body: Result<Json<CreateAttendance>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Attendance>)> {
    let Json(request) = body?;
    let attendance = state.attendance_service().record_attendance(&ctx, request).await?;
    Ok((StatusCode::CREATED, Json(attendance)))
}

/// PUT /attendance/{id}
pub async fn update_attendance(
    ctx: AuthContext,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateAttendance>, JsonRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    let Json(request) = body?;
    state.attendance_service().update_attendance(&ctx, id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /attendance/{prison}/{eventLocation}?date&period
pub async fn get_attendance(
    _ctx: AuthContext,
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
    query: Result<Query<DatePeriodQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Attendance>>> {
    let Path((prison_id, event_location_id)) = path?;
    let Query(query) = query?;
    let attendances = state
        .attendance_service()
        .get_attendance(&prison_id, event_location_id, query.date, query.period)
        .await?;
    Ok(Json(attendances))
}

/// GET /attendances/{prison}?date&period&bookings=1,2
pub async fn get_attendance_for_bookings(
    _ctx: AuthContext,
    State(state): State<AppState>,
    Path(prison_id): Path<String>,
    query: Result<Query<BookingsQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Attendance>>> {
    let Query(query) = query?;
    let booking_ids = parse_booking_ids(&query.bookings)?;
    let attendances = state
        .attendance_service()
        .get_attendance_for_bookings(&prison_id, &booking_ids, query.date, query.period)
        .await?;
    Ok(Json(attendances))
}

/// POST /attendances/{prison}?date&period with a JSON array of booking ids
///
/// Same lookup as the GET form, for id lists too long for a query string.
pub async fn post_attendance_for_bookings(
    _ctx: AuthContext,
    State(state): State<AppState>,
    Path(prison_id): Path<String>,
    query: Result<Query<DatePeriodQuery>, QueryRejection>,
    body: Result<Json<Vec<i64>>, JsonRejection>,
) -> ApiResult<Json<Vec<Attendance>>> {
    let Query(query) = query?;
    let Json(booking_ids) = body?;
    let attendances = state
        .attendance_service()
        .get_attendance_for_bookings(&prison_id, &booking_ids, query.date, query.period)
        .await?;
    Ok(Json(attendances))
}

/// POST /attendances
pub async fn create_attendances(
    ctx: AuthContext,
    State(state): State<AppState>,
    body: Result<Json<CreateAttendances>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AttendancesResponse>)> {
    let Json(request) = body?;
    let attendances = state
        .attendance_service()
        .record_attendance_for_bookings(&ctx, request)
        .await?;
    Ok((StatusCode::CREATED, Json(AttendancesResponse { attendances })))
}

/// GET /attendances/{prison}/absences/{reason}?fromDate&toDate&period
pub async fn get_absences(
    _ctx: AuthContext,
    State(state): State<AppState>,
    Path((prison_id, reason)): Path<(String, String)>,
    query: Result<Query<AbsencesQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Attendance>>> {
    let reason: AbsentReason = reason.parse()?;
    let Query(query) = query?;
    let to = query.to_date.unwrap_or(query.from_date);
    let absences = state
        .attendance_service()
        .get_absences(&prison_id, reason, query.from_date, to, query.period)
        .await?;
    Ok(Json(absences))
}

fn parse_booking_ids(raw: &str) -> ApiResult<Vec<i64>> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid booking id: {}", s)))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    debug!(count = ids.len(), "Parsed booking ids");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_booking_ids() {
        assert_eq!(parse_booking_ids("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_booking_ids("").unwrap().is_empty());
        assert!(matches!(parse_booking_ids("1,x"), Err(ApiError::BadRequest(_))));
    }
}
