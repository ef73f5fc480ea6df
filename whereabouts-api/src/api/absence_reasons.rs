//! Absence reason catalogue

use axum::{extract::State, routing::get, Json, Router};

use crate::auth::AuthContext;
use crate::models::AbsentReasons;
use crate::AppState;

pub fn absence_reason_routes() -> Router<AppState> {
    Router::new().route("/absence-reasons", get(get_absence_reasons))
}

/// GET /absence-reasons
pub async fn get_absence_reasons(
    _ctx: AuthContext,
    State(state): State<AppState>,
) -> Json<AbsentReasons> {
    Json(state.attendance_service().get_absence_reasons())
}
