//! Location group endpoints

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::auth::AuthContext;
use crate::clients::{Location, LocationGroup};
use crate::services::cells_for_group;
use crate::{ApiResult, AppState};

pub fn location_routes() -> Router<AppState> {
    Router::new()
        .route("/agencies/:agency_id/locations/groups", get(get_location_groups))
        .route("/locations/groups/:agency_id/:name", get(get_cells_for_group))
}

/// GET /agencies/{agency}/locations/groups
pub async fn get_location_groups(
    ctx: AuthContext,
    State(state): State<AppState>,
    Path(agency_id): Path<String>,
) -> ApiResult<Json<Vec<LocationGroup>>> {
    let groups = state.location_groups.get_location_groups(&ctx, &agency_id).await?;
    Ok(Json(groups))
}

/// GET /locations/groups/{agency}/{name}
///
/// Cells of the agency whose prefix falls in the named group.
pub async fn get_cells_for_group(
    ctx: AuthContext,
    State(state): State<AppState>,
    Path((agency_id, name)): Path<(String, String)>,
) -> ApiResult<Json<Vec<Location>>> {
    let cells = cells_for_group(
        state.location_groups.as_ref(),
        state.prison_api.as_ref(),
        &ctx,
        &agency_id,
        &name,
    )
    .await?;
    Ok(Json(cells))
}
