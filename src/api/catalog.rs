use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::schemas::catalog::CategoryOutlineResponse;
use crate::services::engine;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/categories/:category_id", get(get_category_outline))
}

async fn get_category_outline(
    Path(category_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<CategoryOutlineResponse>, ApiError> {
    let outline = engine::category_outline(&state, &user, &category_id).await?;
    Ok(Json(CategoryOutlineResponse::from_outline(outline)))
}
