use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::repositories;
use crate::schemas::entitlement::{EntitlementResponse, GiftCreate, GiftResponse, PaymentCreate};
use crate::services::engine::{self, PaymentRequest};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(list_my_entitlements))
        .route("/payments", post(record_payment))
        .route("/gifts", post(grant_gift))
        .route("/users/:user_id", get(list_user_entitlements))
}

async fn list_entitlements(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<EntitlementResponse>, ApiError> {
    let now = primitive_now_utc();
    let entitlements = repositories::entitlements::list_for_user(state.db(), user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch entitlements"))?;
    Ok(entitlements.into_iter().map(|item| EntitlementResponse::new(item, now)).collect())
}

async fn list_my_entitlements(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<EntitlementResponse>>, ApiError> {
    Ok(Json(list_entitlements(&state, &user.id).await?))
}

async fn list_user_entitlements(
    Path(user_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<EntitlementResponse>>, ApiError> {
    let exists = repositories::users::exists(state.db(), &user_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch user"))?;
    if !exists {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    Ok(Json(list_entitlements(&state, &user_id).await?))
}

async fn record_payment(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<PaymentCreate>,
) -> Result<(StatusCode, Json<EntitlementResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let entitlement = engine::record_payment(
        &state,
        &admin,
        PaymentRequest {
            user_id: &payload.user_id,
            category_id: &payload.category_id,
            module_id: payload.module_id.as_deref(),
            amount_cents: payload.amount_cents,
            expires_at: to_primitive_utc(payload.expires_at),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(EntitlementResponse::new(entitlement, primitive_now_utc()))))
}

async fn grant_gift(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<GiftCreate>,
) -> Result<(StatusCode, Json<GiftResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let (entitlement, created) = engine::grant_gift(
        &state,
        &admin,
        &payload.user_id,
        &payload.category_id,
        payload.module_id.as_deref(),
    )
    .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((
        status,
        Json(GiftResponse {
            entitlement: EntitlementResponse::new(entitlement, primitive_now_utc()),
            created,
        }),
    ))
}

#[cfg(test)]
mod tests;
