use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

use sealforge_core::GrantId;
use sealforge_infra::SealError;
use sealforge_seals::GrantedSeal;

use crate::app::{dto, errors, services::AppServices};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/:id", get(get_grant).delete(revoke_grant))
        .route("/:id/approve", put(approve_grant))
        .route("/:id/reject", put(reject_grant))
        .route("/:id/request-renewal", put(request_renewal))
        .route("/:id/reject-renewal", put(reject_renewal))
}

fn parse_grant_id(id: &str) -> Result<GrantId, axum::response::Response> {
    id.parse().map_err(|_| errors::invalid_id("grant"))
}

fn grant_response(result: Result<GrantedSeal, SealError>) -> axum::response::Response {
    match result {
        Ok(grant) => (StatusCode::OK, Json(dto::grant_to_json(&grant))).into_response(),
        Err(e) => errors::seal_error_to_response(e),
    }
}

pub async fn get_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_grant_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    grant_response(services.grants.get(ctx.caller(), id).await)
}

pub async fn approve_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_grant_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    grant_response(services.grants.approve(ctx.caller(), id).await)
}

/// Body is optional: `{"reason": "..."}`.
pub async fn reject_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::RejectRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_grant_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let reason = match errors::optional_json_body(body) {
        Ok(b) => b.and_then(|b| b.reason),
        Err(resp) => return resp,
    };
    grant_response(services.grants.reject(ctx.caller(), id, reason).await)
}

pub async fn request_renewal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_grant_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    grant_response(services.grants.request_renewal(ctx.caller(), id).await)
}

pub async fn reject_renewal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::RejectRequest>, JsonRejection>,
) -> axum::response::Response {
    let id = match parse_grant_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let reason = match errors::optional_json_body(body) {
        Ok(b) => b.and_then(|b| b.reason),
        Err(resp) => return resp,
    };
    grant_response(services.grants.reject_renewal(ctx.caller(), id, reason).await)
}

/// Hard delete.
pub async fn revoke_grant(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_grant_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.grants.revoke(ctx.caller(), id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "id": id.to_string(), "revoked": true })),
        )
            .into_response(),
        Err(e) => errors::seal_error_to_response(e),
    }
}
