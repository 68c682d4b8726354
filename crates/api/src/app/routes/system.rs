use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use sealforge_auth::AuthorizationSummary;

use crate::context::CallerContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<CallerContext>) -> impl IntoResponse {
    Json(AuthorizationSummary::of(ctx.caller()))
}
