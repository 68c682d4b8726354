use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use sealforge_core::SealTypeId;

use crate::app::{dto, errors, services::AppServices};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_seal_type).get(list_seal_types))
        .route("/:id", get(get_seal_type))
        .route("/:id/deactivate", put(deactivate_seal_type))
}

pub async fn create_seal_type(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    body: Result<Json<dto::CreateSealTypeRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match errors::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    match services
        .catalog
        .create(ctx.caller(), &body.name, &body.abbreviation, &body.description)
        .await
    {
        Ok(seal_type) => {
            (StatusCode::CREATED, Json(dto::seal_type_to_json(&seal_type))).into_response()
        }
        Err(e) => errors::seal_error_to_response(e),
    }
}

pub async fn list_seal_types(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.catalog.list().await {
        Ok(seal_types) => {
            let items = seal_types.iter().map(dto::seal_type_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::seal_error_to_response(e),
    }
}

pub async fn get_seal_type(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SealTypeId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("seal type"),
    };
    match services.catalog.get(id).await {
        Ok(seal_type) => (StatusCode::OK, Json(dto::seal_type_to_json(&seal_type))).into_response(),
        Err(e) => errors::seal_error_to_response(e),
    }
}

pub async fn deactivate_seal_type(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SealTypeId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("seal type"),
    };
    match services.catalog.deactivate(ctx.caller(), id).await {
        Ok(seal_type) => (StatusCode::OK, Json(dto::seal_type_to_json(&seal_type))).into_response(),
        Err(e) => errors::seal_error_to_response(e),
    }
}
