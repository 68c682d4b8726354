use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use crate::app::{dto, errors, services::AppServices};
use crate::authz::target_company;
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new()
        .route("/request", post(request_seal))
        .route("/pending", get(list_pending))
}

/// A company asks for a seal (admins may ask on a company's behalf).
pub async fn request_seal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    body: Result<Json<dto::RequestSealRequest>, JsonRejection>,
) -> axum::response::Response {
    let body = match errors::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let company_id = match target_company(&ctx, body.company_id) {
        Ok(id) => id,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "company_id is required",
            );
        }
    };

    match services
        .grants
        .request(ctx.caller(), company_id, body.seal_type_id, body.validity_years)
        .await
    {
        Ok(grant) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": grant.id_typed().to_string(),
                "status": grant.status().as_str(),
            })),
        )
            .into_response(),
        Err(e) => errors::seal_error_to_response(e),
    }
}

/// Review queue for administrators.
pub async fn list_pending(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
) -> axum::response::Response {
    match services.queries.list_pending(ctx.caller()).await {
        Ok(grants) => {
            let items = grants.iter().map(dto::grant_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::seal_error_to_response(e),
    }
}
