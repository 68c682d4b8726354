use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use sealforge_core::CompanyId;

use crate::app::{dto, errors, services::AppServices};
use crate::context::CallerContext;

pub fn router() -> Router {
    Router::new().route("/:id/seals", post(grant_seal).get(list_company_seals))
}

/// Administrator grants a seal directly (active immediately).
pub async fn grant_seal(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::GrantSealRequest>, JsonRejection>,
) -> axum::response::Response {
    let company_id: CompanyId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("company"),
    };
    let body = match errors::json_body(body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services
        .grants
        .grant(ctx.caller(), company_id, body.seal_type_id, body.validity_days)
        .await
    {
        Ok(grant) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "id": grant.id_typed().to_string(),
                "code": grant.code().map(|c| c.as_str()),
                "issued_on": grant.issued_on(),
                "expires_on": grant.expires_on(),
            })),
        )
            .into_response(),
        Err(e) => errors::seal_error_to_response(e),
    }
}

pub async fn list_company_seals(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<CallerContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::ListSealsQuery>,
) -> axum::response::Response {
    let company_id: CompanyId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_id("company"),
    };
    let filter = match query.filter() {
        Ok(f) => f,
        Err(resp) => return resp,
    };

    match services
        .queries
        .list_for_company(ctx.caller(), company_id, filter, query.page())
        .await
    {
        Ok(page) => (StatusCode::OK, Json(dto::grant_page_to_json(page))).into_response(),
        Err(e) => errors::seal_error_to_response(e),
    }
}
