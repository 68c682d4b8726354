use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use sealforge_infra::SealError;

pub fn seal_error_to_response(err: SealError) -> axum::response::Response {
    match err {
        SealError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        SealError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        SealError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        SealError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        SealError::InvalidTransition(msg) => {
            json_error(StatusCode::BAD_REQUEST, "invalid_transition", msg)
        }
        // Detail was logged where the failure happened.
        SealError::Storage(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            "internal storage error",
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
}

/// Unwrap a JSON body, turning extractor rejections into 400s.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    body.map(|Json(value)| value).map_err(invalid_body)
}

/// Like [`json_body`] but a request without a JSON body yields `None`.
pub fn optional_json_body<T>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<Option<T>, axum::response::Response> {
    match body {
        Ok(Json(value)) => Ok(Some(value)),
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(None),
        Err(rejection) => Err(invalid_body(rejection)),
    }
}

fn invalid_body(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let cases = [
            (SealError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (SealError::Conflict("x".into()), StatusCode::CONFLICT),
            (SealError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (SealError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (SealError::InvalidTransition("x".into()), StatusCode::BAD_REQUEST),
            (SealError::Storage("db down".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(seal_error_to_response(err).status(), status);
        }
    }
}
