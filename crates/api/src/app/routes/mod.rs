use axum::{Router, routing::get};

pub mod companies;
pub mod grants;
pub mod seal_types;
pub mod seals;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/seals", seals::router())
        .nest("/companies", companies::router())
        .nest("/grants", grants::router())
        .nest("/seal-types", seal_types::router())
}
