use crate::{api::Environments, environments::EnvironmentsResponse};
use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

#[utoipa::path(
    get,
    path = "/dev-ops/environments",
    responses(
        (status = 200, description = "Branches per project, or the main-only fallback with an error message", body = EnvironmentsResponse, content_type = "application/json"),
    ),
    tag = "environments"
)]
/// List frontend and backend branches, categorized into `main` and `feature`.
///
/// Always answers `200`; a fresh listing is cached for 60 seconds and served
/// unchanged while fresh.
pub async fn environments(service: Extension<Arc<Environments>>) -> impl IntoResponse {
    let body = service.get_environments().await;
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "application/json")],
        body.into_string(),
    )
}
