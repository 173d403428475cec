use crate::environments::{CacheStore, EnvironmentService, GitLabClient};
use anyhow::Result;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderName, HeaderValue, Method, Request},
    routing::{get, options},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{debug_span, info, Span};
use ulid::Ulid;

pub mod handlers;
pub mod jar;
mod openapi;

pub use self::handlers::branches::DeployMetadata;
pub use self::openapi::openapi;

/// Environment service as wired into the HTTP layer.
pub type Environments = EnvironmentService<GitLabClient, Arc<dyn CacheStore>>;

/// Full application router, ready to serve.
pub fn app(environments: Arc<Environments>, metadata: DeployMetadata) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any);

    let (router, _openapi) = openapi::api_router().split_for_parts();
    router
        .route("/", get(handlers::root))
        .route("/health", options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(cors)
                .layer(Extension(environments))
                .layer(Extension(metadata)),
        )
}

/// Serve the API until the process is stopped.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(
    port: u16,
    environments: Arc<Environments>,
    metadata: DeployMetadata,
) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app(environments, metadata).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Gracefully shutdown");
    }
}

// span
fn make_span(request: &Request<Body>) -> Span {
    let headers = request.headers();
    let path = request.uri().path();
    let request_id = headers
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", path, request_id)
}
