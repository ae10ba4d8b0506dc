use std::net::SocketAddr;

use axum::{middleware, routing::get, Router};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

use crate::auth::middleware::require_auth;
use crate::state::AppState;
use crate::storage::{PRODUCTS_PREFIX, PROFILE_PREFIX};
use crate::{auth, products, profile, users};

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::protected_router())
        .merge(profile::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let upload_dir = state.config.upload_dir.clone();

    Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(products::router())
        .merge(protected)
        .route("/health", get(|| async { "ok" }))
        .nest_service(
            "/uploads/profile",
            ServeDir::new(upload_dir.join(PROFILE_PREFIX)),
        )
        .nest_service(
            "/uploads/products",
            ServeDir::new(upload_dir.join(PRODUCTS_PREFIX)),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let request_id = Uuid::new_v4();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        %request_id,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
