// rest/mod.rs — HTTP API server.
//
// Endpoints:
//   GET    /health
//   POST   /api/auth/register
//   POST   /api/auth/login
//   GET    /api/auth/me
//   GET    /api/auth/users
//   POST   /api/tasks
//   GET    /api/tasks
//   GET    /api/tasks/{id}
//   PUT    /api/tasks/{id}
//   DELETE /api/tasks/{id}

pub mod auth;
pub mod routes;
pub mod schemas;

use anyhow::Result;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::AppContext;

pub async fn start_http_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;

    let router = build_router(ctx);

    info!("HTTP API listening on http://{}", bind);
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let cors = cors_layer(&ctx.config.cors_origin);
    Router::new()
        // Health (no auth)
        .route("/health", get(routes::health::health))
        // Auth
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/me", get(routes::auth::me))
        .route("/api/auth/users", get(routes::auth::list_users))
        // Tasks
        .route(
            "/api/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .layer(cors)
        .with_state(ctx)
}

fn cors_layer(origin: &str) -> CorsLayer {
    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        Err(_) => {
            warn!(origin, "invalid cors_origin — CORS disabled");
            CorsLayer::new()
        }
    }
}
