// rest/mod.rs — Public HTTP API server.
//
// Axum router over the provider-backed handlers.
//
// Endpoints:
//   POST /api/auth/signup
//   POST /api/auth/verify-otp
//   POST /api/auth/set-password
//   POST /api/auth/login            (sets session cookies)
//   POST /api/auth/logout
//   POST /api/auth/forgot-password
//   POST /api/auth/reset-password
//   GET/POST /api/tasks             (bearer)
//   GET/PUT/DELETE /api/tasks/{id}  (bearer)
//   GET  /api/health
//   GET  /login /signup /dashboard  (cookie-gated pages)

pub mod gate;
pub mod routes;

use anyhow::Result;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::AppContext;

pub async fn start_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    let tasks = Router::new()
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
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            gate::require_bearer,
        ));

    Router::new()
        // Health (no auth)
        .route("/api/health", get(routes::health::health))
        // Auth
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/verify-otp", post(routes::auth::verify_otp))
        .route("/api/auth/set-password", post(routes::auth::set_password))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/logout", post(routes::auth::logout))
        .route(
            "/api/auth/forgot-password",
            post(routes::auth::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(routes::auth::reset_password),
        )
        // Tasks (bearer-gated)
        .merge(tasks)
        // Pages (session-cookie gated by the middleware below)
        .route("/login", get(routes::pages::login))
        .route("/signup", get(routes::pages::signup))
        .route("/dashboard", get(routes::pages::dashboard))
        .layer(middleware::from_fn_with_state(ctx.clone(), gate::page_gate))
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
