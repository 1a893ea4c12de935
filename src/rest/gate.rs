// rest/gate.rs — Bearer auth middleware for the task API and the
// session-cookie gate for page routes.
//
// Header: Authorization: Bearer <token>
// Cookie: sb-access-token (set by /api/auth/login)

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Redirect, Response},
};
use serde_json::json;
use std::sync::Arc;

use crate::provider::AuthUser;
use crate::AppContext;

pub const ACCESS_COOKIE: &str = "sb-access-token";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";

/// The verified caller, inserted as a request extension by `require_bearer`.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user: AuthUser,
    pub token: String,
}

/// Verifies the bearer token against the provider before any task handler
/// runs. 401 on a missing or invalid token.
pub async fn require_bearer(
    State(ctx): State<Arc<AppContext>>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(token) = token else {
        return unauthorized("Unauthorized - No token provided");
    };

    match ctx.provider.get_user(&token).await {
        Ok(user) => {
            req.extensions_mut().insert(Caller { user, token });
            next.run(req).await
        }
        Err(_) => unauthorized("Unauthorized - Invalid token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}

/// Page gating: unauthenticated requests to protected paths redirect to the
/// login page with the intended destination preserved; authenticated
/// requests to auth pages redirect to the dashboard. API paths pass through
/// untouched — they carry their own bearer auth.
pub async fn page_gate(
    State(ctx): State<Arc<AppContext>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let protected = path.starts_with("/dashboard");
    let auth_page = path == "/login" || path == "/signup";
    if !protected && !auth_page {
        return next.run(req).await;
    }

    let token = session_token(&req);

    if protected {
        let Some(token) = token else {
            return Redirect::to(&format!("/login?redirect={path}")).into_response();
        };
        return match ctx.provider.get_user(&token).await {
            Ok(_) => next.run(req).await,
            Err(_) => {
                Redirect::to(&format!("/login?redirect={path}&error=session_expired"))
                    .into_response()
            }
        };
    }

    // Auth page: send already-authenticated users to the dashboard.
    if let Some(token) = token {
        if ctx.provider.get_user(&token).await.is_ok() {
            return Redirect::to("/dashboard").into_response();
        }
    }
    next.run(req).await
}

/// Session token from the access cookie, falling back to a bearer header.
fn session_token(req: &Request) -> Option<String> {
    let from_cookie = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| {
            cookies.split(';').find_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                (name == ACCESS_COOKIE && !value.is_empty()).then(|| value.to_string())
            })
        });

    from_cookie.or_else(|| {
        req.headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}
