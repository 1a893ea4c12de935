// rest/routes/auth.rs — Signup, login, and password-reset handlers.
//
// Signup is the three-step OTP flow: /signup sends a 6-digit code,
// /verify-otp opens a session, /set-password finishes the account.
// The magic-link variant of this flow is intentionally not supported.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::error::{provider_reject, ApiError};
use crate::provider::{ProviderError, Session};
use crate::rest::gate::{ACCESS_COOKIE, REFRESH_COOKIE};
use crate::validate;
use crate::AppContext;

const ACCESS_COOKIE_MAX_AGE: i64 = 60 * 60 * 24 * 7;
const REFRESH_COOKIE_MAX_AGE: i64 = 60 * 60 * 24 * 30;

#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: Option<String>,
}

pub async fn signup(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = required_email(body.email)?;

    ctx.provider
        .send_otp(&email)
        .await
        .map_err(provider_reject)?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP sent to your email",
        "data": { "email": email, "otpSent": true },
    })))
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn verify_otp(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<Value>, ApiError> {
    let (email, token) = match (body.email, body.token) {
        (Some(e), Some(t)) if !e.is_empty() && !t.is_empty() => (e.to_lowercase(), t),
        _ => {
            return Err(ApiError::BadRequest(
                "Email and OTP token are required".to_string(),
            ))
        }
    };

    let session = ctx
        .provider
        .verify_otp(&email, &token)
        .await
        .map_err(|e| match e {
            ProviderError::Rejected { .. } => {
                ApiError::BadRequest("Invalid or expired OTP".to_string())
            }
            other => ApiError::Provider(other),
        })?;

    let user_id = session
        .user
        .as_ref()
        .map(|u| u.id.clone())
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "OTP verified successfully",
        "data": {
            "userId": user_id,
            "email": email,
            "session": session_json(&session),
            "otpVerified": true,
        },
    })))
}

#[derive(Deserialize)]
pub struct PasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

pub async fn set_password(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<PasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let (email, password) = match (body.email, body.password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e.to_lowercase(), p),
        _ => {
            return Err(ApiError::BadRequest(
                "Email and password are required".to_string(),
            ))
        }
    };

    check_password_policy(&password)?;

    let user = ctx
        .provider
        .find_user_by_email(&email)
        .await
        .map_err(|_| ApiError::BadRequest("Failed to find user".to_string()))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    ctx.provider
        .set_user_password(&user.id, &password)
        .await
        .map_err(|_| ApiError::BadRequest("Failed to set password".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Password set successfully",
        "data": { "userId": user.id, "email": email, "passwordSet": true },
    })))
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<PasswordRequest>,
) -> Result<Response, ApiError> {
    let (email, password) = match (body.email, body.password) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e, p),
        _ => {
            return Err(ApiError::BadRequest(
                "Email and password are required".to_string(),
            ))
        }
    };
    if !validate::valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }
    let email = email.to_lowercase();

    // Any provider-side auth failure collapses to one message — do not
    // reveal whether the address exists.
    let session = ctx
        .provider
        .password_login(&email, &password)
        .await
        .map_err(|_| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let user = session.user.clone();
    let body = json!({
        "success": true,
        "message": "Logged in successfully",
        "data": {
            "user": user.map(|u| json!({ "id": u.id, "email": u.email })),
            "session": session_json(&session),
        },
    });

    let mut resp = (StatusCode::OK, Json(body)).into_response();
    let headers = resp.headers_mut();
    headers.append(
        header::SET_COOKIE,
        session_cookie(ACCESS_COOKIE, &session.access_token, ACCESS_COOKIE_MAX_AGE)?,
    );
    headers.append(
        header::SET_COOKIE,
        session_cookie(REFRESH_COOKIE, &session.refresh_token, REFRESH_COOKIE_MAX_AGE)?,
    );
    Ok(resp)
}

pub async fn logout() -> Result<Response, ApiError> {
    let body = json!({ "success": true, "message": "Logged out successfully" });
    let mut resp = (StatusCode::OK, Json(body)).into_response();
    let headers = resp.headers_mut();
    headers.append(header::SET_COOKIE, session_cookie(ACCESS_COOKIE, "", 0)?);
    headers.append(header::SET_COOKIE, session_cookie(REFRESH_COOKIE, "", 0)?);
    Ok(resp)
}

pub async fn forgot_password(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<SignupRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = required_email(body.email)?;

    // Same response whether or not the address exists — recovery mail
    // failures are logged, never surfaced.
    match ctx.provider.find_user_by_email(&email).await {
        Ok(Some(_)) => {
            if let Err(e) = ctx.provider.send_recovery(&email).await {
                warn!(err = %e, "password recovery mail failed");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(err = %e, "user lookup failed during password recovery"),
    }

    Ok(Json(json!({
        "success": true,
        "message": "If email exists, password reset link has been sent",
        "data": { "email": email, "resetSent": true },
    })))
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

pub async fn reset_password(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    let password = body.password.filter(|p| !p.is_empty());
    let (Some(password), true) = (password, body.email.is_some() || body.token.is_some()) else {
        return Err(ApiError::BadRequest(
            "Password and token/email are required".to_string(),
        ));
    };

    check_password_policy(&password)?;

    // Only the email path can resolve a user. A token is accepted by the
    // request shape but never mapped to an identity here.
    let Some(email) = body.email.filter(|e| !e.is_empty()) else {
        return Err(ApiError::BadRequest("Unable to identify user".to_string()));
    };

    let user = ctx
        .provider
        .find_user_by_email(&email.to_lowercase())
        .await
        .map_err(|_| ApiError::BadRequest("Failed to process request".to_string()))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    ctx.provider
        .set_user_password(&user.id, &password)
        .await
        .map_err(|_| ApiError::BadRequest("Failed to reset password".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "message": "Password reset successfully",
        "data": { "userId": user.id },
    })))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn required_email(raw: Option<String>) -> Result<String, ApiError> {
    let email = raw.unwrap_or_default();
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }
    if !validate::valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email format".to_string()));
    }
    Ok(email.to_lowercase())
}

fn check_password_policy(password: &str) -> Result<(), ApiError> {
    let violations = validate::password_violations(password);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(violations.join("; ")))
    }
}

fn session_json(session: &Session) -> Value {
    json!({
        "accessToken": session.access_token,
        "refreshToken": session.refresh_token,
        "expiresIn": session.expires_in,
        "expiresAt": session.expires_at,
    })
}

fn session_cookie(
    name: &str,
    value: &str,
    max_age: i64,
) -> Result<header::HeaderValue, ApiError> {
    let cookie = format!("{name}={value}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax");
    header::HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("session cookie header: {e}")))
}
