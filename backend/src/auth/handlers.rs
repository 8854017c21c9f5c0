//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse and validate incoming requests, invoke the
//! `auth::service` for the protocol work, and manage the refresh token
//! cookie. The cookie is `HttpOnly` and scoped to the whole site; the
//! access token is only ever returned in the response body for the client
//! to hold in memory.

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::Json as ResponseJson,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use validator::Validate;

use crate::api::common::{ApiResponse, auth_error_to_http, validation_error_response};
use crate::auth::AppState;
use crate::auth::models::*;
use crate::errors::AuthError;
use crate::utils::jwt::AccessClaims;

const REFRESH_COOKIE: &str = "refresh_token";

fn refresh_cookie(token: String, expires_at: DateTime<Utc>) -> Cookie<'static> {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// A cookie that instructs the browser to drop the stored value.
fn cleared_refresh_cookie() -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Strict)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Handle user registration. Registration never issues tokens; the caller
/// logs in as a separate step.
#[axum::debug_handler]
pub async fn register(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, (StatusCode, String)> {
    if let Err(errors) = payload.validate() {
        return Err(validation_error_response(errors));
    }

    state
        .service
        .register(&payload.username, &payload.password)
        .await
        .map_err(auth_error_to_http)?;

    Ok(ResponseJson(ApiResponse::success((), "User registered")))
}

/// Handle user login: verify credentials, return the session pair, and set
/// the refresh token cookie.
#[axum::debug_handler]
pub async fn login(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, ResponseJson<SessionPair>), (StatusCode, String)> {
    if let Err(errors) = payload.validate() {
        return Err(validation_error_response(errors));
    }

    let pair = state
        .service
        .login(&payload.username, &payload.password)
        .await
        .map_err(auth_error_to_http)?;

    let jar = jar.add(refresh_cookie(
        pair.refresh_token.clone(),
        pair.refresh_token_expires_at,
    ));
    Ok((jar, ResponseJson(pair)))
}

/// Handle silent refresh. The presented token comes from the cookie; a
/// missing cookie is the same 401 as an invalid token.
#[axum::debug_handler]
pub async fn refresh(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ResponseJson<SessionPair>), (StatusCode, String)> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| auth_error_to_http(AuthError::InvalidRefreshToken))?;

    let pair = state
        .service
        .refresh(&token)
        .await
        .map_err(auth_error_to_http)?;

    let jar = jar.add(refresh_cookie(
        pair.refresh_token.clone(),
        pair.refresh_token_expires_at,
    ));
    Ok((jar, ResponseJson(pair)))
}

/// Handle logout: revoke the token row and clear the cookie. Always
/// succeeds unless the store itself is unreachable.
#[axum::debug_handler]
pub async fn logout(
    Extension(state): Extension<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, ResponseJson<ApiResponse<()>>), (StatusCode, String)> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        state
            .service
            .logout(cookie.value())
            .await
            .map_err(auth_error_to_http)?;
    }

    let jar = jar.add(cleared_refresh_cookie());
    Ok((jar, ResponseJson(ApiResponse::success((), "Logged out"))))
}

/// Handle password reset via the one-time secret.
#[axum::debug_handler]
pub async fn new_password(
    Extension(state): Extension<AppState>,
    Json(payload): Json<NewPasswordRequest>,
) -> Result<ResponseJson<ApiResponse<()>>, (StatusCode, String)> {
    if let Err(errors) = payload.validate() {
        return Err(validation_error_response(errors));
    }

    state
        .service
        .reset_password(&payload.secret_token, &payload.new_password)
        .await
        .map_err(auth_error_to_http)?;

    Ok(ResponseJson(ApiResponse::success((), "Password updated")))
}

/// Return the claims of the presented access token. Guarded by the access
/// token middleware; mainly useful for resource-tier collaborators and
/// smoke tests.
#[axum::debug_handler]
pub async fn me(
    Extension(claims): Extension<AccessClaims>,
) -> ResponseJson<ApiResponse<MeResponse>> {
    ResponseJson(ApiResponse::success(
        MeResponse {
            user_id: claims.sub.clone(),
            role: claims.role.clone(),
            roles: claims.roles,
        },
        "Authenticated",
    ))
}
