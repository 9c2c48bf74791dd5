use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::api::json_body;
use crate::error::{ApiError, ApiResult};
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::router::Context;
use crate::session::SESSION_COOKIE;

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

pub fn session_cookie(token: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        ttl.as_secs()
    )
}

pub fn cleared_session_cookie() -> String {
    format!(
        "{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0; \
         Expires=Thu, 01 Jan 1970 00:00:00 GMT"
    )
}

/// `POST /api/login`
pub fn login(ctx: &Context<'_>) -> ApiResult<Response> {
    let creds: LoginRequest = json_body(ctx.request)?;

    if !ctx.state.config.auth.verify(&creds.username, &creds.password) {
        tracing::warn!(user = %creds.username, "Login failed");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let session = ctx.state.sessions.create_session(&creds.username);
    tracing::info!(user = %session.username, "Login succeeded");

    Ok(ResponseBuilder::new(StatusCode::Ok)
        .header(
            "Set-Cookie",
            session_cookie(&session.token, ctx.state.sessions.ttl()),
        )
        .json(&json!({ "status": "success" }))?
        .build())
}

/// `POST /api/logout`. Succeeds whether or not the caller had a session.
pub fn logout(ctx: &Context<'_>) -> ApiResult<Response> {
    if let Some(token) = ctx.request.cookie(SESSION_COOKIE) {
        ctx.state.sessions.remove_session(token);
    }

    Ok(ResponseBuilder::new(StatusCode::Ok)
        .header("Set-Cookie", cleared_session_cookie())
        .json(&json!({ "status": "success" }))?
        .build())
}
