//! ログイン・メール確認・ログアウトハンドラ

use std::sync::Arc;

use axum::{
    Json,
    extract::Request,
    response::{IntoResponse, Response},
};
use evently_shared::BffResponse;

use super::{AuthState, LoginBody, SessionStartedData, append_cookies};
use crate::{
    client::{LoginRequest, VerifySignupRequest},
    cookie,
    handler::wrapper::{HandlerError, read_json},
    page::{DEFAULT_LANDING_ROUTE, login_redirect_target},
    session::SessionTokens,
};

/// POST /api/auth/login
///
/// 上流 API でログインし、`token` / `refresh` Cookie を設定する。
///
/// ## リクエストボディ
///
/// ```json
/// {
///   "email": "user@example.com",
///   "password": "password123",
///   "next": "/events/42"
/// }
/// ```
///
/// `next` が同一オリジンのパスでない場合は `/dashboard` に遷移させる。
#[tracing::instrument(skip_all)]
pub async fn login(state: Arc<AuthState>, request: Request) -> Result<Response, HandlerError> {
    let body: LoginBody = read_json(request).await?;
    let tokens = state
        .auth_api
        .login(&LoginRequest {
            email:    body.email,
            password: body.password,
        })
        .await?;

    tracing::info!(
        has_refresh_token = tokens.refresh_token.is_some(),
        "ログインに成功しました"
    );

    session_started(
        &tokens,
        login_redirect_target(body.next.as_deref()),
        state.is_production,
    )
}

/// POST /api/auth/verify
///
/// サインアップ時の確認コードを検証し、ログイン状態にする。
#[tracing::instrument(skip_all)]
pub async fn verify_signup(
    state: Arc<AuthState>,
    request: Request,
) -> Result<Response, HandlerError> {
    let body: VerifySignupRequest = read_json(request).await?;
    let tokens = state.auth_api.verify_signup(&body).await?;

    session_started(
        &tokens,
        DEFAULT_LANDING_ROUTE.to_string(),
        state.is_production,
    )
}

/// POST /api/auth/logout
///
/// `token` / `refresh` Cookie を失効させる。上流 API は呼ばない。
#[tracing::instrument(skip_all)]
pub async fn logout(state: Arc<AuthState>, _request: Request) -> Result<Response, HandlerError> {
    let mut response =
        Json(BffResponse::<()>::message("ログアウトしました")).into_response();
    append_cookies(
        &mut response,
        cookie::clear_session_cookies(state.is_production),
    )?;
    Ok(response)
}

fn session_started(
    tokens: &SessionTokens,
    redirect_to: String,
    is_production: bool,
) -> Result<Response, HandlerError> {
    let mut response = Json(BffResponse::data(SessionStartedData { redirect_to })).into_response();
    append_cookies(
        &mut response,
        cookie::session_cookies(tokens, is_production),
    )?;
    Ok(response)
}
