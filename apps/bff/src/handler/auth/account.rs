//! アカウント作成・パスワード再設定ハンドラ

use std::sync::Arc;

use axum::{
    Json,
    RequestExt,
    extract::{Query, Request},
    response::{IntoResponse, Response},
};
use evently_shared::BffResponse;
use validator::Validate;

use super::{AuthState, EmailExistsQuery, EmailExistsResponseData};
use crate::{
    client::{ForgotPasswordRequest, ResetPasswordRequest, SignupRequest},
    handler::wrapper::{HandlerError, read_json},
};

/// POST /api/auth/signup
#[tracing::instrument(skip_all)]
pub async fn signup(state: Arc<AuthState>, request: Request) -> Result<Response, HandlerError> {
    let body: SignupRequest = read_json(request).await?;
    let message = state.auth_api.signup(&body).await?;
    Ok(Json(BffResponse::<()>::message(message)).into_response())
}

/// POST /api/auth/forgot-password
#[tracing::instrument(skip_all)]
pub async fn forgot_password(
    state: Arc<AuthState>,
    request: Request,
) -> Result<Response, HandlerError> {
    let body: ForgotPasswordRequest = read_json(request).await?;
    let message = state.auth_api.forgot_password(&body).await?;
    Ok(Json(BffResponse::<()>::message(message)).into_response())
}

/// POST /api/auth/reset-password
#[tracing::instrument(skip_all)]
pub async fn reset_password(
    state: Arc<AuthState>,
    request: Request,
) -> Result<Response, HandlerError> {
    let body: ResetPasswordRequest = read_json(request).await?;
    let message = state.auth_api.reset_password(&body).await?;
    Ok(Json(BffResponse::<()>::message(message)).into_response())
}

/// GET /api/auth/email-exists?email=...
///
/// 上流の失敗は「未登録」として返す（サインアップフォームの補助表示用）。
#[tracing::instrument(skip_all)]
pub async fn email_exists(
    state: Arc<AuthState>,
    mut request: Request,
) -> Result<Response, HandlerError> {
    let Query(query) = request
        .extract_parts::<Query<EmailExistsQuery>>()
        .await
        .map_err(|e| HandlerError::bad_request(e.body_text()))?;
    query
        .validate()
        .map_err(|e| HandlerError::bad_request(format!("入力内容が不正です: {e}")))?;

    let exists = state.auth_api.email_exists(&query.email).await;
    Ok(Json(BffResponse::data(EmailExistsResponseData { exists })).into_response())
}
