//! セッション参照ハンドラ

use std::sync::Arc;

use axum::{
    Json,
    extract::Request,
    response::{IntoResponse, Response},
};
use evently_shared::BffResponse;

use super::AuthState;
use crate::handler::wrapper::{HandlerError, get_authed_headers};

/// GET /api/auth/me
///
/// ログイン中のユーザー情報を上流 API から取得する。
#[tracing::instrument(skip_all)]
pub async fn me(state: Arc<AuthState>, request: Request) -> Result<Response, HandlerError> {
    let auth = get_authed_headers(request.headers())?;
    let user = state.auth_api.me(&auth).await?;
    Ok(Json(BffResponse::data(user)).into_response())
}
