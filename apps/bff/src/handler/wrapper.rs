//! # ハンドララッパー
//!
//! すべての BFF エンドポイントが共有する入口と出口をまとめる。
//!
//! - 許可されていないメソッドは内側のハンドラを呼ばずに 405 を返す
//! - ハンドラが返した [`HandlerError`] を
//!   `{ "success": false, "error": ..., "trace_id"?: ... }` に変換してログに残す

use std::future::Future;

use axum::{
    Json,
    body::to_bytes,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header::ALLOW},
    response::{IntoResponse, Response},
    routing::{MethodRouter, any},
};
use evently_shared::BffResponse;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use validator::Validate;

use crate::{
    client::ApiClientError,
    middleware::current_request_id,
    session::{AuthHeader, Session},
};

/// 受け付けるリクエストボディの上限
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub const GET: &[Method] = &[Method::GET];
pub const POST: &[Method] = &[Method::POST];
pub const GET_POST: &[Method] = &[Method::GET, Method::POST];
pub const GET_PUT_DELETE: &[Method] = &[Method::GET, Method::PUT, Method::DELETE];

/// ハンドラが返すエラー
///
/// `status` がそのままレスポンスのステータスになる。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    pub status:   StatusCode,
    pub message:  String,
    pub trace_id: Option<String>,
}

impl HandlerError {
    /// 500 のエラー
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            trace_id: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::with_status(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }
}

impl From<ApiClientError> for HandlerError {
    fn from(err: ApiClientError) -> Self {
        let status = err.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = match (err.upstream_error(), &err) {
            (Some(upstream), _) => upstream.message,
            (None, ApiClientError::Http { status, .. }) => status
                .canonical_reason()
                .unwrap_or("Upstream Error")
                .to_string(),
            (None, ApiClientError::Timeout { .. }) => "上流 API がタイムアウトしました".to_string(),
            (None, _) => "上流 API の呼び出しに失敗しました".to_string(),
        };
        Self {
            status,
            message,
            trace_id: err.trace_id(),
        }
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let trace_id = self.trace_id.or_else(current_request_id);
        (
            self.status,
            Json(BffResponse::<Value>::error(self.message, trace_id)),
        )
            .into_response()
    }
}

/// 許可メソッドの検査とエラー変換を行うルートを作成する
///
/// `handler` は成功時にレスポンス全体（ステータス、ヘッダー、Cookie）を組み立てる。
pub fn create_handler<S, F, Fut>(allowed_methods: &'static [Method], handler: F) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
    F: Fn(S, Request) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, HandlerError>> + Send + 'static,
{
    any(move |State(state): State<S>, request: Request| {
        let handler = handler.clone();
        async move {
            if !allowed_methods.contains(request.method()) {
                return method_not_allowed(allowed_methods);
            }

            let method = request.method().clone();
            let path = request.uri().path().to_string();
            match handler(state, request).await {
                Ok(response) => response,
                Err(err) => {
                    if err.status.is_server_error() {
                        tracing::error!(
                            error.category = "handler",
                            http.method = %method,
                            http.path = %path,
                            http.status = err.status.as_u16(),
                            error = %err,
                            "リクエストの処理に失敗しました"
                        );
                    } else {
                        tracing::warn!(
                            http.method = %method,
                            http.path = %path,
                            http.status = err.status.as_u16(),
                            error = %err,
                            "リクエストを拒否しました"
                        );
                    }
                    err.into_response()
                }
            }
        }
    })
}

fn method_not_allowed(allowed_methods: &[Method]) -> Response {
    let allow = allowed_methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(BffResponse::<Value>::error("Method Not Allowed", None)),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

/// `token` Cookie から認証ヘッダーを作る（未ログインは 401）
pub fn get_authed_headers(headers: &HeaderMap) -> Result<AuthHeader, HandlerError> {
    Session::from_headers(headers)
        .auth_header()
        .ok_or_else(HandlerError::unauthorized)
}

/// ボディを JSON として読み、検証する
///
/// JSON として不正な場合も検証に失敗した場合も 400。
pub async fn read_json<T>(request: Request) -> Result<T, HandlerError>
where
    T: DeserializeOwned + Validate,
{
    let body: T = read_body(request).await?;
    body.validate()
        .map_err(|e| HandlerError::bad_request(format!("入力内容が不正です: {e}")))?;
    Ok(body)
}

/// ボディを JSON オブジェクトとして読む（中身は解釈しない）
pub async fn read_json_object(request: Request) -> Result<Value, HandlerError> {
    let body: Value = read_body(request).await?;
    if !body.is_object() {
        return Err(HandlerError::bad_request(
            "リクエストボディは JSON オブジェクトである必要があります",
        ));
    }
    Ok(body)
}

async fn read_body<T>(request: Request) -> Result<T, HandlerError>
where
    T: DeserializeOwned,
{
    let bytes = to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| HandlerError::bad_request(format!("リクエストボディを読み取れません: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| HandlerError::bad_request(format!("JSON の形式が不正です: {e}")))
}
