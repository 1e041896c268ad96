//! # ヘルスチェックハンドラ
//!
//! BFF の稼働状態を確認するためのエンドポイント。
//!
//! - `/health`: Liveness Check（常に `"healthy"` を返す）
//! - `/health/ready`: Readiness Check（上流 API の疎通を確認）
//!
//! レスポンス型は [`evently_shared::HealthResponse`] / [`evently_shared::ReadinessResponse`] を参照。

use std::sync::Arc;

use axum::{
    Json,
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use evently_shared::{CheckStatus, HealthResponse, ReadinessResponse};
use serde_json::Value;

use super::wrapper::HandlerError;
use crate::client::ApiClient;

/// 上流 API のヘルスチェックエンドポイント
const UPSTREAM_HEALTH_ENDPOINT: &str = "/health";

/// BFF のヘルスチェックエンドポイント
pub async fn health_check<S>(_state: S, _request: Request) -> Result<Response, HandlerError> {
    Ok(Json(HealthResponse::healthy(env!("CARGO_PKG_VERSION"))).into_response())
}

/// Readiness Check 用の State
pub struct ReadinessState {
    /// リトライなし・短いタイムアウトで構成したクライアント
    pub probe: ApiClient,
}

/// BFF の Readiness Check エンドポイント
///
/// 全チェック OK → 200、1 つでも失敗 → 503。
#[tracing::instrument(skip_all)]
pub async fn readiness_check(
    state: Arc<ReadinessState>,
    _request: Request,
) -> Result<Response, HandlerError> {
    let readiness =
        ReadinessResponse::from_checks([("upstream_api", check_upstream(&state.probe).await)]);
    let status = if readiness.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Ok((status, Json(readiness)).into_response())
}

async fn check_upstream(probe: &ApiClient) -> CheckStatus {
    let result = probe.get::<Value>(UPSTREAM_HEALTH_ENDPOINT, None).await;
    if let Err(e) = &result {
        tracing::warn!(error = %e, "上流 API の疎通確認に失敗しました");
    }
    CheckStatus::from_reachable(result.is_ok())
}
