//! API クライアントのエラー型

use std::{fmt, time::Duration};

use evently_shared::{EnvelopeFailure, UpstreamError};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;

/// エラーが発生したリクエストの情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub url:    String,
    pub method: Method,
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// API クライアントエラー
///
/// 通信失敗もタイムアウトも非 2xx も同じ型で表す。
/// 呼び出し側は [`ApiClientError::status`] で区別する。
#[derive(Debug, Clone, Error)]
pub enum ApiClientError {
    /// 非 2xx レスポンス
    #[error("上流 API がステータス {status} を返しました: {context}")]
    Http {
        status:  StatusCode,
        /// パース済みレスポンスボディ（空なら `null`）
        body:    Value,
        context: RequestContext,
    },

    /// ネットワークエラー
    #[error("ネットワークエラー: {message} ({context})")]
    Network {
        message: String,
        context: RequestContext,
    },

    /// 成功レスポンスのボディが JSON ではない
    #[error("レスポンスが JSON ではありません: {message} ({context})")]
    InvalidJson {
        message: String,
        context: RequestContext,
    },

    /// タイムアウトによる打ち切り（リトライしない）
    #[error("タイムアウトしました（{}ms）: {context}", .timeout.as_millis())]
    Timeout {
        timeout: Duration,
        context: RequestContext,
    },

    /// リクエストボディを JSON にできない
    #[error("リクエストボディのシリアライズに失敗しました: {0}")]
    Encode(String),

    /// レスポンスを期待する型に変換できない
    #[error("レスポンスの型が一致しません: {0}")]
    Decode(String),

    /// `safe_post` のスキーマ検証に失敗した
    #[error("レスポンスがスキーマに一致しません: {0}")]
    Validation(String),
}

impl ApiClientError {
    /// 上流エンベロープの失敗を HTTP エラーとして表す
    ///
    /// エンベロープの `status_code` が不正（0 等）の場合は 502 とみなす。
    pub fn from_envelope(failure: EnvelopeFailure, context: RequestContext) -> Self {
        let status = StatusCode::from_u16(failure.status_code)
            .ok()
            .filter(|s| !s.is_success() && !s.is_informational())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let body = serde_json::json!({
            "error": failure.error,
            "trace_id": failure.trace_id,
            "status_code": status.as_u16(),
            "success": false,
        });
        Self::Http {
            status,
            body,
            context,
        }
    }

    /// HTTP ステータス（`Http` の場合のみ）
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// キャンセル（タイムアウト）によるエラーかどうか
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// リクエスト情報
    pub fn context(&self) -> Option<&RequestContext> {
        match self {
            Self::Http { context, .. }
            | Self::Network { context, .. }
            | Self::InvalidJson { context, .. }
            | Self::Timeout { context, .. } => Some(context),
            Self::Encode(_) | Self::Decode(_) | Self::Validation(_) => None,
        }
    }

    /// 上流エンベロープの `error` オブジェクト
    pub fn upstream_error(&self) -> Option<UpstreamError> {
        match self {
            Self::Http { body, .. } => body
                .get("error")
                .and_then(|e| serde_json::from_value(e.clone()).ok()),
            _ => None,
        }
    }

    /// 上流エンベロープの `trace_id`
    pub fn trace_id(&self) -> Option<String> {
        match self {
            Self::Http { body, .. } => body
                .get("trace_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        }
    }
}
