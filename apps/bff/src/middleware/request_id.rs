//! # Request ID の伝播
//!
//! 受信リクエストの `X-Request-Id` を上流 API 呼び出しとエラーレスポンスへ引き継ぐ。
//!
//! 1. `SetRequestIdLayer` が ID を採番（または受信値を採用）する
//! 2. [`store_request_id`] がその ID を task-local に保存する
//! 3. API クライアントは [`inject_request_id`] で上流へのヘッダーに付与し、
//!    ハンドララッパーは [`current_request_id`] をエラーの `trace_id` に使う

use std::future::Future;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use evently_shared::observability::{REQUEST_ID_HEADER, request_id_from_headers};

tokio::task_local! {
    static REQUEST_ID: Option<String>;
}

/// 現在のリクエストの Request ID
///
/// task-local スコープ外、または ID が採番されていない場合は `None`。
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok().flatten()
}

/// 指定した Request ID のスコープで `future` を実行する
pub async fn scope_request_id<F>(request_id: Option<String>, future: F) -> F::Output
where
    F: Future,
{
    REQUEST_ID.scope(request_id, future).await
}

/// `X-Request-Id` を task-local に保存するミドルウェア
///
/// `SetRequestIdLayer` より内側に置く。
pub async fn store_request_id(request: Request<Body>, next: Next) -> Response {
    let request_id = request_id_from_headers(request.headers()).map(str::to_string);

    scope_request_id(request_id, next.run(request)).await
}

/// 上流へのヘッダーに `X-Request-Id` を設定する
///
/// 呼び出し単位で明示的に指定されている場合は上書きしない。
pub fn inject_request_id(headers: &mut HeaderMap) {
    let name = HeaderName::from_static(REQUEST_ID_HEADER);
    if headers.contains_key(&name) {
        return;
    }
    if let Some(value) = current_request_id().and_then(|id| HeaderValue::from_str(&id).ok()) {
        headers.insert(name, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_request_id_スコープ外でnoneを返す() {
        assert_eq!(current_request_id(), None);
    }

    #[tokio::test]
    async fn test_inject_request_id_スコープ内でヘッダーを付与する() {
        let headers = scope_request_id(Some("req-456".to_string()), async {
            let mut headers = HeaderMap::new();
            inject_request_id(&mut headers);
            headers
        })
        .await;

        assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), "req-456");
    }

    #[tokio::test]
    async fn test_inject_request_id_明示的なヘッダーを上書きしない() {
        let headers = scope_request_id(Some("req-456".to_string()), async {
            let mut headers = HeaderMap::new();
            headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("explicit"));
            inject_request_id(&mut headers);
            headers
        })
        .await;

        assert_eq!(headers.get(REQUEST_ID_HEADER).unwrap(), "explicit");
    }

    #[tokio::test]
    async fn test_inject_request_id_id未設定なら何もしない() {
        let headers = scope_request_id(None, async {
            let mut headers = HeaderMap::new();
            inject_request_id(&mut headers);
            headers
        })
        .await;

        assert!(headers.is_empty());
    }
}
