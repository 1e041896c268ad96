//! # BFF アプリケーション構築
//!
//! DI（クライアント・State）の初期化とルーター構築を担当する。
//! `main.rs` は設定読み込みとサーバー起動に集中する。

use std::{sync::Arc, time::Duration};

use axum::{Router, middleware::from_fn};
use evently_shared::observability::{MakeRequestUuidV7, make_request_span};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    client::{ApiClient, ApiClientConfig, AuthApi, AuthApiImpl, EventApi, EventApiImpl},
    config::BffConfig,
    handler::{
        AuthState,
        EventState,
        ReadinessState,
        analytics,
        create_handler,
        dashboard_loader,
        email_exists,
        event_detail,
        event_page_loader,
        event_resource,
        events,
        forgot_password,
        health_check,
        login,
        logout,
        me,
        readiness_check,
        reset_password,
        signup,
        verify_signup,
        wrapper::{GET, GET_POST, GET_PUT_DELETE, POST},
    },
    middleware::store_request_id,
    page::page_route,
};

/// Readiness Check の上流呼び出しのタイムアウト
const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

/// ルーターが依存する外部サービス
///
/// テストではスタブ実装に差し替える。
#[derive(Clone)]
pub struct AppDeps {
    pub auth_api:      Arc<dyn AuthApi>,
    pub event_api:     Arc<dyn EventApi>,
    pub probe:         ApiClient,
    pub is_production: bool,
}

impl AppDeps {
    /// 設定から実クライアントを構築する
    ///
    /// 具象型の `ApiClient` を共有し、各ファサードはトレイトオブジェクトとして保持する。
    pub fn from_config(config: &BffConfig) -> Self {
        let client_config = ApiClientConfig::new(&config.api_base_url)
            .with_timeout(config.api_timeout)
            .with_retries(config.api_retries);
        let api = ApiClient::new(client_config.clone());
        let probe = ApiClient::new(
            client_config
                .with_retries(0)
                .with_timeout(READINESS_TIMEOUT),
        );

        Self {
            auth_api: Arc::new(AuthApiImpl::new(api.clone())),
            event_api: Arc::new(EventApiImpl::new(api)),
            probe,
            is_production: config.is_production,
        }
    }
}

/// State の組み立てとルーター定義を行う
pub fn build_app(deps: AppDeps) -> Router {
    let auth_state = Arc::new(AuthState {
        auth_api:      deps.auth_api,
        is_production: deps.is_production,
    });
    let event_state = Arc::new(EventState {
        event_api: deps.event_api,
    });
    let readiness_state = Arc::new(ReadinessState { probe: deps.probe });

    // ルーター構築
    // 各ルートは create_handler で許可メソッドを限定し、それ以外は 405 を返す
    Router::new()
        .route("/health", create_handler(GET, health_check))
        .merge(
            Router::new()
                .route("/health/ready", create_handler(GET, readiness_check))
                .with_state(readiness_state),
        )
        // 認証 API
        .merge(
            Router::new()
                .route("/api/auth/login", create_handler(POST, login))
                .route("/api/auth/signup", create_handler(POST, signup))
                .route("/api/auth/verify", create_handler(POST, verify_signup))
                .route("/api/auth/logout", create_handler(POST, logout))
                .route(
                    "/api/auth/forgot-password",
                    create_handler(POST, forgot_password),
                )
                .route(
                    "/api/auth/reset-password",
                    create_handler(POST, reset_password),
                )
                .route("/api/auth/email-exists", create_handler(GET, email_exists))
                .route("/api/auth/me", create_handler(GET, me))
                .with_state(auth_state),
        )
        // イベント API
        .merge(
            Router::new()
                .route("/api/events", create_handler(GET_POST, events))
                .route("/api/events/{id}", create_handler(GET_PUT_DELETE, event_detail))
                .route(
                    "/api/events/{id}/{resource}",
                    create_handler(GET, event_resource),
                )
                .route("/api/analytics", create_handler(GET, analytics))
                .with_state(event_state.clone()),
        )
        // ページローダー（/pages を除いたパスがフロントエンドのページパスになる）
        .nest(
            "/pages",
            Router::new()
                .route("/dashboard", page_route(dashboard_loader(event_state.clone())))
                .route("/events/{id}", page_route(event_page_loader(event_state))),
        )
        // Request ID レイヤー（レイヤー順序が重要: 下に書いたものが外側）
        // 1. SetRequestIdLayer（最外）: UUID v7 を生成（またはクライアント提供値を使用）
        // 2. TraceLayer: カスタムスパンに request_id を含める
        // 3. PropagateRequestIdLayer: レスポンスヘッダーに X-Request-Id をコピー
        // 4. store_request_id: task-local に保存し、上流へのヘッダーとエラーの trace_id に使う
        .layer(from_fn(store_request_id))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
}
