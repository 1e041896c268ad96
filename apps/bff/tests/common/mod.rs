//! 統合テスト共通のスタブとヘルパー

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{Router, body::to_bytes, response::Response};
use evently_bff::{
    app_builder::{AppDeps, build_app},
    client::{
        ApiClient,
        ApiClientConfig,
        ApiClientError,
        AuthApi,
        EventApi,
        EventResource,
        ForgotPasswordRequest,
        LoginRequest,
        RequestContext,
        ResetPasswordRequest,
        SignupRequest,
        VerifySignupRequest,
    },
    session::{AuthHeader, SessionTokens},
};
use http::{Method, StatusCode};
use serde_json::{Value, json};
use tokio::net::TcpListener;

/// 接続を受け付けないアドレス（discard ポート）
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

/// ループバックで上流 API のフェイクを起動し、ベース URL を返す
pub async fn spawn_upstream(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// 上流が返す HTTP エラーを組み立てる
pub fn upstream_error(status: StatusCode, message: &str) -> ApiClientError {
    ApiClientError::Http {
        status,
        body: json!({
            "data": null,
            "error": { "code": "E_TEST", "message": message },
            "status_code": status.as_u16(),
            "success": false,
            "trace_id": null
        }),
        context: RequestContext {
            url:    "http://upstream/test".to_string(),
            method: Method::GET,
        },
    }
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

// --- 認証 API スタブ ---

/// 認証 API スタブ
///
/// `login_result` を返し、受け取ったリクエストを記録する。
pub struct StubAuthApi {
    pub login_result: Result<SessionTokens, ApiClientError>,
    pub logins:       Mutex<Vec<String>>,
}

impl StubAuthApi {
    pub fn with_tokens(jwt: &str, refresh: Option<&str>) -> Self {
        Self {
            login_result: Ok(SessionTokens {
                jwt:           jwt.to_string(),
                refresh_token: refresh.map(str::to_string),
            }),
            logins:       Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: ApiClientError) -> Self {
        Self {
            login_result: Err(err),
            logins:       Mutex::new(Vec::new()),
        }
    }

    pub fn login_count(&self) -> usize {
        self.logins.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthApi for StubAuthApi {
    async fn login(&self, req: &LoginRequest) -> Result<SessionTokens, ApiClientError> {
        self.logins.lock().unwrap().push(req.email.clone());
        self.login_result.clone()
    }

    async fn signup(&self, _req: &SignupRequest) -> Result<String, ApiClientError> {
        Ok("確認コードを送信しました".to_string())
    }

    async fn verify_signup(
        &self,
        _req: &VerifySignupRequest,
    ) -> Result<SessionTokens, ApiClientError> {
        self.login_result.clone()
    }

    async fn forgot_password(&self, _req: &ForgotPasswordRequest) -> Result<String, ApiClientError> {
        Ok("送信しました".to_string())
    }

    async fn reset_password(&self, _req: &ResetPasswordRequest) -> Result<String, ApiClientError> {
        Ok("再設定しました".to_string())
    }

    async fn email_exists(&self, email: &str) -> bool {
        email == "taken@example.com"
    }

    async fn me(&self, auth: &AuthHeader) -> Result<Value, ApiClientError> {
        Ok(json!({ "id": "u-1", "token": auth.token() }))
    }
}

// --- イベント API スタブ ---

/// イベント API スタブ
///
/// id が `missing` のイベントは 404、`expired` は 401、`broken` は 500 を返す。
/// `failing` で作ると一覧と分析データの取得が指定ステータスで失敗する。
#[derive(Default)]
pub struct StubEventApi {
    pub calls:        Mutex<Vec<String>>,
    pub list_failure: Option<StatusCode>,
}

impl StubEventApi {
    pub fn failing(status: StatusCode) -> Self {
        Self {
            list_failure: Some(status),
            ..Self::default()
        }
    }

    fn listing(&self, value: Value) -> Result<Value, ApiClientError> {
        match self.list_failure {
            Some(status) => Err(upstream_error(status, "upstream unavailable")),
            None => Ok(value),
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn lookup(id: &str) -> Result<Value, ApiClientError> {
        match id {
            "missing" => Err(upstream_error(StatusCode::NOT_FOUND, "event not found")),
            "expired" => Err(upstream_error(StatusCode::UNAUTHORIZED, "token expired")),
            "broken" => Err(upstream_error(StatusCode::INTERNAL_SERVER_ERROR, "database down")),
            id => Ok(json!({ "id": id, "title": "RustConf" })),
        }
    }
}

#[async_trait]
impl EventApi for StubEventApi {
    async fn list_events(
        &self,
        _auth: &AuthHeader,
        query: Option<&str>,
    ) -> Result<Value, ApiClientError> {
        self.record(format!("list_events:{}", query.unwrap_or("")));
        self.listing(json!([{ "id": "e-1" }]))
    }

    async fn get_event(&self, _auth: &AuthHeader, id: &str) -> Result<Value, ApiClientError> {
        self.record(format!("get_event:{id}"));
        Self::lookup(id)
    }

    async fn create_event(&self, _auth: &AuthHeader, body: &Value) -> Result<Value, ApiClientError> {
        self.record("create_event".to_string());
        let mut created = body.clone();
        created["id"] = json!("e-new");
        Ok(created)
    }

    async fn update_event(
        &self,
        _auth: &AuthHeader,
        id: &str,
        body: &Value,
    ) -> Result<Value, ApiClientError> {
        self.record(format!("update_event:{id}"));
        Self::lookup(id)?;
        Ok(body.clone())
    }

    async fn delete_event(&self, _auth: &AuthHeader, id: &str) -> Result<Value, ApiClientError> {
        self.record(format!("delete_event:{id}"));
        Self::lookup(id)?;
        Ok(Value::Null)
    }

    async fn list_event_resource(
        &self,
        _auth: &AuthHeader,
        id: &str,
        resource: EventResource,
    ) -> Result<Value, ApiClientError> {
        self.record(format!("{}:{id}", resource.as_segment()));
        Ok(json!([]))
    }

    async fn analytics(
        &self,
        _auth: &AuthHeader,
        query: Option<&str>,
    ) -> Result<Value, ApiClientError> {
        self.record(format!("analytics:{}", query.unwrap_or("")));
        self.listing(json!({ "registrations": 12 }))
    }
}

/// スタブで組み立てた BFF ルーター
pub struct TestApp {
    pub router:    Router,
    pub auth_api:  Arc<StubAuthApi>,
    pub event_api: Arc<StubEventApi>,
}

pub fn test_app(auth_api: StubAuthApi) -> TestApp {
    test_app_with_upstream(auth_api, UNREACHABLE_URL)
}

pub fn test_app_with_upstream(auth_api: StubAuthApi, upstream_url: &str) -> TestApp {
    test_app_with(auth_api, StubEventApi::default(), upstream_url)
}

pub fn test_app_with_events(event_api: StubEventApi) -> TestApp {
    test_app_with(
        StubAuthApi::with_tokens("jwt-1", None),
        event_api,
        UNREACHABLE_URL,
    )
}

fn test_app_with(auth_api: StubAuthApi, event_api: StubEventApi, upstream_url: &str) -> TestApp {
    let auth_api = Arc::new(auth_api);
    let event_api = Arc::new(event_api);
    let router = build_app(AppDeps {
        auth_api:      auth_api.clone(),
        event_api:     event_api.clone(),
        probe:         ApiClient::new(ApiClientConfig::new(upstream_url).with_retries(0)),
        is_production: false,
    });
    TestApp {
        router,
        auth_api,
        event_api,
    }
}
