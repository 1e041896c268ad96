//! # 汎用 API クライアント
//!
//! BFF から上流 REST API への HTTP 呼び出しを一手に担う。
//!
//! ## リクエストの流れ
//!
//! 1. `base_url + endpoint` で URL を組み立てる
//! 2. `0..=retries` の試行ごとに、既定ヘッダー → Bearer トークン → 呼び出し単位の
//!    ヘッダーの順にマージし（後勝ち）、受信リクエストの `X-Request-Id` を付けて送信する
//! 3. ボディは一度だけ読み、空なら `null`、それ以外は JSON としてパースする
//! 4. 非 2xx は [`ApiClientError::Http`] にしてエラーコールバックを呼ぶ
//! 5. 失敗した試行は `retry_base_delay * 2^attempt` 待ってから再試行する
//!
//! タイムアウトは呼び出し全体（リトライ込み）に対する 1 つの期限で、
//! 期限に達した時点で [`ApiClientError::Timeout`] として即座に打ち切る。
//! タイムアウトはリトライしない。
//!
//! ステータスコードや HTTP メソッドによるリトライ除外は行わない。

use std::{fmt, marker::PhantomData, sync::Arc, time::Duration};

use reqwest::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use validator::Validate;

use super::error::{ApiClientError, RequestContext};
use crate::{middleware::request_id::inject_request_id, session::AuthHeader};

/// 既定のタイムアウト
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(8000);

/// 既定のリトライ回数
pub const DEFAULT_RETRIES: u32 = 1;

/// 既定のバックオフ基準値
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(300);

/// HTTP エラー発生時に呼ばれるコールバック
pub type ErrorCallback = Arc<dyn Fn(&ApiClientError, &RequestContext) + Send + Sync>;

/// `attempt` 回目（0 始まり）の失敗後に待つ時間
///
/// `base * 2^attempt`。オーバーフローする場合は飽和させる。
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// API クライアント設定
#[derive(Clone)]
pub struct ApiClientConfig {
    base_url:         String,
    default_headers:  HeaderMap,
    timeout:          Duration,
    retries:          u32,
    retry_base_delay: Duration,
    token:            Option<AuthHeader>,
    on_error:         Option<ErrorCallback>,
}

impl ApiClientConfig {
    /// 既定値で設定を作成する
    ///
    /// `base_url` の末尾のスラッシュは取り除く。
    pub fn new(base_url: &str) -> Self {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_headers,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
            token: None,
            on_error: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// すべてのリクエストに付与する Bearer トークン
    pub fn with_token(mut self, token: AuthHeader) -> Self {
        self.token = Some(token);
        self
    }

    /// 既定ヘッダーを追加（同名は置き換え）する
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn with_on_error(mut self, on_error: ErrorCallback) -> Self {
        self.on_error = Some(on_error);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// 初回を含む最大試行回数（`u32::MAX` で飽和する）
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl fmt::Debug for ApiClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("token", &self.token)
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

/// レスポンスを検証しながら型に変換するスキーマ
pub trait ResponseSchema<T> {
    fn parse(&self, value: &Value) -> Result<T, String>;
}

/// serde でデシリアライズした後に `validator` で検証するスキーマ
pub struct Validated<T>(PhantomData<fn() -> T>);

impl<T> Validated<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for Validated<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ResponseSchema<T> for Validated<T>
where
    T: DeserializeOwned + Validate,
{
    fn parse(&self, value: &Value) -> Result<T, String> {
        let parsed: T = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
        parsed.validate().map_err(|e| e.to_string())?;
        Ok(parsed)
    }
}

/// 任意のクロージャをスキーマとして使うためのラッパー
pub struct FnSchema<F>(pub F);

impl<T, F> ResponseSchema<T> for FnSchema<F>
where
    F: Fn(&Value) -> Result<T, String>,
{
    fn parse(&self, value: &Value) -> Result<T, String> {
        (self.0)(value)
    }
}

/// 汎用 API クライアント
///
/// 内部の `reqwest::Client` は接続プールを共有するため、clone は安価。
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: ApiClientConfig,
    http:   reqwest::Client,
}

impl ApiClient {
    pub fn new(config: ApiClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// エンドポイントの完全な URL
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.base_url, endpoint)
    }

    /// エラー報告用のリクエスト情報
    pub fn request_context(&self, method: Method, endpoint: &str) -> RequestContext {
        RequestContext {
            url: self.url(endpoint),
            method,
        }
    }

    pub async fn get<T>(&self, endpoint: &str, headers: Option<HeaderMap>) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::GET, endpoint, None, headers).await
    }

    pub async fn post<B, T>(
        &self,
        endpoint: &str,
        body: Option<&B>,
        headers: Option<HeaderMap>,
    ) -> Result<T, ApiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.request(Method::POST, endpoint, body, headers).await
    }

    pub async fn put<B, T>(
        &self,
        endpoint: &str,
        body: Option<&B>,
        headers: Option<HeaderMap>,
    ) -> Result<T, ApiClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = encode_body(body)?;
        self.request(Method::PUT, endpoint, body, headers).await
    }

    pub async fn delete<T>(
        &self,
        endpoint: &str,
        headers: Option<HeaderMap>,
    ) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        self.request(Method::DELETE, endpoint, None, headers).await
    }

    /// POST してレスポンスをスキーマで検証する
    ///
    /// スキーマ不一致は [`ApiClientError::Validation`]（リトライしない）。
    pub async fn safe_post<B, T, S>(
        &self,
        endpoint: &str,
        body: &B,
        headers: Option<HeaderMap>,
        schema: &S,
    ) -> Result<T, ApiClientError>
    where
        B: Serialize + ?Sized,
        S: ResponseSchema<T>,
    {
        let value: Value = self.post(endpoint, Some(body), headers).await?;
        schema.parse(&value).map_err(ApiClientError::Validation)
    }

    async fn request<T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
        headers: Option<HeaderMap>,
    ) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        let context = self.request_context(method, endpoint);

        let attempts = self.attempt_all(&context, body.as_ref(), headers.as_ref());
        let value = match tokio::time::timeout(self.config.timeout, attempts).await {
            Ok(result) => result?,
            Err(_) => {
                tracing::warn!(
                    http.method = %context.method,
                    http.url = %context.url,
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "上流 API 呼び出しがタイムアウトしました"
                );
                return Err(ApiClientError::Timeout {
                    timeout: self.config.timeout,
                    context,
                });
            }
        };

        serde_json::from_value(value).map_err(|e| ApiClientError::Decode(e.to_string()))
    }

    async fn attempt_all(
        &self,
        context: &RequestContext,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<Value, ApiClientError> {
        let mut attempt: u32 = 0;
        loop {
            match self.send_once(context, body, headers).await {
                Ok(value) => {
                    if attempt > 0 {
                        tracing::info!(
                            http.method = %context.method,
                            http.url = %context.url,
                            attempt = attempt.saturating_add(1),
                            "リトライ後に成功しました"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_cancellation() && attempt < self.config.retries => {
                    let delay = backoff_delay(self.config.retry_base_delay, attempt);
                    tracing::warn!(
                        http.method = %context.method,
                        http.url = %context.url,
                        attempt = attempt.saturating_add(1),
                        max_attempts = self.config.max_attempts(),
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "上流 API 呼び出しに失敗したためリトライします"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(
                        error.category = "external_service",
                        error.kind = "upstream_api",
                        http.method = %context.method,
                        http.url = %context.url,
                        attempt = attempt.saturating_add(1),
                        error = %err,
                        "上流 API 呼び出しに失敗しました"
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn send_once(
        &self,
        context: &RequestContext,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<Value, ApiClientError> {
        let mut merged = self.merged_headers(headers);
        inject_request_id(&mut merged);
        let mut builder = self
            .http
            .request(context.method.clone(), &context.url)
            .headers(merged);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(e, context))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, context))?;

        let parsed = if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(&text)
        };

        if !status.is_success() {
            // エラー時はボディが JSON でなくてもステータスを優先して保持する
            let err = ApiClientError::Http {
                status,
                body: parsed.unwrap_or(Value::String(text)),
                context: context.clone(),
            };
            if let Some(on_error) = &self.config.on_error {
                on_error(&err, context);
            }
            return Err(err);
        }

        parsed.map_err(|e| ApiClientError::InvalidJson {
            message: e.to_string(),
            context: context.clone(),
        })
    }

    /// 既定ヘッダー → Bearer トークン → 呼び出し単位のヘッダーの順にマージする
    fn merged_headers(&self, overrides: Option<&HeaderMap>) -> HeaderMap {
        let mut merged = self.config.default_headers.clone();
        if let Some(token) = &self.config.token {
            merged.insert(AUTHORIZATION, token.header_value().clone());
        }
        if let Some(overrides) = overrides {
            for name in overrides.keys() {
                merged.remove(name);
            }
            for (name, value) in overrides {
                merged.append(name.clone(), value.clone());
            }
        }
        merged
    }

    fn transport_error(&self, err: reqwest::Error, context: &RequestContext) -> ApiClientError {
        if err.is_timeout() {
            ApiClientError::Timeout {
                timeout: self.config.timeout,
                context: context.clone(),
            }
        } else {
            ApiClientError::Network {
                message: err.to_string(),
                context: context.clone(),
            }
        }
    }
}

fn encode_body<B>(body: Option<&B>) -> Result<Option<Value>, ApiClientError>
where
    B: Serialize + ?Sized,
{
    body.map(serde_json::to_value)
        .transpose()
        .map_err(|e| ApiClientError::Encode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_backoff_delayは指数的に増加する() {
        let base = DEFAULT_RETRY_BASE_DELAY;

        assert_eq!(backoff_delay(base, 0), Duration::from_millis(300));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(600));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(1200));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(2400));
    }

    #[test]
    fn test_backoff_delayは狭義単調増加() {
        let delays: Vec<_> = (0..8)
            .map(|attempt| backoff_delay(DEFAULT_RETRY_BASE_DELAY, attempt))
            .collect();

        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_backoff_delayは大きなattemptで飽和する() {
        assert_eq!(
            backoff_delay(Duration::from_secs(1), 64),
            Duration::from_secs(1).saturating_mul(u32::MAX)
        );
    }

    #[test]
    fn test_configの既定値() {
        let config = ApiClientConfig::new("http://upstream/api/");

        assert_eq!(config.base_url(), "http://upstream/api");
        assert_eq!(config.timeout(), Duration::from_millis(8000));
        assert_eq!(config.retries(), 1);
        assert_eq!(
            config.default_headers.get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[rstest]
    #[case(0, 1)]
    #[case(2, 3)]
    #[case(u32::MAX, u32::MAX)]
    fn test_max_attemptsはリトライ回数に初回を足して飽和する(
        #[case] retries: u32,
        #[case] expected: u32,
    ) {
        let config = ApiClientConfig::new("http://upstream").with_retries(retries);

        assert_eq!(config.max_attempts(), expected);
    }

    #[test]
    fn test_urlはbase_urlとendpointを連結する() {
        let client = ApiClient::new(ApiClientConfig::new("http://upstream/api/"));

        assert_eq!(client.url("/events"), "http://upstream/api/events");
    }

    #[test]
    fn test_merged_headers_呼び出し単位のヘッダーが優先される() {
        let config = ApiClientConfig::new("http://upstream")
            .with_token(AuthHeader::bearer("default").unwrap())
            .with_header(
                HeaderName::from_static("x-client"),
                HeaderValue::from_static("bff"),
            );
        let client = ApiClient::new(config);
        let overrides = AuthHeader::bearer("per-call").unwrap().to_header_map();

        let merged = client.merged_headers(Some(&overrides));

        assert_eq!(merged.get(AUTHORIZATION).unwrap(), "Bearer per-call");
        assert_eq!(merged.get("x-client").unwrap(), "bff");
        assert_eq!(merged.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(merged.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[test]
    fn test_merged_headers_トークン設定時にbearerを付与する() {
        let config =
            ApiClientConfig::new("http://upstream").with_token(AuthHeader::bearer("t").unwrap());
        let client = ApiClient::new(config);

        assert_eq!(
            client.merged_headers(None).get(AUTHORIZATION).unwrap(),
            "Bearer t"
        );
    }

    #[test]
    fn test_validated_不一致でエラーを返す() {
        #[derive(Debug, serde::Deserialize, Validate)]
        struct Created {
            #[validate(length(min = 1))]
            id: String,
        }

        let schema = Validated::<Created>::new();

        assert!(schema.parse(&serde_json::json!({ "id": "e-1" })).is_ok());
        assert!(schema.parse(&serde_json::json!({ "id": "" })).is_err());
        assert!(schema.parse(&serde_json::json!({ "name": "x" })).is_err());
    }

    #[test]
    fn test_fn_schema_クロージャで検証する() {
        let schema = FnSchema(|v: &Value| v.as_u64().ok_or_else(|| "not a number".to_string()));

        assert_eq!(schema.parse(&serde_json::json!(3)), Ok(3));
        assert!(schema.parse(&serde_json::json!("x")).is_err());
    }
}
