//! # イベント API クライアント
//!
//! 上流 API のイベント / 分析エンドポイントを呼び出す。
//! すべての呼び出しに呼び出し元ユーザーの Bearer トークンを付与する。
//!
//! ペイロードの形は BFF では解釈せず、`serde_json::Value` のまま中継する。

use async_trait::async_trait;
use evently_shared::ApiEnvelope;
use reqwest::Method;
use serde_json::Value;

use super::{
    api_client::ApiClient,
    error::ApiClientError,
    response::unwrap_envelope,
    types::EventResource,
};
use crate::session::AuthHeader;

/// イベント API クライアントトレイト
#[async_trait]
pub trait EventApi: Send + Sync {
    /// イベント一覧を取得する
    ///
    /// `query` はクエリ文字列（`?` を除く）をそのまま上流へ転送する。
    async fn list_events(
        &self,
        auth: &AuthHeader,
        query: Option<&str>,
    ) -> Result<Value, ApiClientError>;

    async fn get_event(&self, auth: &AuthHeader, id: &str) -> Result<Value, ApiClientError>;

    async fn create_event(&self, auth: &AuthHeader, body: &Value) -> Result<Value, ApiClientError>;

    async fn update_event(
        &self,
        auth: &AuthHeader,
        id: &str,
        body: &Value,
    ) -> Result<Value, ApiClientError>;

    async fn delete_event(&self, auth: &AuthHeader, id: &str) -> Result<Value, ApiClientError>;

    /// イベント配下のリソース（アジェンダ、チーム、参加者）を取得する
    async fn list_event_resource(
        &self,
        auth: &AuthHeader,
        id: &str,
        resource: EventResource,
    ) -> Result<Value, ApiClientError>;

    /// 主催者向けの分析データを取得する
    async fn analytics(&self, auth: &AuthHeader, query: Option<&str>)
    -> Result<Value, ApiClientError>;
}

/// イベント API クライアント実装
#[derive(Debug, Clone)]
pub struct EventApiImpl {
    api: ApiClient,
}

impl EventApiImpl {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// エンベロープを外し、`data: null` は `Value::Null` として返す
    fn unwrap(
        &self,
        envelope: ApiEnvelope<Value>,
        method: Method,
        endpoint: &str,
    ) -> Result<Value, ApiClientError> {
        Ok(unwrap_envelope(envelope, self.api.request_context(method, endpoint))?
            .unwrap_or(Value::Null))
    }
}

fn event_path(id: &str) -> String {
    format!("/events/{}", urlencoding::encode(id))
}

fn with_query(path: &str, query: Option<&str>) -> String {
    match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    }
}

#[async_trait]
impl EventApi for EventApiImpl {
    async fn list_events(
        &self,
        auth: &AuthHeader,
        query: Option<&str>,
    ) -> Result<Value, ApiClientError> {
        let endpoint = with_query("/events", query);
        let envelope = self.api.get(&endpoint, Some(auth.to_header_map())).await?;
        self.unwrap(envelope, Method::GET, &endpoint)
    }

    async fn get_event(&self, auth: &AuthHeader, id: &str) -> Result<Value, ApiClientError> {
        let endpoint = event_path(id);
        let envelope = self.api.get(&endpoint, Some(auth.to_header_map())).await?;
        self.unwrap(envelope, Method::GET, &endpoint)
    }

    async fn create_event(&self, auth: &AuthHeader, body: &Value) -> Result<Value, ApiClientError> {
        let endpoint = "/events";
        let envelope = self
            .api
            .post(endpoint, Some(body), Some(auth.to_header_map()))
            .await?;
        self.unwrap(envelope, Method::POST, endpoint)
    }

    async fn update_event(
        &self,
        auth: &AuthHeader,
        id: &str,
        body: &Value,
    ) -> Result<Value, ApiClientError> {
        let endpoint = event_path(id);
        let envelope = self
            .api
            .put(&endpoint, Some(body), Some(auth.to_header_map()))
            .await?;
        self.unwrap(envelope, Method::PUT, &endpoint)
    }

    async fn delete_event(&self, auth: &AuthHeader, id: &str) -> Result<Value, ApiClientError> {
        let endpoint = event_path(id);
        let envelope = self.api.delete(&endpoint, Some(auth.to_header_map())).await?;
        self.unwrap(envelope, Method::DELETE, &endpoint)
    }

    async fn list_event_resource(
        &self,
        auth: &AuthHeader,
        id: &str,
        resource: EventResource,
    ) -> Result<Value, ApiClientError> {
        let endpoint = format!("{}/{}", event_path(id), resource.as_segment());
        let envelope = self.api.get(&endpoint, Some(auth.to_header_map())).await?;
        self.unwrap(envelope, Method::GET, &endpoint)
    }

    async fn analytics(
        &self,
        auth: &AuthHeader,
        query: Option<&str>,
    ) -> Result<Value, ApiClientError> {
        let endpoint = with_query("/analytics", query);
        let envelope = self.api.get(&endpoint, Some(auth.to_header_map())).await?;
        self.unwrap(envelope, Method::GET, &endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_path_idをパーセントエンコードする() {
        assert_eq!(event_path("e-1"), "/events/e-1");
        assert_eq!(event_path("a/b"), "/events/a%2Fb");
    }

    #[test]
    fn test_with_query_空のクエリは付与しない() {
        assert_eq!(with_query("/events", None), "/events");
        assert_eq!(with_query("/events", Some("")), "/events");
        assert_eq!(with_query("/events", Some("page=2")), "/events?page=2");
    }
}
