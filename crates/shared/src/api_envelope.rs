//! # 上流 API レスポンスエンベロープ
//!
//! 上流 REST API が返す統一レスポンス形式を表す。
//!
//! ```json
//! {
//!   "data": { ... } | null,
//!   "error": { "code": "...", "message": "...", "scope": "..." } | null,
//!   "status_code": 200,
//!   "success": true,
//!   "trace_id": "..."
//! }
//! ```
//!
//! ワイヤ上は `data` と `error` がどちらも nullable だが、呼び出し側では
//! [`ApiEnvelope::into_result`] で成功 / 失敗のどちらか一方に畳み込んで扱う。

use serde::{Deserialize, Serialize};

/// 上流 API のエラーオブジェクト
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamError {
    #[serde(default)]
    pub code:    String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope:   Option<String>,
}

/// 上流 API の統一レスポンス型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data:        Option<T>,
    pub error:       Option<UpstreamError>,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub success:     bool,
    pub trace_id:    Option<String>,
}

/// エンベロープが失敗を示していた場合の内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeFailure {
    pub error:       UpstreamError,
    pub status_code: u16,
    pub trace_id:    Option<String>,
}

impl<T> ApiEnvelope<T> {
    /// 成功エンベロープを作成する
    pub fn ok(data: T) -> Self {
        Self {
            data:        Some(data),
            error:       None,
            status_code: 200,
            success:     true,
            trace_id:    None,
        }
    }

    /// 失敗エンベロープを作成する
    pub fn failure(status_code: u16, error: UpstreamError) -> Self {
        Self {
            data: None,
            error: Some(error),
            status_code,
            success: false,
            trace_id: None,
        }
    }

    /// トレース ID を付与する
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// 成功なら `data`、失敗なら `EnvelopeFailure` を返す
    ///
    /// `success: false` または `error` が存在する場合を失敗とみなす。
    /// `success: false` で `error` が欠落しているときは汎用メッセージを補う。
    /// 成功時の `data` は `null` を許容する（DELETE 等）。
    pub fn into_result(self) -> Result<Option<T>, EnvelopeFailure> {
        match (self.success, self.error) {
            (true, None) => Ok(self.data),
            (_, Some(error)) => Err(EnvelopeFailure {
                error,
                status_code: self.status_code,
                trace_id: self.trace_id,
            }),
            (false, None) => Err(EnvelopeFailure {
                error:       UpstreamError {
                    code:    "unknown".to_string(),
                    message: "upstream reported failure without error details".to_string(),
                    scope:   None,
                },
                status_code: self.status_code,
                trace_id:    self.trace_id,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_成功エンベロープをデシリアライズする() {
        let json = json!({
            "data": { "jwt": "abc" },
            "error": null,
            "status_code": 200,
            "success": true,
            "trace_id": "t-1"
        });

        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_value(json).unwrap();

        assert!(envelope.success);
        assert_eq!(envelope.trace_id.as_deref(), Some("t-1"));
        assert_eq!(envelope.into_result().unwrap(), Some(json!({ "jwt": "abc" })));
    }

    #[test]
    fn test_エラー付きエンベロープは失敗になる() {
        let json = json!({
            "data": null,
            "error": { "code": "E_AUTH", "message": "invalid credentials", "scope": "auth" },
            "status_code": 401,
            "success": false,
            "trace_id": "t-2"
        });

        let envelope: ApiEnvelope<serde_json::Value> = serde_json::from_value(json).unwrap();
        let failure = envelope.into_result().unwrap_err();

        assert_eq!(failure.status_code, 401);
        assert_eq!(failure.error.code, "E_AUTH");
        assert_eq!(failure.error.message, "invalid credentials");
        assert_eq!(failure.error.scope.as_deref(), Some("auth"));
        assert_eq!(failure.trace_id.as_deref(), Some("t-2"));
    }

    #[test]
    fn test_successがfalseでerror欠落でも失敗になる() {
        let envelope: ApiEnvelope<i32> =
            serde_json::from_value(json!({ "success": false, "status_code": 502 })).unwrap();

        let failure = envelope.into_result().unwrap_err();

        assert_eq!(failure.status_code, 502);
        assert_eq!(failure.error.code, "unknown");
    }

    #[test]
    fn test_成功でdataがnullのときnoneを返す() {
        let envelope: ApiEnvelope<i32> =
            serde_json::from_value(json!({ "data": null, "success": true })).unwrap();

        assert_eq!(envelope.into_result().unwrap(), None);
    }

    #[test]
    fn test_okコンストラクタのserialize結果() {
        let json = serde_json::to_value(ApiEnvelope::ok("hello").with_trace_id("t-3")).unwrap();

        assert_eq!(
            json,
            json!({
                "data": "hello",
                "error": null,
                "status_code": 200,
                "success": true,
                "trace_id": "t-3"
            })
        );
    }
}
