//! # BFF レスポンスエンベロープ
//!
//! BFF がブラウザへ返す統一レスポンス形式
//! `{ "success": bool, "message"?: string, "data"?: T, "error"?: string, "trace_id"?: string }`
//! を提供する。
//!
//! - 値が `None` のフィールドはシリアライズしない
//! - axum の `IntoResponse` 変換は BFF 側の責務（shared に axum 依存を入れない）

use serde::{Deserialize, Serialize};

/// BFF の統一レスポンス型
///
/// ## 使用例
///
/// ```
/// use evently_shared::BffResponse;
///
/// let response = BffResponse::data(42);
/// assert!(response.success);
/// assert_eq!(response.data, Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BffResponse<T = serde_json::Value> {
    pub success:  bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message:  Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data:     Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error:    Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl<T> BffResponse<T> {
    /// データ付きの成功レスポンス
    pub fn data(data: T) -> Self {
        Self {
            success:  true,
            message:  None,
            data:     Some(data),
            error:    None,
            trace_id: None,
        }
    }

    /// メッセージのみの成功レスポンス
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success:  true,
            message:  Some(message.into()),
            data:     None,
            error:    None,
            trace_id: None,
        }
    }

    /// 失敗レスポンス
    pub fn error(error: impl Into<String>, trace_id: Option<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
            trace_id,
        }
    }

    /// メッセージを付与する
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_dataのserialize結果() {
        let json = serde_json::to_value(BffResponse::data(json!({ "id": 1 }))).unwrap();

        assert_eq!(json, json!({ "success": true, "data": { "id": 1 } }));
    }

    #[test]
    fn test_messageのserialize結果() {
        let json = serde_json::to_value(BffResponse::<()>::message("ok")).unwrap();

        assert_eq!(json, json!({ "success": true, "message": "ok" }));
    }

    #[test]
    fn test_errorはtrace_idなしでフィールドを省略する() {
        let json =
            serde_json::to_value(BffResponse::<()>::error("Method Not Allowed", None)).unwrap();

        assert_eq!(json, json!({ "success": false, "error": "Method Not Allowed" }));
    }

    #[test]
    fn test_errorはtrace_idありで含める() {
        let json =
            serde_json::to_value(BffResponse::<()>::error("boom", Some("t-9".to_string())))
                .unwrap();

        assert_eq!(
            json,
            json!({ "success": false, "error": "boom", "trace_id": "t-9" })
        );
    }

    #[test]
    fn test_with_messageでdataとmessageを両方持つ() {
        let response = BffResponse::data("x").with_message("done");

        assert_eq!(response.message.as_deref(), Some("done"));
        assert_eq!(response.data, Some("x"));
    }
}
