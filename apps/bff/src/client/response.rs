//! 上流エンベロープの共通ハンドリング

use evently_shared::ApiEnvelope;
use serde_json::Value;
use validator::Validate;

use super::{
    error::{ApiClientError, RequestContext},
    types::MessageData,
};
use crate::session::SessionTokens;

/// エンベロープを `data` に畳み込む
///
/// 2xx で返ってきても `success: false` なら [`ApiClientError::Http`] にする。
pub(super) fn unwrap_envelope<T>(
    envelope: ApiEnvelope<T>,
    context: RequestContext,
) -> Result<Option<T>, ApiClientError> {
    envelope
        .into_result()
        .map_err(|failure| ApiClientError::from_envelope(failure, context))
}

/// `data` が必須のエンベロープを畳み込む
pub(super) fn require_data<T>(
    envelope: ApiEnvelope<T>,
    context: RequestContext,
) -> Result<T, ApiClientError> {
    unwrap_envelope(envelope, context.clone())?
        .ok_or_else(|| ApiClientError::Decode(format!("data が空です: {context}")))
}

/// `data.message` を取り出す（欠落時は `fallback`）
pub(super) fn message_or(
    envelope: ApiEnvelope<MessageData>,
    context: RequestContext,
    fallback: &str,
) -> Result<String, ApiClientError> {
    Ok(unwrap_envelope(envelope, context)?
        .map(|data| data.message)
        .unwrap_or_else(|| fallback.to_string()))
}

/// トークンを返すエンドポイント用のスキーマ
///
/// 成功エンベロープの場合のみ、空でない `jwt` を持つことを検証する。
pub(super) fn session_envelope(value: &Value) -> Result<ApiEnvelope<SessionTokens>, String> {
    let envelope: ApiEnvelope<SessionTokens> =
        serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    if envelope.success && envelope.error.is_none() {
        let tokens = envelope
            .data
            .as_ref()
            .ok_or_else(|| "トークンが含まれていません".to_string())?;
        tokens.validate().map_err(|e| e.to_string())?;
    }
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use evently_shared::UpstreamError;
    use reqwest::{Method, StatusCode};
    use serde_json::json;

    use super::*;

    fn context() -> RequestContext {
        RequestContext {
            url:    "http://upstream/auth/login".to_string(),
            method: Method::POST,
        }
    }

    #[test]
    fn test_unwrap_envelope_成功時はdataを返す() {
        let result = unwrap_envelope(ApiEnvelope::ok(7), context()).unwrap();

        assert_eq!(result, Some(7));
    }

    #[test]
    fn test_unwrap_envelope_失敗エンベロープはhttpエラーになる() {
        let envelope = ApiEnvelope::<()>::failure(
            409,
            UpstreamError {
                code:    "E_DUP".to_string(),
                message: "duplicate".to_string(),
                scope:   None,
            },
        )
        .with_trace_id("t-9");

        let err = unwrap_envelope(envelope, context()).unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert_eq!(err.trace_id().as_deref(), Some("t-9"));
    }

    #[test]
    fn test_require_data_dataなしはdecodeエラー() {
        let envelope = ApiEnvelope::<i32> {
            data:        None,
            error:       None,
            status_code: 200,
            success:     true,
            trace_id:    None,
        };

        let err = require_data(envelope, context()).unwrap_err();

        assert!(matches!(err, ApiClientError::Decode(_)));
    }

    #[test]
    fn test_message_or_messageがなければfallback() {
        let envelope = ApiEnvelope::<MessageData> {
            data:        None,
            error:       None,
            status_code: 200,
            success:     true,
            trace_id:    None,
        };

        assert_eq!(message_or(envelope, context(), "ok").unwrap(), "ok");
    }

    #[test]
    fn test_session_envelope_空のjwtを拒否する() {
        let value = json!({
            "data": { "jwt": "" },
            "error": null,
            "status_code": 200,
            "success": true
        });

        assert!(session_envelope(&value).is_err());
    }

    #[test]
    fn test_session_envelope_失敗エンベロープはそのまま通す() {
        let value = json!({
            "data": null,
            "error": { "code": "E_AUTH", "message": "invalid credentials" },
            "status_code": 401,
            "success": false
        });

        let envelope = session_envelope(&value).unwrap();

        assert!(!envelope.success);
        assert!(envelope.error.is_some());
    }
}
