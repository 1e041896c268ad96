//! # Observability 基盤
//!
//! `tracing` の初期化と、受信リクエストごとの Request ID まわりを提供する。
//!
//! ログ形式は `LOG_FORMAT`（`json` / `pretty`）、レベルは `RUST_LOG` で切り替える。

/// Request ID を運ぶ HTTP ヘッダー名
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// `RUST_LOG` 未設定時のフィルタ
pub const DEFAULT_LOG_DIRECTIVE: &str = "info,evently=debug";

/// ログ出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 1 行 1 イベントの JSON（本番向け）
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// 大文字小文字と前後の空白を無視して解釈する
    ///
    /// 解釈できない値は `None`。
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" | "text" => Some(Self::Pretty),
            _ => None,
        }
    }

    /// `LOG_FORMAT` から読み取る
    ///
    /// 未設定は `Pretty`。不正な値は stderr に警告して `Pretty` にする
    /// （subscriber の初期化前なので `tracing` は使えない）。
    pub fn from_env() -> Self {
        let Ok(raw) = std::env::var("LOG_FORMAT") else {
            return Self::default();
        };
        Self::parse(&raw).unwrap_or_else(|| {
            eprintln!("LOG_FORMAT={raw:?} は不明な値のため pretty で出力します");
            Self::default()
        })
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// ルートスパンに付けるサービス名
    pub service_name:      String,
    pub log_format:        LogFormat,
    /// `RUST_LOG` がないときに使う `EnvFilter` ディレクティブ
    pub default_directive: String,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            default_directive: DEFAULT_LOG_DIRECTIVE.to_string(),
        }
    }

    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }

    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }
}

/// グローバル subscriber を登録する
///
/// 戻り値のガードが生きている間、全イベントが `service` フィールド付きの
/// ルートスパンに入る。
#[cfg(feature = "observability")]
pub fn init_tracing(config: TracingConfig) -> tracing::span::EnteredSpan {
    use tracing_subscriber::{EnvFilter, Layer as _, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_directive));

    let output = match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .with(tracing_error::ErrorLayer::default())
        .init();

    tracing::info_span!("app", service = %config.service_name).entered()
}

/// ヘッダーから Request ID を取り出す（空文字は未設定扱い）
#[cfg(feature = "observability")]
pub fn request_id_from_headers(headers: &http::HeaderMap) -> Option<&str> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty())
}

/// UUID v7（時刻順）で Request ID を採番する
#[cfg(feature = "observability")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

#[cfg(feature = "observability")]
impl tower_http::request_id::MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(
        &mut self,
        _request: &http::Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        http::HeaderValue::try_from(uuid::Uuid::now_v7().to_string())
            .ok()
            .map(tower_http::request_id::RequestId::new)
    }
}

/// `TraceLayer` のリクエストスパン
///
/// `SetRequestIdLayer` の内側で呼ばれる前提。
#[cfg(feature = "observability")]
pub fn make_request_span<B>(request: &http::Request<B>) -> tracing::Span {
    tracing::info_span!(
        "request",
        http.method = %request.method(),
        http.path = %request.uri().path(),
        request_id = request_id_from_headers(request.headers()).unwrap_or("-"),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parseは大文字小文字と空白を無視する() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" JSON "), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Pretty));
    }

    #[test]
    fn test_parseは不明な値でnone() {
        assert_eq!(LogFormat::parse("yaml"), None);
        assert_eq!(LogFormat::parse(""), None);
    }

    #[test]
    fn test_既定のフィルタを上書きできる() {
        let config = TracingConfig::new("bff", LogFormat::Json);
        assert_eq!(config.default_directive, DEFAULT_LOG_DIRECTIVE);

        let config = config.with_default_directive("warn");
        assert_eq!(config.default_directive, "warn");
        assert_eq!(config.service_name, "bff");
    }

    #[cfg(feature = "observability")]
    #[test]
    fn test_request_id_from_headers_空文字は未設定() {
        let mut headers = http::HeaderMap::new();
        assert_eq!(request_id_from_headers(&headers), None);

        headers.insert(REQUEST_ID_HEADER, http::HeaderValue::from_static(""));
        assert_eq!(request_id_from_headers(&headers), None);

        headers.insert(REQUEST_ID_HEADER, http::HeaderValue::from_static("req-1"));
        assert_eq!(request_id_from_headers(&headers), Some("req-1"));
    }

    #[cfg(feature = "observability")]
    #[test]
    fn test_採番したidはuuid_v7() {
        use tower_http::request_id::MakeRequestId;

        let request = http::Request::builder().uri("/").body(()).unwrap();
        let id = MakeRequestUuidV7.make_request_id(&request).unwrap();
        let uuid = uuid::Uuid::parse_str(id.header_value().to_str().unwrap()).unwrap();

        assert_eq!(uuid.get_version_num(), 7);
    }
}
