//! # evently-bff
//!
//! イベント管理画面のための BFF。ブラウザからは Cookie だけが見え、
//! 上流 REST API の Bearer トークンはこのプロセスの中でだけ扱う。
//!
//! ```text
//! Browser ──(Cookie)──▶ evently-bff ──(Authorization: Bearer)──▶ Upstream API
//! ```
//!
//! 上流呼び出しのタイムアウトとリトライ、Request ID の引き継ぎ、
//! `{ success, data?, error?, trace_id? }` 形式への変換、
//! 認証ガード付きページローダーをここで受け持つ。
//!
//! ## 環境変数
//!
//! | 名前 | 必須 | 既定値 / 意味 |
//! |------|------|---------------|
//! | `BFF_PORT` | ✓ | 待ち受けポート |
//! | `API_BASE_URL` | ✓ | 上流 API のベース URL |
//! | `BFF_HOST` | | `0.0.0.0` |
//! | `API_TIMEOUT_MS` | | `8000`（リトライを含む呼び出し全体） |
//! | `API_RETRIES` | | `1` |
//! | `ENV` | | `production` なら Cookie に `Secure` |
//! | `LOG_FORMAT` | | `pretty`（`json` で構造化ログ） |
//!
//! ローカルでは `.env` を置いて `cargo run -p evently-bff` で起動する。

use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::Context;
use evently_bff::{
    app_builder::{AppDeps, build_app},
    config::BffConfig,
};
use evently_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env は任意（本番は環境変数を直接渡す）
    dotenvy::dotenv().ok();

    let _app_span = init_tracing(TracingConfig::from_env("bff"));

    let config = BffConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        api_base_url = %config.api_base_url,
        api_timeout_ms = config.api_timeout.as_millis() as u64,
        api_retries = config.api_retries,
        is_production = config.is_production,
        "設定を読み込みました"
    );

    let app = build_app(AppDeps::from_config(&config));

    let addr: SocketAddr = (config.host.as_str(), config.port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .context("バインドアドレスが不正です")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("{addr} にバインドできません"))?;
    tracing::info!(%addr, "リクエストの受け付けを開始しました");

    axum::serve(listener, app).await.context("サーバーが異常終了しました")?;

    Ok(())
}
