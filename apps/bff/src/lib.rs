//! # BFF (Backend for Frontend) ライブラリ
//!
//! フロントエンド専用の API サーバーのコアモジュール。
//!
//! ## モジュール構成
//!
//! - `app_builder`: State の組み立てとルーター定義
//! - `client`: 上流 REST API クライアント
//! - `config`: 環境変数からの設定読み込み
//! - `cookie`: `Set-Cookie` / `Cookie` ヘッダーのコーデック
//! - `handler`: HTTP ハンドラとハンドララッパー
//! - `middleware`: ミドルウェア（Request ID の伝播）
//! - `page`: 認証ガード付きのページローダー
//! - `session`: Cookie から読み取るリクエストスコープのセッション

pub mod app_builder;
pub mod client;
pub mod config;
pub mod cookie;
pub mod handler;
pub mod middleware;
pub mod page;
pub mod session;
