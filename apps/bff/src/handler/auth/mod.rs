//! # 認証ハンドラ
//!
//! BFF の認証エンドポイントを提供する。
//!
//! ## エンドポイント
//!
//! - `POST /api/auth/login` - ログイン
//! - `POST /api/auth/signup` - サインアップ
//! - `POST /api/auth/verify` - サインアップのメール確認
//! - `POST /api/auth/logout` - ログアウト
//! - `POST /api/auth/forgot-password` - パスワード再設定メールの送信
//! - `POST /api/auth/reset-password` - パスワード再設定
//! - `GET /api/auth/email-exists` - メールアドレスの登録有無
//! - `GET /api/auth/me` - 現在のユーザー情報を取得
//!
//! トークンはレスポンスボディには含めず、HttpOnly Cookie にのみ書き出す。

mod account;
mod login;
mod session;

use std::sync::Arc;

pub use account::*;
use axum::{
    http::{HeaderValue, header::SET_COOKIE},
    response::Response,
};
pub use login::*;
use serde::{Deserialize, Serialize};
pub use session::*;
use validator::Validate;

use super::wrapper::HandlerError;
use crate::client::AuthApi;

/// 認証ハンドラの共有状態
pub struct AuthState {
    pub auth_api:      Arc<dyn AuthApi>,
    /// 本番環境では Cookie に `Secure` を付与する
    pub is_production: bool,
}

// --- リクエスト/レスポンス型 ---

/// ログインリクエスト
#[derive(Debug, Deserialize, Validate)]
pub struct LoginBody {
    #[validate(email)]
    pub email:    String,
    #[validate(length(min = 1))]
    pub password: String,
    /// ログイン後の遷移先（同一オリジンのパスのみ有効）
    #[serde(default)]
    pub next:     Option<String>,
}

/// ログイン / メール確認成功時のレスポンスデータ
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct SessionStartedData {
    pub redirect_to: String,
}

/// メールアドレス存在確認のクエリ
#[derive(Debug, Deserialize, Validate)]
pub struct EmailExistsQuery {
    #[validate(email)]
    pub email: String,
}

/// メールアドレス存在確認のレスポンスデータ
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct EmailExistsResponseData {
    pub exists: bool,
}

/// レスポンスに `Set-Cookie` ヘッダーを追加する
fn append_cookies(response: &mut Response, cookies: Vec<String>) -> Result<(), HandlerError> {
    for cookie in cookies {
        let value = HeaderValue::from_str(&cookie)
            .map_err(|e| HandlerError::new(format!("Cookie を構築できません: {e}")))?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(())
}
