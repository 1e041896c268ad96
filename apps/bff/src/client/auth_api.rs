//! # 認証 API クライアント
//!
//! 上流 API の認証系エンドポイントを呼び出す。
//!
//! ## エンドポイント
//!
//! - `POST /auth/login` - ログイン
//! - `POST /auth/signup` - サインアップ
//! - `POST /auth/verify` - サインアップのメール確認
//! - `POST /auth/forgot-password` - パスワード再設定メールの送信
//! - `POST /auth/reset-password` - パスワード再設定
//! - `GET /auth/email-exists` - メールアドレスの登録有無
//! - `GET /users/me` - ログイン中のユーザー情報

use async_trait::async_trait;
use evently_shared::ApiEnvelope;
use reqwest::Method;
use serde_json::Value;

use super::{
    api_client::{ApiClient, FnSchema},
    error::ApiClientError,
    response::{message_or, require_data, session_envelope, unwrap_envelope},
    types::{
        EmailExistsData,
        ForgotPasswordRequest,
        LoginRequest,
        MessageData,
        ResetPasswordRequest,
        SignupRequest,
        VerifySignupRequest,
    },
};
use crate::session::{AuthHeader, SessionTokens};

/// 認証 API クライアントトレイト
///
/// テスト時にスタブを使用できるようトレイトで定義。
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// メールアドレスとパスワードでログインする
    async fn login(&self, req: &LoginRequest) -> Result<SessionTokens, ApiClientError>;

    /// アカウントを作成する（確認コードがメールで送られる）
    async fn signup(&self, req: &SignupRequest) -> Result<String, ApiClientError>;

    /// 確認コードを検証し、セッションを開始する
    async fn verify_signup(
        &self,
        req: &VerifySignupRequest,
    ) -> Result<SessionTokens, ApiClientError>;

    async fn forgot_password(&self, req: &ForgotPasswordRequest) -> Result<String, ApiClientError>;

    async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<String, ApiClientError>;

    /// メールアドレスが登録済みかどうか
    ///
    /// 上流の呼び出しに失敗した場合は `false` を返す。
    async fn email_exists(&self, email: &str) -> bool;

    /// ログイン中のユーザー情報を取得する
    async fn me(&self, auth: &AuthHeader) -> Result<Value, ApiClientError>;
}

/// 認証 API クライアント実装
#[derive(Debug, Clone)]
pub struct AuthApiImpl {
    api: ApiClient,
}

impl AuthApiImpl {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn post_session<B>(&self, endpoint: &str, body: &B) -> Result<SessionTokens, ApiClientError>
    where
        B: serde::Serialize + Sync,
    {
        let envelope: ApiEnvelope<SessionTokens> = self
            .api
            .safe_post(endpoint, body, None, &FnSchema(session_envelope))
            .await?;
        require_data(envelope, self.api.request_context(Method::POST, endpoint))
    }

    async fn post_message<B>(
        &self,
        endpoint: &str,
        body: &B,
        fallback: &str,
    ) -> Result<String, ApiClientError>
    where
        B: serde::Serialize + Sync,
    {
        let envelope: ApiEnvelope<MessageData> = self.api.post(endpoint, Some(body), None).await?;
        message_or(
            envelope,
            self.api.request_context(Method::POST, endpoint),
            fallback,
        )
    }
}

#[async_trait]
impl AuthApi for AuthApiImpl {
    async fn login(&self, req: &LoginRequest) -> Result<SessionTokens, ApiClientError> {
        self.post_session("/auth/login", req).await
    }

    async fn signup(&self, req: &SignupRequest) -> Result<String, ApiClientError> {
        self.post_message(
            "/auth/signup",
            req,
            "確認コードをメールで送信しました",
        )
        .await
    }

    async fn verify_signup(
        &self,
        req: &VerifySignupRequest,
    ) -> Result<SessionTokens, ApiClientError> {
        self.post_session("/auth/verify", req).await
    }

    async fn forgot_password(&self, req: &ForgotPasswordRequest) -> Result<String, ApiClientError> {
        self.post_message(
            "/auth/forgot-password",
            req,
            "パスワード再設定用のメールを送信しました",
        )
        .await
    }

    async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<String, ApiClientError> {
        self.post_message(
            "/auth/reset-password",
            req,
            "パスワードを再設定しました",
        )
        .await
    }

    async fn email_exists(&self, email: &str) -> bool {
        let endpoint = format!("/auth/email-exists?email={}", urlencoding::encode(email));
        let result: Result<Option<EmailExistsData>, ApiClientError> = async {
            let envelope: ApiEnvelope<EmailExistsData> = self.api.get(&endpoint, None).await?;
            unwrap_envelope(envelope, self.api.request_context(Method::GET, &endpoint))
        }
        .await;

        match result {
            Ok(data) => data.is_some_and(|d| d.exists),
            Err(e) => {
                tracing::warn!(
                    error.category = "external_service",
                    error.kind = "email_exists",
                    error = %e,
                    "メールアドレスの存在確認に失敗したため未登録として扱います"
                );
                false
            }
        }
    }

    async fn me(&self, auth: &AuthHeader) -> Result<Value, ApiClientError> {
        let endpoint = "/users/me";
        let envelope: ApiEnvelope<Value> = self.api.get(endpoint, Some(auth.to_header_map())).await?;
        Ok(unwrap_envelope(envelope, self.api.request_context(Method::GET, endpoint))?
            .unwrap_or(Value::Null))
    }
}
