//! 上流 API とやり取りするリクエスト / レスポンス型

use serde::{Deserialize, Serialize};
use validator::Validate;

/// ログインリクエスト
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email:    String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// サインアップリクエスト
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 100))]
    pub name:              String,
    #[validate(email)]
    pub email:             String,
    #[validate(length(min = 8))]
    pub password:          String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub organization_name: Option<String>,
}

/// サインアップ時のメール確認リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifySignupRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 4, max = 12))]
    pub code:  String,
}

/// パスワード再設定メールの送信リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

/// パスワード再設定リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token:    String,
    #[validate(length(min = 8))]
    pub password: String,
}

/// メッセージのみを返す上流レスポンスの `data`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageData {
    pub message: String,
}

/// メールアドレス存在確認の `data`
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmailExistsData {
    pub exists: bool,
}

/// イベント配下のリソース種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResource {
    Agenda,
    Team,
    Attendees,
}

impl EventResource {
    /// パスセグメントからパースする（未知の値は `None`）
    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "agenda" => Some(Self::Agenda),
            "team" => Some(Self::Team),
            "attendees" => Some(Self::Attendees),
            _ => None,
        }
    }

    pub fn as_segment(self) -> &'static str {
        match self {
            Self::Agenda => "agenda",
            Self::Team => "team",
            Self::Attendees => "attendees",
        }
    }
}
