//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュールで re-export し、フラットな API を提供
//! - すべてのハンドラは `(State, Request) -> Result<Response, HandlerError>` の形で、
//!   [`create_handler`] でルートにする
//!
//! ## ハンドラ一覧
//!
//! - `health`: ヘルスチェック
//! - `auth`: 認証関連（ログイン、サインアップ、ログアウト等）
//! - `event`: イベント・分析データ
//! - `pages`: サーバーサイドページローダー

pub mod auth;
pub mod event;
pub mod health;
pub mod pages;
pub mod wrapper;

pub use auth::{
    AuthState,
    email_exists,
    forgot_password,
    login,
    logout,
    me,
    reset_password,
    signup,
    verify_signup,
};
pub use event::{EventState, analytics, event_detail, event_resource, events};
pub use health::{ReadinessState, health_check, readiness_check};
pub use pages::{DashboardProps, EventPageProps, dashboard_loader, event_page_loader};
pub use wrapper::{HandlerError, create_handler, get_authed_headers, read_json};
