//! # 上流 API クライアント
//!
//! 上流 REST API との通信を担当する。
//!
//! - [`ApiClient`]: タイムアウト / リトライ付きの汎用 HTTP クライアント
//! - [`AuthApi`] / [`EventApi`]: エンドポイントごとのファサード

pub mod api_client;
pub mod auth_api;
pub mod error;
pub mod event_api;
mod response;
pub mod types;

pub use api_client::{
    ApiClient,
    ApiClientConfig,
    DEFAULT_RETRIES,
    DEFAULT_RETRY_BASE_DELAY,
    DEFAULT_TIMEOUT,
    ErrorCallback,
    FnSchema,
    ResponseSchema,
    Validated,
    backoff_delay,
};
pub use auth_api::{AuthApi, AuthApiImpl};
pub use error::{ApiClientError, RequestContext};
pub use event_api::{EventApi, EventApiImpl};
pub use types::{
    EmailExistsData,
    EventResource,
    ForgotPasswordRequest,
    LoginRequest,
    MessageData,
    ResetPasswordRequest,
    SignupRequest,
    VerifySignupRequest,
};
