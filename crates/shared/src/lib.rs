//! # Evently 共有ユーティリティ
//!
//! このクレートは、Evently の各サービス（BFF と上流 API クライアント）で
//! 共有されるワイヤ型とユーティリティを提供する。
//!
//! ## 設計方針
//!
//! - ビジネスロジックを含まない純粋なユーティリティのみを配置
//! - axum への依存は持たない（`IntoResponse` 変換は各サービスの責務）
//! - トレーシング初期化は `observability` feature でのみ有効化する

pub mod api_envelope;
pub mod bff_response;
pub mod health;
pub mod observability;

pub use api_envelope::{ApiEnvelope, EnvelopeFailure, UpstreamError};
pub use bff_response::BffResponse;
pub use health::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
