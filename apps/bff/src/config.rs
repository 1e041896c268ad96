//! # BFF 設定
//!
//! 環境変数から BFF サーバーの設定を読み込む。

use std::{env, time::Duration};

use thiserror::Error;

use crate::client::{DEFAULT_RETRIES, DEFAULT_TIMEOUT};

/// 設定読み込みエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} が設定されていません（.env を確認してください）")]
    Missing(&'static str),

    #[error("{name} の値が不正です: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// BFF サーバーの設定
#[derive(Debug, Clone)]
pub struct BffConfig {
    /// バインドアドレス
    pub host:          String,
    /// ポート番号
    pub port:          u16,
    /// 上流 REST API のベース URL
    pub api_base_url:  String,
    /// 上流 API 呼び出し全体のタイムアウト
    pub api_timeout:   Duration,
    /// 上流 API 呼び出しのリトライ回数
    pub api_retries:   u32,
    /// `ENV=production` のとき true（Cookie に `Secure` を付与する）
    pub is_production: bool,
}

impl BffConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 任意の取得関数から設定を読み込む
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| lookup(name).ok_or(ConfigError::Missing(name));

        Ok(Self {
            host:          lookup("BFF_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port:          parse("BFF_PORT", required("BFF_PORT")?)?,
            api_base_url:  required("API_BASE_URL")?,
            api_timeout:   match lookup("API_TIMEOUT_MS") {
                Some(value) => Duration::from_millis(parse("API_TIMEOUT_MS", value)?),
                None => DEFAULT_TIMEOUT,
            },
            api_retries:   match lookup("API_RETRIES") {
                Some(value) => parse("API_RETRIES", value)?,
                None => DEFAULT_RETRIES,
            },
            is_production: lookup("ENV").is_some_and(|v| v == "production"),
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
