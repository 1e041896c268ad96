//! # Cookie コーデック
//!
//! `Set-Cookie` ヘッダー行の構築と、`Cookie` ヘッダーのパースを担当する。
//!
//! ## 既定値
//!
//! 属性を指定しない場合は安全側に倒す:
//!
//! - `Path=/`
//! - `HttpOnly`
//! - `SameSite=Strict`
//! - `Secure`（本番環境のみ）
//!
//! 名前と値はどちらもパーセントエンコードして書き出し、パース時にデコードする。

use std::collections::BTreeMap;

use axum::http::{HeaderMap, header::COOKIE};
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::session::SessionTokens;

/// アクセストークン（JWT）を保持する Cookie 名
pub const TOKEN_COOKIE: &str = "token";

/// リフレッシュトークンを保持する Cookie 名
pub const REFRESH_COOKIE: &str = "refresh";

/// アクセストークン Cookie の有効期限（7 日）
pub const TOKEN_MAX_AGE: Duration = Duration::days(7);

/// リフレッシュトークン Cookie の有効期限（30 日）
pub const REFRESH_MAX_AGE: Duration = Duration::days(30);

/// Cookie 属性
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path:      String,
    pub http_only: bool,
    pub secure:    bool,
    pub same_site: SameSite,
    pub max_age:   Option<Duration>,
    pub domain:    Option<String>,
}

impl CookieOptions {
    /// 安全側の既定値
    ///
    /// `secure` は本番環境フラグに従う（ローカル開発は HTTP のため）。
    pub fn secure_defaults(is_production: bool) -> Self {
        Self {
            path:      "/".to_string(),
            http_only: true,
            secure:    is_production,
            same_site: SameSite::Strict,
            max_age:   None,
            domain:    None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// `Set-Cookie` ヘッダー行を構築する
///
/// 名前と値はパーセントエンコードされる。
pub fn serialize(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut builder = Cookie::build((
        urlencoding::encode(name).into_owned(),
        urlencoding::encode(value).into_owned(),
    ))
    .path(options.path.clone())
    .http_only(options.http_only)
    .secure(options.secure)
    .same_site(options.same_site);

    if let Some(max_age) = options.max_age {
        builder = builder.max_age(max_age);
    }
    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }

    builder.build().to_string()
}

/// `Cookie` ヘッダーをパースして名前 → 値のマップを返す
///
/// - ヘッダーがなければ空のマップ
/// - `=` を含まない断片、デコードに失敗した断片は読み飛ばす
/// - 同じ名前が複数ある場合は先勝ち
pub fn parse(cookie_header: Option<&str>) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    let Some(header) = cookie_header else {
        return cookies;
    };

    for pair in header.split(';') {
        let Some((name, value)) = pair.trim().split_once('=') else {
            continue;
        };
        let (Ok(name), Ok(value)) = (
            urlencoding::decode(name.trim()),
            urlencoding::decode(value.trim()),
        ) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        cookies
            .entry(name.into_owned())
            .or_insert_with(|| value.into_owned());
    }

    cookies
}

/// リクエストのすべての `Cookie` ヘッダーをパースする
pub fn parse_request(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for (name, value) in parse(Some(header)) {
            cookies.entry(name).or_insert(value);
        }
    }
    cookies
}

/// 認証用 Cookie を構築する
pub fn create_auth_cookie(
    name: &str,
    value: &str,
    max_age: Duration,
    is_production: bool,
) -> String {
    serialize(
        name,
        value,
        &CookieOptions::secure_defaults(is_production).with_max_age(max_age),
    )
}

/// Cookie を即時失効させるための `Set-Cookie` 行を構築する
pub fn clear(name: &str, is_production: bool) -> String {
    create_auth_cookie(name, "", Duration::ZERO, is_production)
}

/// ログイン成功時に設定する Cookie 群
///
/// リフレッシュトークンがない場合はアクセストークンのみ。
pub fn session_cookies(tokens: &SessionTokens, is_production: bool) -> Vec<String> {
    let mut cookies = vec![create_auth_cookie(
        TOKEN_COOKIE,
        &tokens.jwt,
        TOKEN_MAX_AGE,
        is_production,
    )];
    if let Some(refresh) = &tokens.refresh_token {
        cookies.push(create_auth_cookie(
            REFRESH_COOKIE,
            refresh,
            REFRESH_MAX_AGE,
            is_production,
        ));
    }
    cookies
}

/// ログアウト時に設定する Cookie 群
pub fn clear_session_cookies(is_production: bool) -> Vec<String> {
    vec![
        clear(TOKEN_COOKIE, is_production),
        clear(REFRESH_COOKIE, is_production),
    ]
}
