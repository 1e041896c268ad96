//! # セッションコンテキスト
//!
//! Cookie に保存されたトークンを、リクエストスコープの値として明示的に扱う。
//!
//! ハンドラやページローダーは Cookie ストアを暗黙に参照せず、
//! [`Session::from_headers`] で取り出した値を引数として受け取る。

use std::fmt;

use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::cookie::{self, REFRESH_COOKIE, TOKEN_COOKIE};

/// ログイン / サインアップ検証の成功時に上流 API が返すトークン
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SessionTokens {
    #[validate(length(min = 1))]
    pub jwt:           String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("jwt", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// `Authorization: Bearer <token>` ヘッダー
///
/// 構築時にヘッダー値として妥当であることを検証済み。
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    token: String,
    value: HeaderValue,
}

impl AuthHeader {
    /// トークンから Bearer ヘッダーを構築する
    ///
    /// 空文字列、またはヘッダー値に使えない文字を含む場合は `None`。
    pub fn bearer(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() {
            return None;
        }
        let mut value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
        value.set_sensitive(true);
        Some(Self { token, value })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn header_value(&self) -> &HeaderValue {
        &self.value
    }

    /// `{ Authorization: "Bearer <token>" }` のヘッダーマップ
    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.value.clone());
        headers
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthHeader(Bearer [REDACTED])")
    }
}

/// リクエストの Cookie から読み取ったセッション
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    token:   Option<String>,
    refresh: Option<String>,
}

impl Session {
    /// ヘッダーの `Cookie` から `token` / `refresh` を読み取る
    ///
    /// 値が空の Cookie は未設定として扱う。
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = cookie::parse_request(headers);
        let mut take = |name: &str| cookies.remove(name).filter(|v| !v.is_empty());
        Self {
            token:   take(TOKEN_COOKIE),
            refresh: take(REFRESH_COOKIE),
        }
    }

    /// 認証ヘッダー（未ログインなら `None`）
    pub fn auth_header(&self) -> Option<AuthHeader> {
        self.token.as_deref().and_then(AuthHeader::bearer)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_header().is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.token.is_some())
            .field("has_refresh", &self.refresh.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header::COOKIE;

    use super::*;

    fn headers_with_cookie(cookie: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static(cookie));
        headers
    }

    #[test]
    fn test_from_headers_tokenとrefreshを読み取る() {
        let session = Session::from_headers(&headers_with_cookie("token=abc; refresh=def"));

        assert_eq!(session.auth_header().unwrap().token(), "abc");
        assert_eq!(session.refresh_token(), Some("def"));
    }

    #[test]
    fn test_from_headers_cookieなしで未認証() {
        let session = Session::from_headers(&HeaderMap::new());

        assert!(!session.is_authenticated());
        assert_eq!(session.refresh_token(), None);
    }

    #[test]
    fn test_from_headers_空のtokenは未認証() {
        let session = Session::from_headers(&headers_with_cookie("token="));

        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_auth_header_bearer形式のヘッダーマップを返す() {
        let header = AuthHeader::bearer("X").unwrap();
        let map = header.to_header_map();

        assert_eq!(map.get(AUTHORIZATION).unwrap(), "Bearer X");
        assert!(map.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn test_auth_header_改行を含むトークンは拒否する() {
        assert!(AuthHeader::bearer("a\nb").is_none());
    }

    #[test]
    fn test_debug出力にトークンを含めない() {
        let header = AuthHeader::bearer("secret-jwt").unwrap();
        let tokens = SessionTokens {
            jwt:           "secret-jwt".to_string(),
            refresh_token: Some("secret-refresh".to_string()),
        };

        assert!(!format!("{header:?}").contains("secret"));
        assert!(!format!("{tokens:?}").contains("secret"));
    }
}
