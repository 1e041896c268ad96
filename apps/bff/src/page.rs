//! # サーバーサイドページローダー
//!
//! ページ描画前に BFF で props を解決する仕組みと、その認証ガード。
//!
//! ローダーは [`PageContext`] を受け取り、[`PageResult`] を返す。
//! 認証が必要なページは [`with_auth`] で包むと、`token` Cookie がない場合に
//! `/login?next=<元のパス>` へリダイレクトし、ある場合は検証済みの
//! [`AuthHeader`] をローダーに渡す。
//!
//! ローダーが返した [`HandlerError`] は他のハンドラと同じエラーエンベロープになる。

use std::{collections::HashMap, future::Future, pin::Pin};

use axum::{
    Json,
    RequestExt,
    extract::{Path, Request},
    http::{HeaderMap, HeaderValue, StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use evently_shared::BffResponse;
use serde::Serialize;
use serde_json::Value;

use crate::{
    handler::wrapper::{GET, HandlerError, create_handler},
    session::{AuthHeader, Session},
};

/// ログイン後の既定の遷移先
pub const DEFAULT_LANDING_ROUTE: &str = "/dashboard";

/// ログインページのパス
pub const LOGIN_ROUTE: &str = "/login";

/// ローダーに渡すリクエスト情報
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub path:    String,
    pub query:   Option<String>,
    pub params:  HashMap<String, String>,
    pub headers: HeaderMap,
}

impl PageContext {
    /// リクエストの Cookie から読み取ったセッション
    pub fn session(&self) -> Session {
        Session::from_headers(&self.headers)
    }

    /// パスパラメータ
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// クエリ付きのパス（`/events?page=2` 等）
    pub fn resolved_url(&self) -> String {
        match self.query.as_deref().filter(|q| !q.is_empty()) {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}

/// ローダーの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResult<P> {
    Props(P),
    Redirect {
        destination: String,
        permanent:   bool,
    },
    NotFound,
}

impl<P> PageResult<P> {
    /// 一時リダイレクト（307）
    pub fn redirect(destination: impl Into<String>) -> Self {
        Self::Redirect {
            destination: destination.into(),
            permanent:   false,
        }
    }
}

impl<P> IntoResponse for PageResult<P>
where
    P: Serialize,
{
    fn into_response(self) -> Response {
        match self {
            Self::Props(props) => Json(PropsBody { props }).into_response(),
            Self::Redirect {
                destination,
                permanent,
            } => {
                let status = if permanent {
                    StatusCode::PERMANENT_REDIRECT
                } else {
                    StatusCode::TEMPORARY_REDIRECT
                };
                match HeaderValue::from_str(&destination) {
                    Ok(location) => (status, [(LOCATION, location)]).into_response(),
                    Err(_) => HandlerError::new("リダイレクト先が不正です").into_response(),
                }
            }
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Json(BffResponse::<Value>::error("Not Found", None)),
            )
                .into_response(),
        }
    }
}

#[derive(Serialize)]
struct PropsBody<P> {
    props: P,
}

/// ローダーの出力
pub type PageOutcome<P> = Result<PageResult<P>, HandlerError>;

/// ローダーが返す Future
pub type PageFuture<P> = Pin<Box<dyn Future<Output = PageOutcome<P>> + Send>>;

/// 委譲先を持たない [`with_auth`] 用のローダー型
pub type NoLoader<P> = fn(PageContext, AuthHeader) -> std::future::Ready<PageOutcome<P>>;

/// 未ログイン時にログインページへ送るリダイレクト先
pub fn login_redirect(ctx: &PageContext) -> String {
    format!(
        "{LOGIN_ROUTE}?next={}",
        urlencoding::encode(&ctx.resolved_url())
    )
}

/// ローダーを認証ガードで包む
///
/// - `token` Cookie がなければログインページへリダイレクト
/// - あれば `(ctx, AuthHeader)` で委譲先を呼び、結果をそのまま返す
/// - 委譲先がなければ `P::default()` を props として返す
pub fn with_auth<P, L, Fut>(
    loader: Option<L>,
) -> impl Fn(PageContext) -> PageFuture<P> + Clone + Send + Sync + 'static
where
    P: Default + Send + 'static,
    L: Fn(PageContext, AuthHeader) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = PageOutcome<P>> + Send + 'static,
{
    move |ctx: PageContext| -> PageFuture<P> {
        let loader = loader.clone();
        Box::pin(async move {
            let Some(auth) = ctx.session().auth_header() else {
                return Ok(PageResult::redirect(login_redirect(&ctx)));
            };
            match loader {
                Some(loader) => loader(ctx, auth).await,
                None => Ok(PageResult::Props(P::default())),
            }
        })
    }
}

/// 認証のみを要求し、props は既定値を返すローダー
pub fn auth_only<P>() -> impl Fn(PageContext) -> PageFuture<P> + Clone + Send + Sync + 'static
where
    P: Default + Send + 'static,
{
    with_auth(None::<NoLoader<P>>)
}

/// ログイン後の遷移先を決める
///
/// 同一オリジンの絶対パス（`/` で始まり `//` で始まらない）のみ採用する。
pub fn login_redirect_target(next: Option<&str>) -> String {
    match next {
        Some(next) if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') => {
            next.to_string()
        }
        _ => DEFAULT_LANDING_ROUTE.to_string(),
    }
}

/// ローダーを GET のルートにする
pub fn page_route<S, L, Fut, P>(loader: L) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
    L: Fn(PageContext) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = PageOutcome<P>> + Send + 'static,
    P: Serialize + 'static,
{
    create_handler(GET, move |_state: S, mut request: Request| {
        let loader = loader.clone();
        async move {
            let params = request
                .extract_parts::<Path<HashMap<String, String>>>()
                .await
                .map(|Path(params)| params)
                .unwrap_or_default();
            let ctx = PageContext {
                path: request.uri().path().to_string(),
                query: request.uri().query().map(str::to_string),
                params,
                headers: request.headers().clone(),
            };
            loader(ctx).await.map(IntoResponse::into_response)
        }
    })
}
