//! # ページローダー
//!
//! 認証が必要なページの props を上流 API から解決する。
//!
//! - `GET /pages/dashboard` - ダッシュボード（イベント一覧と分析データ）
//! - `GET /pages/events/{id}` - イベント詳細

use std::sync::Arc;

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::{event::EventState, wrapper::HandlerError};
use crate::{
    client::ApiClientError,
    page::{PageContext, PageFuture, PageOutcome, PageResult, login_redirect, with_auth},
    session::AuthHeader,
};

/// ダッシュボードの props
#[derive(Debug, Default, Serialize)]
pub struct DashboardProps {
    pub events:    Value,
    pub analytics: Value,
}

/// イベント詳細ページの props
#[derive(Debug, Default, Serialize)]
pub struct EventPageProps {
    pub event: Value,
}

/// `/pages/dashboard` のローダー
pub fn dashboard_loader(
    state: Arc<EventState>,
) -> impl Fn(PageContext) -> PageFuture<DashboardProps> + Clone + Send + Sync + 'static {
    with_auth(Some(move |ctx: PageContext, auth: AuthHeader| {
        let state = state.clone();
        async move { load_dashboard(&state, ctx, auth).await }
    }))
}

/// `/pages/events/{id}` のローダー
pub fn event_page_loader(
    state: Arc<EventState>,
) -> impl Fn(PageContext) -> PageFuture<EventPageProps> + Clone + Send + Sync + 'static {
    with_auth(Some(move |ctx: PageContext, auth: AuthHeader| {
        let state = state.clone();
        async move { load_event(&state, ctx, auth).await }
    }))
}

async fn load_dashboard(
    state: &EventState,
    ctx: PageContext,
    auth: AuthHeader,
) -> PageOutcome<DashboardProps> {
    let (events, analytics) = tokio::join!(
        state.event_api.list_events(&auth, None),
        state.event_api.analytics(&auth, None),
    );

    match (events, analytics) {
        (Ok(events), Ok(analytics)) => Ok(PageResult::Props(DashboardProps { events, analytics })),
        (Err(e), _) | (_, Err(e)) => upstream_failure(e, &ctx),
    }
}

async fn load_event(
    state: &EventState,
    ctx: PageContext,
    auth: AuthHeader,
) -> PageOutcome<EventPageProps> {
    let Some(id) = ctx.param("id") else {
        return Ok(PageResult::NotFound);
    };

    match state.event_api.get_event(&auth, id).await {
        Ok(event) => Ok(PageResult::Props(EventPageProps { event })),
        Err(e) => upstream_failure(e, &ctx),
    }
}

/// 上流エラーをページの結果に変換する
///
/// 401 はセッション切れとしてログインページへ、404 は NotFound。
/// それ以外はエラーとして返し、ハンドララッパーがステータス付きで応答する。
fn upstream_failure<P>(err: ApiClientError, ctx: &PageContext) -> PageOutcome<P> {
    match err.status() {
        Some(StatusCode::UNAUTHORIZED) => Ok(PageResult::redirect(login_redirect(ctx))),
        Some(StatusCode::NOT_FOUND) => Ok(PageResult::NotFound),
        _ => Err(HandlerError::from(err)),
    }
}
