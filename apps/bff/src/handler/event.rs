//! # イベントハンドラ
//!
//! イベント関連 API を上流に中継する。すべて認証必須。
//!
//! ## エンドポイント
//!
//! - `GET /api/events` - 一覧（クエリ文字列は上流へそのまま転送）
//! - `POST /api/events` - 作成
//! - `GET /api/events/{id}` - 詳細
//! - `PUT /api/events/{id}` - 更新
//! - `DELETE /api/events/{id}` - 削除
//! - `GET /api/events/{id}/{resource}` - アジェンダ / チーム / 参加者
//! - `GET /api/analytics` - 主催者向け分析データ

use std::sync::Arc;

use axum::{
    Json,
    RequestExt,
    extract::{Path, Request},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
};
use evently_shared::BffResponse;
use serde_json::Value;

use super::wrapper::{HandlerError, get_authed_headers, read_json_object};
use crate::client::{EventApi, EventResource};

/// イベントハンドラの共有状態
pub struct EventState {
    pub event_api: Arc<dyn EventApi>,
}

/// GET / POST /api/events
#[tracing::instrument(skip_all)]
pub async fn events(state: Arc<EventState>, request: Request) -> Result<Response, HandlerError> {
    let auth = get_authed_headers(request.headers())?;

    if request.method() == Method::POST {
        let body = read_json_object(request).await?;
        let created = state.event_api.create_event(&auth, &body).await?;
        return Ok((StatusCode::CREATED, Json(BffResponse::data(created))).into_response());
    }

    let query = request.uri().query().map(str::to_string);
    let events = state.event_api.list_events(&auth, query.as_deref()).await?;
    Ok(Json(BffResponse::data(events)).into_response())
}

/// GET / PUT / DELETE /api/events/{id}
#[tracing::instrument(skip_all, fields(event_id = tracing::field::Empty))]
pub async fn event_detail(
    state: Arc<EventState>,
    mut request: Request,
) -> Result<Response, HandlerError> {
    let auth = get_authed_headers(request.headers())?;
    let Path(id) = request
        .extract_parts::<Path<String>>()
        .await
        .map_err(|e| HandlerError::bad_request(e.body_text()))?;
    tracing::Span::current().record("event_id", id.as_str());

    let method = request.method().clone();
    let response = if method == Method::PUT {
        let body = read_json_object(request).await?;
        let updated = state.event_api.update_event(&auth, &id, &body).await?;
        Json(BffResponse::data(updated)).into_response()
    } else if method == Method::DELETE {
        let deleted = state.event_api.delete_event(&auth, &id).await?;
        deleted_response(deleted)
    } else {
        let event = state.event_api.get_event(&auth, &id).await?;
        Json(BffResponse::data(event)).into_response()
    };
    Ok(response)
}

/// GET /api/events/{id}/{resource}
///
/// `resource` は `agenda` / `team` / `attendees` のいずれか。それ以外は 404。
#[tracing::instrument(skip_all)]
pub async fn event_resource(
    state: Arc<EventState>,
    mut request: Request,
) -> Result<Response, HandlerError> {
    let auth = get_authed_headers(request.headers())?;
    let Path((id, segment)) = request
        .extract_parts::<Path<(String, String)>>()
        .await
        .map_err(|e| HandlerError::bad_request(e.body_text()))?;
    let resource = EventResource::from_segment(&segment)
        .ok_or_else(|| HandlerError::not_found(format!("不明なリソースです: {segment}")))?;

    let items = state
        .event_api
        .list_event_resource(&auth, &id, resource)
        .await?;
    Ok(Json(BffResponse::data(items)).into_response())
}

/// GET /api/analytics
#[tracing::instrument(skip_all)]
pub async fn analytics(state: Arc<EventState>, request: Request) -> Result<Response, HandlerError> {
    let auth = get_authed_headers(request.headers())?;
    let query = request.uri().query().map(str::to_string);
    let data = state.event_api.analytics(&auth, query.as_deref()).await?;
    Ok(Json(BffResponse::data(data)).into_response())
}

fn deleted_response(deleted: Value) -> Response {
    let response = if deleted.is_null() {
        BffResponse::message("イベントを削除しました")
    } else {
        BffResponse::data(deleted).with_message("イベントを削除しました")
    };
    Json(response).into_response()
}
