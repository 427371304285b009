use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use super::require_parent;
use crate::{
    error::ApiResult,
    middleware::json::ApiJson,
    models::{
        auth::AuthenticatedUser,
        parent::ParentView,
        prize::{DeletePrizeRequest, Prize, PrizeRequest},
        task::{DeleteTaskRequest, Task, TaskRequest},
        DocumentResponse,
    },
    services::parents::ParentService,
    AppState,
};

pub async fn get_parent(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<DocumentResponse<ParentView>>> {
    let parent_id = require_parent(&user)?;
    let parent = ParentService::get(state.store.as_ref(), parent_id).await?;
    Ok(Json(DocumentResponse::new(parent)))
}

pub async fn create_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<TaskRequest>,
) -> ApiResult<(StatusCode, Json<DocumentResponse<Task>>)> {
    let parent_id = require_parent(&user)?;
    let task = ParentService::add_task(state.store.as_ref(), parent_id, body).await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse::new(task))))
}

pub async fn edit_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<TaskRequest>,
) -> ApiResult<Json<DocumentResponse<Task>>> {
    let parent_id = require_parent(&user)?;
    let task = ParentService::edit_task(state.store.as_ref(), parent_id, body).await?;
    Ok(Json(DocumentResponse::new(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<DeleteTaskRequest>,
) -> ApiResult<Json<DocumentResponse<Task>>> {
    let parent_id = require_parent(&user)?;
    let task = ParentService::delete_task(state.store.as_ref(), parent_id, body.task_id).await?;
    Ok(Json(DocumentResponse::new(task)))
}

pub async fn create_prize(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<PrizeRequest>,
) -> ApiResult<(StatusCode, Json<DocumentResponse<Prize>>)> {
    let parent_id = require_parent(&user)?;
    let prize = ParentService::add_prize(state.store.as_ref(), parent_id, body).await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse::new(prize))))
}

pub async fn delete_prize(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<DeletePrizeRequest>,
) -> ApiResult<Json<Value>> {
    let parent_id = require_parent(&user)?;
    let prize =
        ParentService::delete_prize(state.store.as_ref(), parent_id, body.prize_id).await?;
    Ok(Json(json!({ "message": format!("Prize {} deleted", prize.name) })))
}
