use axum::{extract::State, http::StatusCode, Json};

use super::{require_child, require_parent};
use crate::{
    error::ApiResult,
    middleware::json::ApiJson,
    models::{
        auth::AuthenticatedUser,
        child::{Child, ChildView, CreateChildRequest, DeleteChildRequest, ToggleTaskRequest},
        DocumentResponse,
    },
    services::children::ChildService,
    AppState,
};

pub async fn get_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<DocumentResponse<ChildView>>> {
    let child_id = require_child(&user)?;
    let child = ChildService::get(state.store.as_ref(), child_id).await?;
    Ok(Json(DocumentResponse::new(child)))
}

/// PUT /child: toggles one of the caller's tasks.
pub async fn toggle_task(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<ToggleTaskRequest>,
) -> ApiResult<Json<DocumentResponse<ChildView>>> {
    let child_id = require_child(&user)?;
    let child = ChildService::toggle_task(state.store.as_ref(), child_id, body).await?;
    Ok(Json(DocumentResponse::new(child)))
}

/// POST /child: a parent adds a child account.
pub async fn create_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<CreateChildRequest>,
) -> ApiResult<(StatusCode, Json<DocumentResponse<Child>>)> {
    let parent_id = require_parent(&user)?;
    let child =
        ChildService::create(state.store.as_ref(), &state.config, parent_id, body).await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse::new(child))))
}

pub async fn delete_child(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ApiJson(body): ApiJson<DeleteChildRequest>,
) -> ApiResult<Json<DocumentResponse<Child>>> {
    let parent_id = require_parent(&user)?;
    let child = ChildService::delete(state.store.as_ref(), parent_id, body.child_id).await?;
    Ok(Json(DocumentResponse::new(child)))
}
