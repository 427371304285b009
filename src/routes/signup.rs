use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::ApiResult,
    middleware::json::ApiJson,
    models::{
        parent::{Parent, SignupRequest},
        DocumentResponse,
    },
    services::auth::AuthService,
    AppState,
};

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<DocumentResponse<Parent>>)> {
    let parent = AuthService::signup(state.store.as_ref(), &state.config, body).await?;
    Ok((StatusCode::CREATED, Json(DocumentResponse::new(parent))))
}
