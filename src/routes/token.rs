use axum::{extract::State, Json};

use crate::{
    error::ApiResult,
    middleware::json::ApiJson,
    models::auth::{TokenRequest, TokenResponse},
    services::auth::AuthService,
    AppState,
};

pub async fn issue_token(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let response = AuthService::authenticate(state.store.as_ref(), &state.config, body).await?;
    Ok(Json(response))
}
