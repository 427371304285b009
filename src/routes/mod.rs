pub mod child;
pub mod health;
pub mod metrics;
pub mod parent;
pub mod signup;
pub mod token;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    middleware::auth::JwtSecret,
    models::auth::{AuthenticatedUser, UserType},
    AppState,
};

pub fn router(state: AppState) -> Router {
    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());
    let body_limit = state.config.body_limit_mb * 1024 * 1024;
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/signup", post(signup::signup))
        .route("/token", post(token::issue_token))
        .route("/parent", get(parent::get_parent))
        .route(
            "/parent/task",
            post(parent::create_task)
                .put(parent::edit_task)
                .delete(parent::delete_task),
        )
        .route(
            "/parent/prize",
            post(parent::create_prize).delete(parent::delete_prize),
        )
        .route(
            "/child",
            get(child::get_child)
                .put(child::toggle_task)
                .post(child::create_child)
                .delete(child::delete_child),
        )
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Images travel inline as base64, so the limit is well above axum's default.
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = if config.cors_allowed_origins.is_empty() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(origin)
}

/// Parent-only routes reject child tokens.
fn require_parent(user: &AuthenticatedUser) -> ApiResult<Uuid> {
    require(user, UserType::Parent)
}

fn require_child(user: &AuthenticatedUser) -> ApiResult<Uuid> {
    require(user, UserType::Child)
}

fn require(user: &AuthenticatedUser, expected: UserType) -> ApiResult<Uuid> {
    if user.user_type == expected {
        Ok(user.user_id)
    } else {
        Err(ApiError::Forbidden(format!(
            "Only {expected} accounts may use this endpoint"
        )))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{
        config::test_config, db::MemoryStore, middleware::auth::encode_token, models::auth::UserType,
        AppState,
    };

    pub const SECRET: &str = "test-secret";

    pub fn app() -> Router {
        super::router(AppState::new(Arc::new(MemoryStore::new()), test_config()))
    }

    pub fn token(user_id: Uuid, user_type: UserType) -> String {
        encode_token(user_id, user_type, SECRET, 300).unwrap()
    }

    pub async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(json) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}
