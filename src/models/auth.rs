use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which collection an account lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserType {
    Parent,
    Child,
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserType::Parent => "Parent",
            UserType::Child => "Child",
        };
        write!(f, "{s}")
    }
}

/// Claims embedded in the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account UUID
    pub user_type: UserType,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated token, available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub user_type: UserType,
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(rename = "userType")]
    pub user_type: UserType,
}
