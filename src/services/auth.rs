use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::Config,
    db::ChoreStore,
    error::{ApiError, ApiResult},
    middleware::auth::encode_token,
    models::{
        auth::{TokenRequest, TokenResponse, UserType},
        parent::{NewParent, Parent, SignupRequest},
    },
    services::{metrics, validation},
};

const INVALID_CREDENTIALS: &str = "Invalid username or password";

pub struct AuthService;

impl AuthService {
    /// Creates a parent account.
    pub async fn signup(
        store: &dyn ChoreStore,
        config: &Config,
        body: SignupRequest,
    ) -> ApiResult<Parent> {
        let username = validation::username(body.username.as_deref())?;
        let password = validation::password(body.password.as_deref())?;
        let profile_pic = validation::image(body.profile_pic.as_deref(), "profilePic")?;

        if store.username_taken(&username).await? {
            warn!(%username, "Signup rejected: username taken");
            return Err(ApiError::Conflict("Username already exists".into()));
        }

        let password_hash = bcrypt::hash(&password, config.bcrypt_cost)
            .map_err(|e| anyhow::anyhow!("bcrypt hash failed: {e}"))?;

        let parent = store
            .insert_parent(NewParent {
                username: username.clone(),
                password_hash,
                profile_pic,
            })
            .await?
            .ok_or_else(|| ApiError::Conflict("Username already exists".into()))?;

        metrics::SIGNUPS_COUNTER.inc();
        info!(parent_id = %parent.id, %username, "Parent signed up");
        Ok(parent)
    }

    /// Looks the username up among parents first, then children. A wrong
    /// password and an unknown username fail identically.
    pub async fn authenticate(
        store: &dyn ChoreStore,
        config: &Config,
        body: TokenRequest,
    ) -> ApiResult<TokenResponse> {
        let username = body.username.as_deref().map(str::trim).unwrap_or_default();
        let password = body.password.as_deref().unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Err(ApiError::validation("Username and password are required"));
        }

        let Some((user_id, user_type, password_hash)) = Self::find_account(store, username).await?
        else {
            metrics::record_login("unknown", "failure");
            return Err(ApiError::not_found(INVALID_CREDENTIALS));
        };

        // A malformed stored hash counts as a mismatch.
        let valid = bcrypt::verify(password, &password_hash).unwrap_or(false);
        if !valid {
            metrics::record_login(&user_type.to_string(), "failure");
            warn!(%user_id, "Login failed: wrong password");
            return Err(ApiError::not_found(INVALID_CREDENTIALS));
        }

        let token = encode_token(
            user_id,
            user_type,
            &config.jwt_secret,
            config.jwt_expiry_seconds,
        )?;

        metrics::record_login(&user_type.to_string(), "success");
        info!(%user_id, %user_type, "Login succeeded");
        Ok(TokenResponse { token, user_type })
    }

    async fn find_account(
        store: &dyn ChoreStore,
        username: &str,
    ) -> anyhow::Result<Option<(Uuid, UserType, String)>> {
        if let Some(parent) = store.parent_by_username(username).await? {
            return Ok(Some((parent.id, UserType::Parent, parent.password_hash)));
        }
        if let Some(child) = store.child_by_username(username).await? {
            return Ok(Some((child.id, UserType::Child, child.password_hash)));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::{db::MemoryStore, middleware::auth::decode_token};


    fn signup_body(username: &str) -> SignupRequest {
        SignupRequest {
            username: Some(username.into()),
            password: Some("Password1!".into()),
            profile_pic: Some("https://example.com/mama.png".into()),
        }
    }

    fn credentials(username: &str, password: &str) -> TokenRequest {
        TokenRequest {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn signup_then_login_issues_parent_token() {
        let store = MemoryStore::new();
        let config = test_config();
        let parent = AuthService::signup(&store, &config, signup_body("Mama")).await.unwrap();
        assert_ne!(parent.password_hash, "Password1!");

        let response = AuthService::authenticate(&store, &config, credentials("Mama", "Password1!"))
            .await
            .unwrap();
        assert_eq!(response.user_type, UserType::Parent);

        let user = decode_token(&response.token, &config.jwt_secret).unwrap();
        assert_eq!(user.user_id, parent.id);
    }

    #[tokio::test]
    async fn duplicate_signup_is_a_conflict() {
        let store = MemoryStore::new();
        let config = test_config();
        AuthService::signup(&store, &config, signup_body("Mama")).await.unwrap();

        let err = AuthService::signup(&store, &config, signup_body(" Mama ")).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn wrong_password_looks_like_unknown_user() {
        let store = MemoryStore::new();
        let config = test_config();
        AuthService::signup(&store, &config, signup_body("Mama")).await.unwrap();

        let wrong = AuthService::authenticate(&store, &config, credentials("Mama", "Nope1234!"))
            .await
            .unwrap_err();
        let unknown = AuthService::authenticate(&store, &config, credentials("Ghost", "Password1!"))
            .await
            .unwrap_err();

        assert_eq!(wrong.status(), unknown.status());
        assert_eq!(wrong.to_string(), unknown.to_string());
    }
}
