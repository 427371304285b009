use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub bcrypt_cost: u32,
    pub host: String,
    pub port: u16,
    pub body_limit_mb: usize,
    /// Empty means any origin is allowed.
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "86400".into())
                .parse()?,
            bcrypt_cost: env::var("BCRYPT_COST")
                .unwrap_or_else(|_| bcrypt::DEFAULT_COST.to_string())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            body_limit_mb: env::var("BODY_LIMIT_MB")
                .unwrap_or_else(|_| "20".into())
                .parse()?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or_default(),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required env var: {}", key))
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/').to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Fast bcrypt and a fixed secret for unit tests.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: String::new(),
        db_max_connections: 1,
        jwt_secret: "test-secret".into(),
        jwt_expiry_seconds: 300,
        bcrypt_cost: 4,
        host: "127.0.0.1".into(),
        port: 0,
        body_limit_mb: 1,
        cors_allowed_origins: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_empty_entries_dropped() {
        let origins = parse_origins(" http://localhost:5173/ ,, https://chores.example.com");
        assert_eq!(
            origins,
            vec!["http://localhost:5173".to_string(), "https://chores.example.com".to_string()]
        );
    }
}
