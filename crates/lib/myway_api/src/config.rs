//! API server configuration.

use chrono::Duration;
use myway_core::auth::jwt::{
    DEFAULT_ACCESS_TOKEN_TTL_SECS, MAX_ACCESS_TOKEN_TTL_SECS, TokenCodec, resolve_jwt_secret,
};

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:3100").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,
}

/// Whether `secs` is an acceptable access token lifetime.
pub fn valid_access_token_ttl(secs: i64) -> bool {
    (1..=MAX_ACCESS_TOKEN_TTL_SECS).contains(&secs)
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                 | Default                            |
    /// |--------------------------|------------------------------------|
    /// | `BIND_ADDR`              | `127.0.0.1:3100`                   |
    /// | `DATABASE_URL`           | `postgres://localhost:5432/myway`  |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file  |
    /// | `ACCESS_TOKEN_TTL_SECS`  | `900`                              |
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3100".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/myway".into()),
            jwt_secret: resolve_jwt_secret(),
            access_token_ttl_secs: std::env::var("ACCESS_TOKEN_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|secs: &i64| valid_access_token_ttl(*secs))
                .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS),
        }
    }

    /// Build the token codec this configuration describes.
    ///
    /// An out-of-range lifetime is clamped to `1..=MAX_ACCESS_TOKEN_TTL_SECS`.
    pub fn token_codec(&self) -> TokenCodec {
        let secs = self
            .access_token_ttl_secs
            .clamp(1, MAX_ACCESS_TOKEN_TTL_SECS);
        TokenCodec::with_access_ttl(self.jwt_secret.as_bytes(), Duration::seconds(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: i64) -> ApiConfig {
        ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            pg_connection_url: String::new(),
            jwt_secret: "config-test-secret".into(),
            access_token_ttl_secs: ttl,
        }
    }

    #[test]
    fn ttl_bounds() {
        assert!(!valid_access_token_ttl(0));
        assert!(valid_access_token_ttl(1));
        assert!(valid_access_token_ttl(MAX_ACCESS_TOKEN_TTL_SECS));
        assert!(!valid_access_token_ttl(MAX_ACCESS_TOKEN_TTL_SECS + 1));
        assert!(!valid_access_token_ttl(i64::MAX));
    }

    #[test]
    fn huge_ttl_is_clamped_instead_of_panicking() {
        let codec = config(i64::MAX).token_codec();
        assert_eq!(codec.access_ttl(), Duration::seconds(MAX_ACCESS_TOKEN_TTL_SECS));

        let codec = config(600).token_codec();
        assert_eq!(codec.access_ttl(), Duration::seconds(600));
    }
}
