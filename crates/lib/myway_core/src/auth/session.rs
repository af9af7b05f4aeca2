//! Session manager: sign-up, sign-in, refresh, logout and identity extraction.
//!
//! There is no stored session state beyond principals and refresh credentials.
//! Every sign-in mints an additional refresh credential; earlier ones stay
//! valid until they expire or are logged out.

use std::sync::{Arc, OnceLock};

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::AuthError;
use super::jwt::{CodecError, TokenCodec};
use super::password::{MAX_PASSWORD_BYTES, MIN_PASSWORD_LEN, hash_password, verify_password};
use crate::models::auth::{Identity, NewPrincipal, Principal, Role, TokenKind, normalize_email};
use crate::repo::{CredentialStore, PrincipalRepository, StorageError};

/// Sign-up input.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Coarse default role; `STUDENT` when absent.
    pub role: Option<String>,
}

/// A freshly issued token pair plus the principal's public fields.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub principal: Principal,
}

/// Result of a refresh: a new access token only.
#[derive(Debug, Clone)]
pub struct RefreshedAccess {
    pub access_token: String,
    pub expires_in: i64,
}

/// Hash checked when the email is unknown, so both sign-in failures cost one
/// bcrypt verification.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("myway-dummy-password").ok())
        .as_deref()
}

/// Orchestrates the credential codec and the credential store.
pub struct SessionManager<S: ?Sized> {
    store: Arc<S>,
    codec: Arc<TokenCodec>,
}

impl<S: ?Sized> Clone for SessionManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<S: ?Sized> SessionManager<S> {
    pub fn new(store: Arc<S>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify an access token and return the identity it carries.
    ///
    /// Every failure, including a refresh token presented on the access channel,
    /// is `Unauthenticated`.
    pub fn identify(&self, access_token: &str) -> Result<Identity, AuthError> {
        let verified = self.codec.verify(access_token).map_err(|e| {
            debug!(reason = %e, "access token rejected");
            AuthError::Unauthenticated
        })?;
        if verified.kind != TokenKind::Access {
            debug!(kind = ?verified.kind, "non-access token presented as bearer");
            return Err(AuthError::Unauthenticated);
        }
        Ok(Identity {
            principal_id: verified.principal_id,
            email: verified.email,
        })
    }

    /// [`identify`](Self::identify) from a raw `Authorization` header value.
    pub fn identify_bearer(&self, header: Option<&str>) -> Result<Identity, AuthError> {
        let header = header.ok_or_else(|| {
            debug!("missing authorization header");
            AuthError::Unauthenticated
        })?;
        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            debug!("invalid authorization scheme");
            AuthError::Unauthenticated
        })?;
        self.identify(token.trim())
    }
}

impl<S> SessionManager<S>
where
    S: PrincipalRepository + CredentialStore + ?Sized,
{
    /// Register a new principal and open its first session.
    pub async fn sign_up(&self, req: SignUpRequest) -> Result<Session, AuthError> {
        let email = normalize_email(&req.email);
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::Validation("A valid email is required".into()));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if req.password.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::Validation(format!(
                "Password must be at most {MAX_PASSWORD_BYTES} bytes"
            )));
        }
        let name = req.name.trim();
        if name.is_empty() {
            return Err(AuthError::Validation("Name is required".into()));
        }
        let role = match req.role.as_deref().map(str::trim) {
            None | Some("") => Role::Student,
            Some(raw) => raw.parse::<Role>().map_err(|_| {
                AuthError::Validation("Role must be STUDENT, TEACHER, or ORGANIZER".into())
            })?,
        };

        if self.store.email_exists(&email).await? {
            return Err(AuthError::Conflict);
        }

        let password_hash = hash_password(&req.password)?;
        let principal = self
            .store
            .create_principal(NewPrincipal {
                email,
                name: name.to_string(),
                password_hash,
                role,
            })
            .await
            .map_err(|e| match e {
                StorageError::Duplicate(_) => AuthError::Conflict,
                other => AuthError::Storage(other),
            })?;

        info!(principal_id = %principal.id, role = %principal.role, "principal signed up");
        self.open_session(principal).await
    }

    /// Authenticate with email + password and open an additional session.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email);
        let Some(found) = self.store.find_principal_by_email(&email).await? else {
            if let Some(hash) = dummy_hash() {
                let _ = verify_password(password, hash);
            }
            debug!("sign-in for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &found.password_hash) {
            debug!(principal_id = %found.principal.id, "sign-in with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let mut principal = found.principal;
        principal.last_login = Some(now);
        let session = self.open_session(principal).await?;
        self.store.record_login(session.principal.id, now).await?;

        info!(principal_id = %session.principal.id, "principal signed in");
        Ok(session)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The refresh credential itself is neither rotated nor re-persisted.
    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, AuthError> {
        let verified = self.codec.verify(refresh_token).map_err(|e: CodecError| {
            debug!(reason = %e, "refresh token rejected by codec");
            AuthError::InvalidToken
        })?;
        if verified.kind != TokenKind::Refresh {
            debug!(kind = ?verified.kind, "non-refresh token presented for refresh");
            return Err(AuthError::InvalidToken);
        }

        let credential = self
            .store
            .find_valid(refresh_token, verified.principal_id, Utc::now())
            .await?;
        if credential.is_none() {
            debug!(principal_id = %verified.principal_id, "refresh credential missing or expired");
            return Err(AuthError::InvalidToken);
        }

        let principal = self
            .store
            .find_principal(verified.principal_id)
            .await?
            .ok_or(AuthError::NotFound)?;

        let access = self
            .codec
            .issue(principal.id, &principal.email, TokenKind::Access)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))?;

        Ok(RefreshedAccess {
            access_token: access.token,
            expires_in: self.codec.access_ttl().num_seconds(),
        })
    }

    /// Delete the credential matching `refresh_token`. Succeeds whether or not
    /// such a credential exists.
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        self.store.delete_by_value(refresh_token).await?;
        Ok(())
    }

    /// Delete every refresh credential of a principal.
    pub async fn logout_all(&self, principal_id: Uuid) -> Result<u64, AuthError> {
        let removed = self.store.delete_all_for(principal_id).await?;
        info!(%principal_id, removed, "revoked all refresh credentials");
        Ok(removed)
    }

    /// Issue an access + refresh pair and persist the refresh credential.
    ///
    /// Tokens are returned only after the credential is stored.
    async fn open_session(&self, principal: Principal) -> Result<Session, AuthError> {
        let access = self
            .codec
            .issue(principal.id, &principal.email, TokenKind::Access)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))?;
        let refresh = self
            .codec
            .issue(principal.id, &principal.email, TokenKind::Refresh)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))?;

        self.store
            .save(principal.id, &refresh.token, refresh.expires_at)
            .await?;

        Ok(Session {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: self.codec.access_ttl().num_seconds(),
            principal,
        })
    }
}
