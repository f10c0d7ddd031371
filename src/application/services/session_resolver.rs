//! Session/Identity Resolver
//!
//! Turns a raw connection credential into a `Principal`. Two credential
//! forms are supported concurrently: a server-side session lookup for web
//! clients and a self-contained signed token for desktop/API clients.
//! Both resolve to the same `Principal` shape so downstream components
//! are credential-agnostic. Pure lookup, no side effects; failure closes
//! the connection before any room join or presence registration.

use std::sync::Arc;

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{Principal, SessionRepository, UserRepository};
use crate::gateway::events::WireCredential;
use crate::shared::error::AppError;

/// A raw credential presented by a connecting client.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Cookie-backed session id (web clients)
    SessionCookie(String),
    /// Signed token with embedded expiry (desktop/API clients)
    SignedToken(String),
}

impl From<WireCredential> for Credential {
    fn from(wire: WireCredential) -> Self {
        match wire {
            WireCredential::Session(value) => Credential::SessionCookie(value),
            WireCredential::Token(value) => Credential::SignedToken(value),
        }
    }
}

/// Claims embedded in a signed token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Resolves connection credentials into principals.
pub struct SessionResolver {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionRepository>,
    token_secret: String,
}

impl SessionResolver {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
        token_secret: String,
    ) -> Self {
        Self {
            users,
            sessions,
            token_secret,
        }
    }

    /// Resolve a credential to a `Principal`, or fail with
    /// `AppError::Unauthenticated`.
    pub async fn resolve(&self, credential: &Credential) -> Result<Principal, AppError> {
        let username = match credential {
            Credential::SessionCookie(value) => self.resolve_session(value).await?,
            Credential::SignedToken(token) => self.verify_token(token)?,
        };

        let user = self
            .users
            .find_by_username(&username)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Unknown user".into()))?;

        Ok(user.principal())
    }

    /// Look up a web session by the hash of its cookie value.
    async fn resolve_session(&self, cookie_value: &str) -> Result<String, AppError> {
        let token_hash = hash_token(cookie_value);
        let session = self
            .sessions
            .find_valid(&token_hash)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Invalid or expired session".into()))?;
        Ok(session.username)
    }

    /// Verify a signed token's signature and expiry before trusting its
    /// embedded claims.
    fn verify_token(&self, token: &str) -> Result<String, AppError> {
        let token_data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.token_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::Unauthenticated(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims.sub)
    }
}

/// SHA-256 hash of a session cookie value, hex encoded. Raw credentials
/// never reach the store.
pub fn hash_token(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
