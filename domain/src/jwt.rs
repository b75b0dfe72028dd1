//! Verification of session tokens issued by the auth provider.
//!
//! The browser presents the provider's short-lived HS256 session JWT either
//! as a bearer token or in the `__session` cookie. Only the subject and an
//! optional `role` claim matter to this service.

use crate::error::{auth_error, config_error, AuthErrorKind, Error};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::*;
use serde::{Deserialize, Serialize};
use service::config::Config;

const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Member,
    Admin,
}

/// The verified identity behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub id: String,
    pub role: Role,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<SessionClaims> for SessionUser {
    fn from(claims: SessionClaims) -> Self {
        let role = match claims.role.as_deref() {
            Some(ADMIN_ROLE) => Role::Admin,
            _ => Role::Member,
        };
        SessionUser {
            id: claims.sub,
            role,
        }
    }
}

/// Verifies signature, expiry and (when configured) issuer of a session token.
pub fn verify_session_token(config: &Config, token: &str) -> Result<SessionUser, Error> {
    let secret = config.session_jwt_secret().ok_or_else(|| {
        error!("SESSION_JWT_SECRET is not configured; rejecting all sessions");
        config_error("Session JWT secret is not configured")
    })?;

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "sub"]);
    if let Some(issuer) = config.session_jwt_issuer() {
        validation.set_issuer(&[issuer]);
    }

    let claims = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        debug!("Rejected session token: {e}");
        Error::from(e)
    })?
    .claims;

    if claims.sub.trim().is_empty() {
        return Err(auth_error(
            AuthErrorKind::Unauthenticated,
            "Session token has an empty subject",
        ));
    }

    Ok(claims.into())
}
