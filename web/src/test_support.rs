use crate::AppState;
use chrono::{Duration, Utc};
use clap::Parser;
use domain::jwt::SessionClaims;
use jsonwebtoken::{encode, EncodingKey, Header};
use service::config::Config;

pub(crate) const JWT_SECRET: &str = "test-session-secret";
pub(crate) const WEBHOOK_SECRET: &str = "whsec_test";

pub(crate) fn config(args: &[&str]) -> Config {
    Config::parse_from(std::iter::once("creative_ink").chain(args.iter().copied()))
}

/// State with both secrets configured.
pub(crate) fn app_state() -> AppState {
    AppState::new(
        config(&[])
            .set_session_jwt_secret(JWT_SECRET.to_string())
            .set_webhook_signing_secret(WEBHOOK_SECRET.to_string()),
    )
}

pub(crate) fn token_for(user_id: &str, role: Option<&str>) -> String {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::minutes(5)).timestamp() as usize,
        iss: None,
        role: role.map(str::to_string),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

pub(crate) fn bearer(user_id: &str, role: Option<&str>) -> String {
    format!("Bearer {}", token_for(user_id, role))
}
