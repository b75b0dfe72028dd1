use crate::extractors::RejectionType;
use crate::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use domain::error::{DomainErrorKind, InternalErrorKind};
use domain::jwt::{self, SessionUser};
use log::*;

/// Cookie the auth provider stores the session token in.
const SESSION_COOKIE: &str = "__session";

pub(crate) struct AuthenticatedUser(pub SessionUser);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = RejectionType;

    // Reads the session token from the Authorization header, falling back to the
    // session cookie, which is all a browser EventSource can send.
    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| session_cookie(parts))
            .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()))?;

        match jwt::verify_session_token(&state.config, &token) {
            Ok(user) => {
                trace!("Authenticated session for user {}", user.id);
                Ok(AuthenticatedUser(user))
            }
            Err(e) if e.error_kind == DomainErrorKind::Internal(InternalErrorKind::Config) => Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL SERVER ERROR".to_string(),
            )),
            Err(_) => Err((StatusCode::UNAUTHORIZED, "Unauthorized".to_string())),
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

fn session_cookie(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/sse");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_is_read_from_authorization_header() {
        let parts = parts(&[("authorization", "Bearer abc.def.ghi")]);
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn test_non_bearer_authorization_is_ignored() {
        let parts = parts(&[("authorization", "Basic dXNlcjpwYXNz")]);
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn test_session_cookie_is_found_among_others() {
        let parts = parts(&[("cookie", "theme=dark; __session=tok123; __client_uat=1")]);
        assert_eq!(session_cookie(&parts), Some("tok123".to_string()));
    }

    #[test]
    fn test_missing_session_cookie() {
        let parts = parts(&[("cookie", "theme=dark")]);
        assert_eq!(session_cookie(&parts), None);
    }
}
