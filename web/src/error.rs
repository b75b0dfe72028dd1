use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use domain::error::{
    AuthErrorKind, DomainErrorKind, Error as DomainError, ExternalErrorKind, InternalErrorKind,
    ValidationErrorKind, WebhookErrorKind,
};
use log::*;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug)]
pub struct Error(DomainError);

impl Error {
    pub fn kind(&self) -> &DomainErrorKind {
        &self.0.error_kind
    }

    fn status_code(&self) -> StatusCode {
        match &self.0.error_kind {
            DomainErrorKind::Internal(internal_error_kind) => match internal_error_kind {
                InternalErrorKind::Validation(validation_error_kind) => {
                    match validation_error_kind {
                        ValidationErrorKind::Invalid | ValidationErrorKind::UnknownStatus => {
                            StatusCode::UNPROCESSABLE_ENTITY
                        }
                    }
                }
                InternalErrorKind::Auth(auth_error_kind) => match auth_error_kind {
                    AuthErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
                    AuthErrorKind::Forbidden => StatusCode::FORBIDDEN,
                },
                InternalErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
            },
            DomainErrorKind::External(external_error_kind) => match external_error_kind {
                ExternalErrorKind::Webhook(webhook_error_kind) => match webhook_error_kind {
                    WebhookErrorKind::MissingSignature | WebhookErrorKind::InvalidSignature => {
                        StatusCode::UNAUTHORIZED
                    }
                    WebhookErrorKind::InvalidPayload => StatusCode::BAD_REQUEST,
                },
            },
        }
    }
}

impl StdError for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

// List of possible StatusCode variants https://docs.rs/http/latest/http/status/struct.StatusCode.html#associatedconstant.UNPROCESSABLE_ENTITY
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            debug!("Request rejected with {status}: {self}");
        }

        let reason = status.canonical_reason().unwrap_or("ERROR").to_uppercase();
        (status, reason).into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<DomainError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::error::{auth_error, config_error, validation_error, webhook_error};

    #[test]
    fn test_status_codes_for_error_kinds() {
        let cases = [
            (
                Error::from(validation_error(ValidationErrorKind::Invalid, "bad")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                Error::from(auth_error(AuthErrorKind::Unauthenticated, "no token")),
                StatusCode::UNAUTHORIZED,
            ),
            (
                Error::from(auth_error(AuthErrorKind::Forbidden, "not admin")),
                StatusCode::FORBIDDEN,
            ),
            (
                Error::from(webhook_error(WebhookErrorKind::InvalidSignature, "bad sig")),
                StatusCode::UNAUTHORIZED,
            ),
            (
                Error::from(webhook_error(WebhookErrorKind::InvalidPayload, "bad json")),
                StatusCode::BAD_REQUEST,
            ),
            (Error::from(config_error("missing")), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
