//! Error types for the `domain` layer.
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer.
/// The `source` field holds the original error, if any. `web` maps the kinds to
/// HTTP status codes and never needs to see the underlying library errors.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Errors caused by our own state or by invalid input.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Validation(ValidationErrorKind),
    Auth(AuthErrorKind),
    Config,
}

/// Errors from validating caller input (job reports, admin requests).
#[derive(Debug, PartialEq)]
pub enum ValidationErrorKind {
    Invalid,
    UnknownStatus,
}

/// Errors from verifying who is making a request.
#[derive(Debug, PartialEq)]
pub enum AuthErrorKind {
    Unauthenticated,
    Forbidden,
}

/// Errors caused by what an external caller (a provider webhook) sent us.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Webhook(WebhookErrorKind),
}

#[derive(Debug, PartialEq)]
pub enum WebhookErrorKind {
    MissingSignature,
    InvalidSignature,
    InvalidPayload,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Auth(
                AuthErrorKind::Unauthenticated,
            )),
        }
    }
}

// Well-formed JSON with missing or mistyped fields is invalid input; anything
// that is not JSON at all is a malformed payload.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        let error_kind = match err.classify() {
            serde_json::error::Category::Data => {
                DomainErrorKind::Internal(InternalErrorKind::Validation(ValidationErrorKind::Invalid))
            }
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Eof
            | serde_json::error::Category::Io => DomainErrorKind::External(
                ExternalErrorKind::Webhook(WebhookErrorKind::InvalidPayload),
            ),
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

/// Helper function to create input validation errors.
pub fn validation_error(kind: ValidationErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Validation(kind)),
    }
}

/// Helper function to create authentication and authorization errors.
pub fn auth_error(kind: AuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Auth(kind)),
    }
}

/// Helper function to create webhook errors.
pub fn webhook_error(kind: WebhookErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::External(ExternalErrorKind::Webhook(kind)),
    }
}

/// Helper function to create configuration errors.
pub fn config_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatusUpdate;

    fn parse(body: &str) -> DomainErrorKind {
        serde_json::from_str::<JobStatusUpdate>(body)
            .map_err(Error::from)
            .unwrap_err()
            .error_kind
    }

    #[test]
    fn test_well_formed_json_with_bad_fields_is_invalid_input() {
        let invalid =
            DomainErrorKind::Internal(InternalErrorKind::Validation(ValidationErrorKind::Invalid));

        assert_eq!(
            parse(r#"{"job_id":"j","user_id":"u","kind":"audio","status":"COMPLETED"}"#),
            invalid
        );
        assert_eq!(
            parse(r#"{"job_id":"j","user_id":"u","kind":"video","status":"COMPLETED","progress":300}"#),
            invalid
        );
        assert_eq!(
            parse(r#"{"job_id":"j","kind":"video","status":"COMPLETED"}"#),
            invalid
        );
    }

    #[test]
    fn test_broken_json_is_a_malformed_payload() {
        let malformed =
            DomainErrorKind::External(ExternalErrorKind::Webhook(WebhookErrorKind::InvalidPayload));

        assert_eq!(parse("{not json"), malformed);
        assert_eq!(parse(r#"{"job_id":"j""#), malformed);
    }
}
