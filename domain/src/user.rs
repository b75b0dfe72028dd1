use crate::error::{validation_error, Error, ValidationErrorKind};
use events::{DomainEvent, EventPublisher};
use log::*;

/// Default reason shown to a user whose sessions were revoked without one.
pub const DEFAULT_REVOKE_REASON: &str = "Your session was ended by an administrator";

/// Ends every open stream of `user_id`. Their tabs receive a `force_logout`
/// event followed by a terminal frame.
pub async fn revoke_sessions(
    publisher: &EventPublisher,
    user_id: &str,
    reason: Option<String>,
) -> Result<(), Error> {
    if user_id.trim().is_empty() {
        return Err(validation_error(ValidationErrorKind::Invalid, "user_id must not be empty"));
    }

    let reason = reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REVOKE_REASON.to_string());
    info!("Revoking sessions for user {}: {}", user_id, reason);

    publisher
        .publish(DomainEvent::UserSessionRevoked {
            user_id: user_id.to_string(),
            reason,
        })
        .await;
    Ok(())
}
