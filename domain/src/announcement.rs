use crate::error::{validation_error, Error, ValidationErrorKind};
use events::{DomainEvent, EventPublisher};
use serde_json::Value;

/// Pushes an announcement to every open connection.
pub async fn publish(publisher: &EventPublisher, message: Value) -> Result<(), Error> {
    let empty = match &message {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    };
    if empty {
        return Err(validation_error(
            ValidationErrorKind::Invalid,
            "announcement message must not be empty",
        ));
    }

    publisher
        .publish(DomainEvent::AnnouncementPublished { message })
        .await;
    Ok(())
}
