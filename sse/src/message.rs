use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

const MAX_CATEGORY_LEN: usize = 32;

/// Trait for getting the SSE event type name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// Narrows which published events a connection receives, e.g. `video` for a
/// page that only shows video generations. Always lower-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct InvalidCategory(pub String);

impl fmt::Display for InvalidCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid event category: {:?}", self.0)
    }
}

impl std::error::Error for InvalidCategory {}

impl FromStr for Category {
    type Err = InvalidCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let valid = !normalized.is_empty()
            && normalized.len() <= MAX_CATEGORY_LEN
            && normalized
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');

        if valid {
            Ok(Category(normalized))
        } else {
            Err(InvalidCategory(value.to_string()))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    // Connection lifecycle
    #[serde(rename = "connected")]
    Connected { connection_id: String },

    // Generation jobs (category-scoped by job kind)
    #[serde(rename = "job_progress")]
    JobProgress {
        job_id: String,
        category: Category,
        job: Value,
    },
    #[serde(rename = "job_completed")]
    JobCompleted {
        job_id: String,
        category: Category,
        job: Value,
    },
    #[serde(rename = "job_failed")]
    JobFailed {
        job_id: String,
        category: Category,
        job: Value,
        error: String,
    },

    // System events
    #[serde(rename = "announcement")]
    Announcement { message: Value },
    #[serde(rename = "force_logout")]
    ForceLogout { reason: String },
}

impl EventType for Event {
    fn event_type(&self) -> &'static str {
        match self {
            Event::Connected { .. } => "connected",
            Event::JobProgress { .. } => "job_progress",
            Event::JobCompleted { .. } => "job_completed",
            Event::JobFailed { .. } => "job_failed",
            Event::Announcement { .. } => "announcement",
            Event::ForceLogout { .. } => "force_logout",
        }
    }
}

impl Event {
    /// The category a job event belongs to. System events are uncategorized
    /// and reach every connection in scope.
    pub fn category(&self) -> Option<Category> {
        match self {
            Event::JobProgress { category, .. }
            | Event::JobCompleted { category, .. }
            | Event::JobFailed { category, .. } => Some(category.clone()),
            Event::Connected { .. } | Event::Announcement { .. } | Event::ForceLogout { .. } => {
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub event: Event,
    pub scope: MessageScope,
    /// When set, only connections without a filter or with this exact filter
    /// receive the message.
    pub category: Option<Category>,
}

impl Message {
    pub fn to_user(user_id: impl Into<String>, event: Event) -> Self {
        let category = event.category();
        Self {
            event,
            scope: MessageScope::User {
                user_id: user_id.into(),
            },
            category,
        }
    }

    pub fn broadcast(event: Event) -> Self {
        let category = event.category();
        Self {
            event,
            scope: MessageScope::Broadcast,
            category,
        }
    }
}

#[derive(Debug, Clone)]
pub enum MessageScope {
    /// Send to all connections for a specific user
    User { user_id: String },
    /// Send to all connected users
    Broadcast,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_is_normalized_to_lower_case() {
        let category: Category = "  Video ".parse().unwrap();
        assert_eq!(category.as_str(), "video");
    }

    #[test]
    fn test_category_rejects_empty_and_punctuation() {
        assert!("".parse::<Category>().is_err());
        assert!("video/*".parse::<Category>().is_err());
        assert!("a".repeat(MAX_CATEGORY_LEN + 1).parse::<Category>().is_err());
        assert!("image-to_video".parse::<Category>().is_ok());
    }

    #[test]
    fn test_event_serializes_with_type_and_data_tags() {
        let event = Event::JobCompleted {
            job_id: "job_42".to_string(),
            category: "video".parse().unwrap(),
            job: json!({"id": "job_42", "status": "completed"}),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "job_completed",
                "data": {
                    "job_id": "job_42",
                    "category": "video",
                    "job": {"id": "job_42", "status": "completed"}
                }
            })
        );
        assert_eq!(event.event_type(), "job_completed");
    }

    #[test]
    fn test_message_to_user_takes_category_from_job_event() {
        let message = Message::to_user(
            "user_1",
            Event::JobProgress {
                job_id: "job_1".to_string(),
                category: "voice".parse().unwrap(),
                job: json!({}),
            },
        );
        assert_eq!(message.category, Some("voice".parse().unwrap()));
    }

    #[test]
    fn test_system_events_are_uncategorized() {
        let message = Message::broadcast(Event::ForceLogout {
            reason: "revoked".to_string(),
        });
        assert_eq!(message.category, None);
        assert!(matches!(message.scope, MessageScope::Broadcast));
    }
}
