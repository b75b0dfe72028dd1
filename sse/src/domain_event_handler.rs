use crate::message::{Category, Event as SseEvent, Message as SseMessage};
use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler, UserId};
use log::*;
use std::sync::Arc;

/// Handles domain events by converting them to SSE messages and pushing them
/// to the affected users' open connections.
///
/// The domain layer determines which users should be notified and includes
/// their IDs in the event. This handler simply routes the SSE messages.
pub struct SseDomainEventHandler {
    sse_manager: Arc<Manager>,
}

impl SseDomainEventHandler {
    pub fn new(sse_manager: Arc<Manager>) -> Self {
        Self { sse_manager }
    }

    /// A job event with an unusable category is dropped rather than delivered
    /// unfiltered to connections that asked for another category.
    fn job_category(job_id: &str, category: &str) -> Option<Category> {
        match category.parse() {
            Ok(category) => Some(category),
            Err(e) => {
                error!("Dropping event for job {}: {}", job_id, e);
                None
            }
        }
    }

    /// Send an SSE message to all specified users.
    fn send_to_users(&self, sse_event: SseEvent, user_ids: &[UserId]) {
        let mut delivered = 0;
        for user_id in user_ids {
            delivered += self
                .sse_manager
                .send_message(SseMessage::to_user(user_id.clone(), sse_event.clone()))
                .delivered;
        }

        debug!(
            "Sent SSE event to {} connection(s) across {} user(s): {:?}",
            delivered,
            user_ids.len(),
            user_ids
        );
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::GenerationJobProgressed {
                job_id,
                category,
                job,
                notify_user_ids,
            } => {
                debug!("Handling GenerationJobProgressed event for job {}", job_id);
                let Some(category) = Self::job_category(job_id, category) else {
                    return;
                };

                let sse_event = SseEvent::JobProgress {
                    job_id: job_id.clone(),
                    category,
                    job: job.clone(),
                };

                self.send_to_users(sse_event, notify_user_ids);
            }

            DomainEvent::GenerationJobCompleted {
                job_id,
                category,
                job,
                notify_user_ids,
            } => {
                debug!("Handling GenerationJobCompleted event for job {}", job_id);
                let Some(category) = Self::job_category(job_id, category) else {
                    return;
                };

                let sse_event = SseEvent::JobCompleted {
                    job_id: job_id.clone(),
                    category,
                    job: job.clone(),
                };

                self.send_to_users(sse_event, notify_user_ids);
            }

            DomainEvent::GenerationJobFailed {
                job_id,
                category,
                job,
                error,
                notify_user_ids,
            } => {
                debug!("Handling GenerationJobFailed event for job {}", job_id);
                let Some(category) = Self::job_category(job_id, category) else {
                    return;
                };

                let sse_event = SseEvent::JobFailed {
                    job_id: job_id.clone(),
                    category,
                    job: job.clone(),
                    error: error.clone(),
                };

                self.send_to_users(sse_event, notify_user_ids);
            }

            DomainEvent::UserSessionRevoked { user_id, reason } => {
                debug!("Handling UserSessionRevoked event for user {}", user_id);

                // Tell the open tabs why before their streams are closed
                self.send_to_users(
                    SseEvent::ForceLogout {
                        reason: reason.clone(),
                    },
                    std::slice::from_ref(user_id),
                );
                self.sse_manager.disconnect_user(user_id, reason);
            }

            DomainEvent::AnnouncementPublished { message } => {
                let delivery = self
                    .sse_manager
                    .broadcast_all(SseEvent::Announcement {
                        message: message.clone(),
                    });
                info!(
                    "Broadcast announcement to {} connection(s)",
                    delivery.delivered
                );
            }
        }
    }
}
