//! Event system infrastructure for Creative Ink.
//!
//! This crate decouples the code that observes a change (a provider webhook,
//! an administrator action) from the infrastructure that reacts to it (SSE
//! push notifications).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing all business events in the system
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies. Job snapshots are carried as serialized JSON values.

use async_trait::async_trait;
use log::*;
use serde_json::Value;
use std::sync::Arc;

/// Identity of a platform user as issued by the auth provider (e.g. `user_2abc...`).
pub type UserId = String;

/// Identifier of a generation job. Provider job ids are opaque strings.
pub type JobId = String;

/// Domain events that represent business-level changes in the system.
///
/// Events include user IDs for notification routing. The domain layer is
/// responsible for determining which users should be notified.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// A generation job was accepted or reported progress.
    GenerationJobProgressed {
        job_id: JobId,
        /// Lower-case job kind (`image`, `video`, `voice`), used as the SSE category.
        category: String,
        /// Serialized job snapshot sent to the frontend as-is.
        job: Value,
        notify_user_ids: Vec<UserId>,
    },
    /// A generation job finished and its outputs are available.
    GenerationJobCompleted {
        job_id: JobId,
        category: String,
        job: Value,
        notify_user_ids: Vec<UserId>,
    },
    /// A generation job failed, was cancelled, or timed out at the provider.
    GenerationJobFailed {
        job_id: JobId,
        category: String,
        job: Value,
        error: String,
        notify_user_ids: Vec<UserId>,
    },
    /// Every session of a user was revoked. Open streams are told to log out
    /// and are then closed.
    UserSessionRevoked { user_id: UserId, reason: String },
    /// An administrator published a platform-wide announcement.
    AnnouncementPublished { message: Value },
}

impl DomainEvent {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::GenerationJobProgressed { .. } => "generation_job_progressed",
            DomainEvent::GenerationJobCompleted { .. } => "generation_job_completed",
            DomainEvent::GenerationJobFailed { .. } => "generation_job_failed",
            DomainEvent::UserSessionRevoked { .. } => "user_session_revoked",
            DomainEvent::AnnouncementPublished { .. } => "announcement_published",
        }
    }
}

/// Trait for handling domain events.
/// Implementations can perform side effects like sending notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Publish an event to all registered handlers, in registration order.
    pub async fn publish(&self, event: DomainEvent) {
        trace!(
            "Publishing {} to {} handler(s)",
            event.name(),
            self.handlers.len()
        );
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
