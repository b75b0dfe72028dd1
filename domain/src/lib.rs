//! Business rules for Creative Ink's push service: what a provider's job
//! report means, who may open a stream, and which webhooks are genuine.
//!
//! Every state change ends as an `events::DomainEvent`; this crate never
//! touches connections directly.

pub mod announcement;
pub mod error;
pub mod job;
pub mod jwt;
pub mod user;
pub mod webhook;

pub use events::{EventPublisher, UserId};
