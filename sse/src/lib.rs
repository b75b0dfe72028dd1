//! Server-Sent Events (SSE) infrastructure for real-time job-status updates.
//!
//! This crate fans out push notifications from the backend to the browser
//! tabs a user has open, without any client polling.
//!
//! # Architecture
//!
//! - **Many connections per user**: Every open tab registers its own
//!   connection; all of them receive the user's events.
//! - **Dual-index registry**: O(1) lookups for both connection management and
//!   user-scoped message routing via separate DashMap indices. A user with no
//!   connections has no index entry.
//! - **Category filters**: A connection may ask for one category only (e.g.
//!   `video`); categorized events skip connections filtered to another one.
//! - **Lazy cleanup**: A connection whose sink fails during a pass is removed
//!   after the pass. The heartbeat is what finds dead connections between
//!   publishes.
//! - **Ephemeral messages**: If a user is offline, they miss the event and
//!   see fresh data on next page load. Each process has its own registry.
//!
//! # Message Flow
//!
//! 1. Frontend opens `/sse?category=video`
//! 2. Backend verifies the session token (AuthenticatedUser)
//! 3. Connection registered in ConnectionRegistry with dual indices
//! 4. A provider webhook reports a job status change:
//!    - Domain layer emits a `DomainEvent` with the users to notify
//!    - `SseDomainEventHandler` turns it into a `Message`
//!    - Manager serializes the event once and writes the frame to matching
//!      connections
//! 5. Frontend receives the event and updates the job card
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry, frames and the `Sink` abstraction
//! - `manager`: High-level message routing (delegates to ConnectionRegistry)
//! - `message`: Type-safe event, scope and category definitions
//! - `heartbeat`: Background keep-alive and dead connection eviction
//! - `domain_event_handler`: Bridge from `events::DomainEvent` to SSE messages

pub mod connection;
pub mod domain_event_handler;
pub mod heartbeat;
pub mod manager;
pub mod message;

pub use heartbeat::Heartbeat;
pub use manager::{ConnectionGuard, Manager};
