use crate::connection::{ConnectionId, ConnectionRegistry, Delivery, Frame, Sink, UserId};
use crate::message::{Category, Event, EventType, Message as SseMessage, MessageScope};
use log::*;
use std::sync::Arc;

pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Register a new connection and return its unique ID
    pub fn register_connection(
        &self,
        user_id: UserId,
        category: Option<Category>,
        sink: impl Sink + 'static,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.register_connection_as(connection_id.clone(), user_id, category, sink);
        connection_id
    }

    /// Register a connection under a pre-generated ID. Frames already written
    /// to `sink` stay ahead of anything published afterwards.
    pub fn register_connection_as(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        category: Option<Category>,
        sink: impl Sink + 'static,
    ) {
        self.registry.register_as(
            connection_id.clone(),
            user_id.clone(),
            category.clone(),
            Box::new(sink),
        );
        info!(
            "Registered SSE connection {} for user {} (category: {})",
            connection_id,
            user_id,
            category.as_ref().map(Category::as_str).unwrap_or("all")
        );
    }

    /// Unregister a connection by ID
    pub fn unregister_connection(&self, connection_id: &ConnectionId) {
        if self.registry.unregister(connection_id) {
            info!("Unregistered SSE connection {}", connection_id);
        }
    }

    /// Serialize an event once into a frame that every recipient shares.
    pub fn frame_for(event: &Event) -> Result<Frame, serde_json::Error> {
        let data = serde_json::to_string(event)?;
        Ok(Frame::Event {
            event_type: event.event_type(),
            data: data.into(),
        })
    }

    /// Send a message based on its scope
    pub fn send_message(&self, message: SseMessage) -> Delivery {
        let frame = match Self::frame_for(&message.event) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Failed to serialize SSE event: {e}");
                return Delivery::default();
            }
        };

        let delivery = match &message.scope {
            MessageScope::User { user_id } => {
                self.registry
                    .send_to_user(user_id, &frame, message.category.as_ref())
            }
            MessageScope::Broadcast => self.registry.broadcast(&frame, message.category.as_ref()),
        };

        trace!(
            "Delivered {} to {} connection(s), evicted {}",
            message.event.event_type(),
            delivery.delivered,
            delivery.evicted
        );
        delivery
    }

    /// Send an event to every connection of one user, narrowed by the event's category.
    pub fn publish(&self, user_id: impl Into<UserId>, event: Event) -> Delivery {
        self.send_message(SseMessage::to_user(user_id, event))
    }

    /// Send an event to every connection of every user (administrative use).
    pub fn broadcast_all(&self, event: Event) -> Delivery {
        self.send_message(SseMessage::broadcast(event))
    }

    /// Write a keep-alive frame to every connection and evict those that fail.
    /// Returns the number of evicted connections.
    pub fn heartbeat(&self) -> usize {
        let delivery = self.registry.broadcast(&Frame::KeepAlive, None);
        if delivery.evicted > 0 {
            debug!(
                "Heartbeat evicted {} dead SSE connection(s), {} remain",
                delivery.evicted,
                self.registry.connection_count()
            );
        }
        delivery.evicted
    }

    /// Send a terminal frame to all of a user's connections and drop them.
    pub fn disconnect_user(&self, user_id: &UserId, reason: &str) -> usize {
        let closed = self.registry.close_user(user_id, &Frame::close(reason));
        if closed > 0 {
            info!(
                "Closed {} SSE connection(s) for user {}: {}",
                closed, user_id, reason
            );
        }
        closed
    }

    /// Send a terminal frame to every connection and empty the registry.
    pub fn close_all(&self, reason: &str) -> usize {
        let closed = self.registry.close_all(&Frame::close(reason));
        info!("Closed all {} SSE connection(s): {}", closed, reason);
        closed
    }

    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }

    pub fn user_count(&self) -> usize {
        self.registry.user_count()
    }

    pub fn user_connection_count(&self, user_id: &UserId) -> usize {
        self.registry.user_connection_count(user_id)
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

/// Unregisters its connection when dropped.
///
/// Held by the streaming response so that a client disconnect (the response
/// stream is dropped mid-flight) cleans up as reliably as a normal end of stream.
pub struct ConnectionGuard {
    manager: Arc<Manager>,
    connection_id: ConnectionId,
}

impl ConnectionGuard {
    pub fn new(manager: Arc<Manager>, connection_id: ConnectionId) -> Self {
        Self {
            manager,
            connection_id,
        }
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        debug!("SSE connection {} closed, cleaning up", self.connection_id);
        self.manager.unregister_connection(&self.connection_id);
    }
}
