use crate::message::Category;
use axum::response::sse::Event;
use dashmap::DashMap;
use log::*;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

// Type alias for user IDs (web layer passes the session subject through as-is)
pub type UserId = String;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single unit written to a connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A named event. `data` is serialized once per publish and shared by all
    /// recipients.
    Event {
        event_type: &'static str,
        data: Arc<str>,
    },
    /// Zero-payload comment frame that keeps proxies from timing the stream out.
    KeepAlive,
    /// Terminal frame. The stream ends after delivering it.
    Close { data: Arc<str> },
}

impl Frame {
    pub fn close(reason: &str) -> Self {
        Frame::Close {
            data: serde_json::json!({ "reason": reason }).to_string().into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Frame::Close { .. })
    }
}

impl From<Frame> for Event {
    fn from(frame: Frame) -> Self {
        match frame {
            Frame::Event { event_type, data } => Event::default().event(event_type).data(&*data),
            Frame::KeepAlive => Event::default().comment(""),
            Frame::Close { data } => Event::default().event("close").data(&*data),
        }
    }
}

/// The destination of a connection went away; nothing more can be written to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

impl fmt::Display for SinkClosed {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("connection sink is closed")
    }
}

impl std::error::Error for SinkClosed {}

/// Writable destination for a stream of frames. Writes must not block.
pub trait Sink: Send + Sync {
    fn write(&self, frame: Frame) -> Result<(), SinkClosed>;
}

impl Sink for UnboundedSender<Frame> {
    fn write(&self, frame: Frame) -> Result<(), SinkClosed> {
        self.send(frame).map_err(|_| SinkClosed)
    }
}

/// Connection information (no redundant connection_id)
pub struct ConnectionInfo {
    pub user_id: UserId,
    pub category: Option<Category>,
    sink: Box<dyn Sink>,
}

impl ConnectionInfo {
    /// Filtered connections only accept messages of their own category;
    /// uncategorized messages reach everyone.
    fn accepts(&self, category: Option<&Category>) -> bool {
        match (&self.category, category) {
            (Some(filter), Some(category)) => filter == category,
            _ => true,
        }
    }
}

/// Outcome of a single fan-out pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub evicted: usize,
}

/// Connection registry with dual indices for O(1) lookups.
///
/// Invariant: a user with no connections has no entry in `user_index`.
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, ConnectionInfo>,

    /// Secondary index: user_id to that user's connections in registration order
    user_index: DashMap<UserId, Vec<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_index: DashMap::new(),
        }
    }

    /// Register a new connection - O(1). No per-user limit is enforced.
    pub fn register(
        &self,
        user_id: UserId,
        category: Option<Category>,
        sink: Box<dyn Sink>,
    ) -> ConnectionId {
        let connection_id = ConnectionId::new();
        self.register_as(connection_id.clone(), user_id, category, sink);
        connection_id
    }

    /// Register under an id the caller generated, so frames can be queued on
    /// the sink before it becomes visible to publishers.
    pub fn register_as(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        category: Option<Category>,
        sink: Box<dyn Sink>,
    ) {
        // Primary storage first so routing never sees an index entry without info
        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                user_id: user_id.clone(),
                category,
                sink,
            },
        );

        self.user_index
            .entry(user_id)
            .or_default()
            .push(connection_id);
    }

    /// Unregister a connection - O(1) plus the size of the user's connection list.
    /// Returns false when the connection was already gone.
    pub fn unregister(&self, connection_id: &ConnectionId) -> bool {
        self.remove(connection_id).is_some()
    }

    fn remove(&self, connection_id: &ConnectionId) -> Option<ConnectionInfo> {
        let (_, info) = self.connections.remove(connection_id)?;

        if let Some(mut ids) = self.user_index.get_mut(&info.user_id) {
            ids.retain(|id| id != connection_id);
        }
        // Checked under the shard lock so a concurrent register is never dropped
        self.user_index
            .remove_if(&info.user_id, |_, ids| ids.is_empty());

        Some(info)
    }

    /// Send a frame to every accepting connection of one user.
    /// Connections whose sink fails are removed after the pass.
    pub fn send_to_user(
        &self,
        user_id: &UserId,
        frame: &Frame,
        category: Option<&Category>,
    ) -> Delivery {
        // Copy the ids so no index guard is held while writing or evicting
        let connection_ids = match self.user_index.get(user_id) {
            Some(ids) => ids.clone(),
            None => return Delivery::default(),
        };

        let mut delivered = 0;
        let mut failed = Vec::new();
        for conn_id in connection_ids {
            let result = match self.connections.get(&conn_id) {
                Some(info) if info.accepts(category) => info.sink.write(frame.clone()),
                _ => continue,
            };

            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        "Failed to send event to connection {}: {}. Connection will be cleaned up.",
                        conn_id, e
                    );
                    failed.push(conn_id);
                }
            }
        }

        Delivery {
            delivered,
            evicted: self.evict(failed),
        }
    }

    /// Send a frame to every accepting connection - O(n)
    pub fn broadcast(&self, frame: &Frame, category: Option<&Category>) -> Delivery {
        let mut delivered = 0;
        let mut failed = Vec::new();
        for entry in self.connections.iter() {
            if !entry.value().accepts(category) {
                continue;
            }
            match entry.value().sink.write(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(
                        "Failed to send broadcast to connection {}: {}",
                        entry.key(),
                        e
                    );
                    failed.push(entry.key().clone());
                }
            }
        }

        Delivery {
            delivered,
            evicted: self.evict(failed),
        }
    }

    /// Write a terminal frame to each of the user's connections and drop them all.
    pub fn close_user(&self, user_id: &UserId, frame: &Frame) -> usize {
        let connection_ids = match self.user_index.get(user_id) {
            Some(ids) => ids.clone(),
            None => return 0,
        };

        self.close_each(connection_ids, frame)
    }

    /// Write a terminal frame to every connection and drop them all.
    pub fn close_all(&self, frame: &Frame) -> usize {
        let connection_ids: Vec<ConnectionId> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();

        self.close_each(connection_ids, frame)
    }

    fn close_each(&self, connection_ids: Vec<ConnectionId>, frame: &Frame) -> usize {
        let mut closed = 0;
        for conn_id in connection_ids {
            if let Some(info) = self.remove(&conn_id) {
                if info.sink.write(frame.clone()).is_err() {
                    debug!("Connection {} was already gone before close", conn_id);
                }
                closed += 1;
            }
        }
        closed
    }

    fn evict(&self, failed: Vec<ConnectionId>) -> usize {
        failed
            .iter()
            .filter(|conn_id| self.unregister(conn_id))
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn user_count(&self) -> usize {
        self.user_index.len()
    }

    pub fn user_connection_count(&self, user_id: &UserId) -> usize {
        self.user_index
            .get(user_id)
            .map(|ids| ids.len())
            .unwrap_or(0)
    }

    pub fn contains_user(&self, user_id: &UserId) -> bool {
        self.user_index.contains_key(user_id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod tests {
    use super::test_sinks::RecordingSink;
    use super::*;

    fn event_frame(data: &str) -> Frame {
        Frame::Event {
            event_type: "job_progress",
            data: data.into(),
        }
    }

    fn video() -> Category {
        "video".parse().unwrap()
    }

    #[test]
    fn test_two_connections_for_same_user_both_receive() {
        let registry = ConnectionRegistry::new();
        let first = RecordingSink::default();
        let second = RecordingSink::default();
        registry.register("user_1".to_string(), None, Box::new(first.clone()));
        registry.register("user_1".to_string(), None, Box::new(second.clone()));

        let delivery = registry.send_to_user(&"user_1".to_string(), &event_frame("{}"), None);

        assert_eq!(delivery, Delivery { delivered: 2, evicted: 0 });
        assert_eq!(first.frames(), vec![event_frame("{}")]);
        assert_eq!(second.frames(), vec![event_frame("{}")]);
    }

    #[test]
    fn test_send_to_user_does_not_leak_to_other_users() {
        let registry = ConnectionRegistry::new();
        let mine = RecordingSink::default();
        let theirs = RecordingSink::default();
        registry.register("user_1".to_string(), None, Box::new(mine.clone()));
        registry.register("user_2".to_string(), None, Box::new(theirs.clone()));

        registry.send_to_user(&"user_1".to_string(), &event_frame("{}"), None);

        assert_eq!(mine.frames().len(), 1);
        assert!(theirs.frames().is_empty());
    }

    #[test]
    fn test_unregistering_last_connection_removes_user_entry() {
        let registry = ConnectionRegistry::new();
        let user_id = "user_1".to_string();
        let first = registry.register(user_id.clone(), None, Box::new(RecordingSink::default()));
        let second = registry.register(user_id.clone(), None, Box::new(RecordingSink::default()));

        assert!(registry.unregister(&first));
        assert!(registry.contains_user(&user_id));
        assert_eq!(registry.user_connection_count(&user_id), 1);

        assert!(registry.unregister(&second));
        assert!(!registry.contains_user(&user_id));
        assert_eq!(registry.user_count(), 0);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let id = registry.register("user_1".to_string(), None, Box::new(RecordingSink::default()));

        assert!(registry.unregister(&id));
        assert!(!registry.unregister(&id));
    }

    #[test]
    fn test_failing_sink_is_attempted_once_and_evicted() {
        let registry = ConnectionRegistry::new();
        let user_id = "user_1".to_string();
        let dead = RecordingSink::closed();
        let alive = RecordingSink::default();
        registry.register(user_id.clone(), None, Box::new(dead.clone()));
        registry.register(user_id.clone(), None, Box::new(alive.clone()));

        let first = registry.send_to_user(&user_id, &event_frame("1"), None);
        assert_eq!(first, Delivery { delivered: 1, evicted: 1 });
        assert_eq!(dead.attempts(), 1);

        let second = registry.send_to_user(&user_id, &event_frame("2"), None);
        assert_eq!(second, Delivery { delivered: 1, evicted: 0 });
        assert_eq!(dead.attempts(), 1);
        assert_eq!(alive.frames().len(), 2);
        assert_eq!(registry.user_connection_count(&user_id), 1);
    }

    #[test]
    fn test_failing_only_sink_removes_user_entry() {
        let registry = ConnectionRegistry::new();
        let user_id = "user_1".to_string();
        registry.register(user_id.clone(), None, Box::new(RecordingSink::closed()));

        registry.send_to_user(&user_id, &event_frame("{}"), None);

        assert!(!registry.contains_user(&user_id));
    }

    #[test]
    fn test_category_only_reaches_matching_or_unfiltered_connections() {
        let registry = ConnectionRegistry::new();
        let user_id = "user_1".to_string();
        let video_sink = RecordingSink::default();
        let voice_sink = RecordingSink::default();
        let unfiltered = RecordingSink::default();
        registry.register(user_id.clone(), Some(video()), Box::new(video_sink.clone()));
        registry.register(
            user_id.clone(),
            Some("voice".parse().unwrap()),
            Box::new(voice_sink.clone()),
        );
        registry.register(user_id.clone(), None, Box::new(unfiltered.clone()));

        let delivery = registry.send_to_user(&user_id, &event_frame("{}"), Some(&video()));

        assert_eq!(delivery.delivered, 2);
        assert_eq!(video_sink.frames().len(), 1);
        assert_eq!(unfiltered.frames().len(), 1);
        assert!(voice_sink.frames().is_empty());
        assert_eq!(voice_sink.attempts(), 0);
    }

    #[test]
    fn test_uncategorized_frame_reaches_filtered_connections() {
        let registry = ConnectionRegistry::new();
        let filtered = RecordingSink::default();
        registry.register("user_1".to_string(), Some(video()), Box::new(filtered.clone()));

        registry.send_to_user(&"user_1".to_string(), &event_frame("{}"), None);

        assert_eq!(filtered.frames().len(), 1);
    }

    #[test]
    fn test_broadcast_reaches_all_users_and_evicts_dead() {
        let registry = ConnectionRegistry::new();
        let a = RecordingSink::default();
        let b = RecordingSink::default();
        registry.register("user_1".to_string(), None, Box::new(a.clone()));
        registry.register("user_2".to_string(), None, Box::new(b.clone()));
        registry.register("user_3".to_string(), None, Box::new(RecordingSink::closed()));

        let delivery = registry.broadcast(&event_frame("{}"), None);

        assert_eq!(delivery, Delivery { delivered: 2, evicted: 1 });
        assert_eq!(registry.user_count(), 2);
        assert_eq!(a.frames().len(), 1);
        assert_eq!(b.frames().len(), 1);
    }

    #[test]
    fn test_close_user_sends_terminal_frame_and_removes_all() {
        let registry = ConnectionRegistry::new();
        let user_id = "user_1".to_string();
        let tab_one = RecordingSink::default();
        let tab_two = RecordingSink::default();
        let other = RecordingSink::default();
        registry.register(user_id.clone(), Some(video()), Box::new(tab_one.clone()));
        registry.register(user_id.clone(), None, Box::new(tab_two.clone()));
        registry.register("user_2".to_string(), None, Box::new(other.clone()));

        let closed = registry.close_user(&user_id, &Frame::close("revoked"));

        assert_eq!(closed, 2);
        assert!(!registry.contains_user(&user_id));
        assert!(tab_one.frames()[0].is_terminal());
        assert!(tab_two.frames()[0].is_terminal());
        assert!(other.frames().is_empty());
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn test_close_all_empties_registry() {
        let registry = ConnectionRegistry::new();
        registry.register("user_1".to_string(), None, Box::new(RecordingSink::default()));
        registry.register("user_2".to_string(), None, Box::new(RecordingSink::closed()));

        assert_eq!(registry.close_all(&Frame::close("shutdown")), 2);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.user_count(), 0);
    }

    #[test]
    fn test_unbounded_sender_reports_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Frame>();
        assert!(tx.write(Frame::KeepAlive).is_ok());
        drop(rx);
        assert_eq!(tx.write(Frame::KeepAlive), Err(SinkClosed));
    }

    #[test]
    fn test_close_frame_carries_reason_as_json() {
        match Frame::close("server shutting down") {
            Frame::Close { data } => {
                let value: serde_json::Value = serde_json::from_str(&data).unwrap();
                assert_eq!(value["reason"], "server shutting down");
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }
}
