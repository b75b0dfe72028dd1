use crate::Manager;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Default spacing between keep-alive frames.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Periodically writes a keep-alive frame to every connection.
///
/// Besides keeping idle proxies from closing the stream, this is the only
/// place dead connections are discovered when nothing is being published.
pub struct Heartbeat {
    manager: Arc<Manager>,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(manager: Arc<Manager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// Run the heartbeat on the current tokio runtime until the handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(
            "Starting SSE heartbeat every {}s",
            self.interval.as_secs_f32()
        );

        tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; connections are brand new then.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let evicted = self.manager.heartbeat();
                trace!(
                    "Heartbeat sent to {} connection(s), evicted {}",
                    self.manager.connection_count(),
                    evicted
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::test_sinks::RecordingSink;
    use crate::connection::Frame;

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_evicts_closed_connection_on_tick() {
        let manager = Arc::new(Manager::new());
        let alive = RecordingSink::default();
        let dead = RecordingSink::default();
        manager.register_connection("user_1".to_string(), None, alive.clone());
        manager.register_connection("user_2".to_string(), None, dead.clone());
        dead.close();

        let handle = Heartbeat::new(manager.clone(), DEFAULT_INTERVAL).spawn();

        time::sleep(DEFAULT_INTERVAL + Duration::from_secs(1)).await;

        assert_eq!(manager.connection_count(), 1);
        assert_eq!(manager.user_count(), 1);
        assert_eq!(alive.frames(), vec![Frame::KeepAlive]);
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_keeps_running_after_eviction() {
        let manager = Arc::new(Manager::new());
        let alive = RecordingSink::default();
        manager.register_connection("user_1".to_string(), None, alive.clone());
        manager.register_connection("user_2".to_string(), None, RecordingSink::closed());

        let handle = Heartbeat::new(manager.clone(), Duration::from_secs(5)).spawn();

        time::sleep(Duration::from_secs(16)).await;

        assert_eq!(alive.frames().len(), 3);
        assert_eq!(manager.connection_count(), 1);
        assert!(!handle.is_finished());
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_does_not_fire_immediately() {
        let manager = Arc::new(Manager::new());
        let sink = RecordingSink::default();
        manager.register_connection("user_1".to_string(), None, sink.clone());

        let handle = Heartbeat::new(manager.clone(), DEFAULT_INTERVAL).spawn();
        time::sleep(Duration::from_secs(1)).await;

        assert!(sink.frames().is_empty());
        handle.abort();
    }
}
