use config::Config;
use events::EventPublisher;
use sse::domain_event_handler::SseDomainEventHandler;
use sse::Manager;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state shared by every request handler.
// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sse_manager: Arc<Manager>,
    pub event_publisher: EventPublisher,
}

impl AppState {
    /// Builds state with a fresh connection registry whose domain events are
    /// routed to SSE connections.
    pub fn new(app_config: Config) -> Self {
        let sse_manager = Arc::new(Manager::new());
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(SseDomainEventHandler::new(sse_manager.clone())));

        Self {
            config: app_config,
            sse_manager,
            event_publisher,
        }
    }
}
