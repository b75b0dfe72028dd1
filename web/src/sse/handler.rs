use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::sse::IndexParams;
use crate::Error;
use domain::error::config_error;
use ::sse::connection::{ConnectionId, Frame};
use ::sse::message::Event as SseEvent;
use ::sse::{ConnectionGuard, Manager};
use async_stream::stream;
use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use futures::Stream;
use log::*;
use service::AppState;
use std::convert::Infallible;
use tokio::sync::mpsc;

/// GET open a Server-Sent Events stream of job-status updates.
///
/// One connection per open tab; keep-alive frames come from the shared heartbeat.
#[utoipa::path(
    get,
    path = "/sse",
    responses(
        (status = 200, description = "Event stream opened; the first event is `connected`", body = String, content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Invalid category"),
    ),
    security(
        ("bearer_auth" = []),
        ("session_cookie" = [])
    )
)]
pub(crate) async fn sse_handler(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, Error> {
    let category = params.category()?;
    debug!("Establishing SSE connection for user {}", user.id);

    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
    let manager = app_state.sse_manager.clone();

    // Queue the greeting before publishers can see the connection so it is
    // always the first frame on the stream
    let connection_id = ConnectionId::new();
    let greeting = Manager::frame_for(&SseEvent::Connected {
        connection_id: connection_id.to_string(),
    })
    .map_err(|e| {
        error!("Failed to serialize connected event: {e}");
        config_error("SSE greeting could not be serialized")
    })?;
    if tx.send(greeting).is_err() {
        error!("SSE receiver for connection {connection_id} closed before registration");
        return Err(config_error("SSE connection closed before registration").into());
    }

    // The registry owns the only sender: removing the connection ends the stream
    manager.register_connection_as(connection_id.clone(), user.id.clone(), category, tx);

    let guard = ConnectionGuard::new(manager, connection_id);
    let stream = stream! {
        // Dropped with the stream, including when the client goes away mid-stream
        let _guard = guard;

        while let Some(frame) = rx.recv().await {
            let terminal = frame.is_terminal();
            yield Ok::<Event, Infallible>(frame.into());
            if terminal {
                break;
            }
        }
    };

    Ok(Sse::new(stream))
}
