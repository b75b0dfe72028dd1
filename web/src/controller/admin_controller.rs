use crate::controller::ApiResponse;
use crate::extractors::authenticated_user::AuthenticatedUser;
use crate::params::admin::{AnnouncementParams, RevokeParams};
use crate::{AppState, Error};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use domain::announcement as AnnouncementApi;
use domain::user as UserApi;
use domain::UserId;
use log::*;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ConnectionStats {
    /// Users with at least one open stream.
    users: usize,
    connections: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct RevokedConnections {
    user_id: String,
    /// Streams that were open when the sessions were revoked.
    closed_connections: usize,
}

/// POST an announcement to every connected user
#[utoipa::path(
    post,
    path = "/admin/broadcast",
    request_body = AnnouncementParams,
    responses(
        (status = 202, description = "Announcement queued to every open connection"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 422, description = "Empty announcement")
    ),
    security(
        ("bearer_auth" = []),
        ("session_cookie" = [])
    )
)]
pub async fn broadcast(
    AuthenticatedUser(user): AuthenticatedUser,
    State(app_state): State<AppState>,
    Json(params): Json<AnnouncementParams>,
) -> Result<impl IntoResponse, Error> {
    info!("Admin {} is broadcasting an announcement", user.id);

    AnnouncementApi::publish(&app_state.event_publisher, params.message).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::<()>::no_content(StatusCode::ACCEPTED.into())),
    ))
}

/// GET the number of open SSE connections
#[utoipa::path(
    get,
    path = "/admin/connections",
    responses(
        (status = 200, description = "Current connection counts", body = ConnectionStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = []),
        ("session_cookie" = [])
    )
)]
pub async fn connections(State(app_state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let stats = ConnectionStats {
        users: app_state.sse_manager.user_count(),
        connections: app_state.sse_manager.connection_count(),
    };
    debug!("GET connection stats: {:?}", stats);

    Ok(Json(ApiResponse::new(StatusCode::OK.into(), stats)))
}

/// DELETE every open stream of a user, telling their tabs to sign out
#[utoipa::path(
    delete,
    path = "/admin/users/{user_id}/connections",
    params(
        ("user_id" = String, Path, description = "Id of the user whose sessions are revoked")
    ),
    request_body(content = RevokeParams, description = "Optional; the reason shown to the user"),
    responses(
        (status = 200, description = "Sessions revoked", body = RevokedConnections),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = []),
        ("session_cookie" = [])
    )
)]
pub async fn revoke_sessions(
    AuthenticatedUser(admin): AuthenticatedUser,
    State(app_state): State<AppState>,
    Path(user_id): Path<UserId>,
    params: Option<Json<RevokeParams>>,
) -> Result<impl IntoResponse, Error> {
    let reason = params.and_then(|Json(params)| params.reason);
    info!("Admin {} is revoking sessions of user {}", admin.id, user_id);

    let closed_connections = app_state.sse_manager.user_connection_count(&user_id);
    UserApi::revoke_sessions(&app_state.event_publisher, &user_id, reason).await?;

    Ok(Json(ApiResponse::new(
        StatusCode::OK.into(),
        RevokedConnections {
            user_id,
            closed_connections,
        },
    )))
}
