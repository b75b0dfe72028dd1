use crate::protect::{authorize, Predicate, UserIsAdmin, UserIsNotSelf};
use crate::{extractors::authenticated_user::AuthenticatedUser, AppState};
use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::IntoResponse,
};
use domain::UserId;

/// Checks that the authenticated user is an administrator.
/// Intended to be given to axum::middleware::from_fn_with_state in the router
pub(crate) async fn admin(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    request: Request,
    next: Next,
) -> impl IntoResponse {
    let checks = vec![Predicate::new(UserIsAdmin, vec![])];
    authorize(&app_state, user, request, next, checks).await
}

/// Checks that the authenticated user is an administrator revoking someone
/// else's sessions. Admins end their own sessions by signing out.
pub(crate) async fn revoke_sessions(
    State(app_state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(user_id): Path<UserId>,
    request: Request,
    next: Next,
) -> impl IntoResponse {
    let checks = vec![
        Predicate::new(UserIsAdmin, vec![]),
        Predicate::new(UserIsNotSelf, vec![user_id]),
    ];
    authorize(&app_state, user, request, next, checks).await
}
