//! This module provides protection mechanisms for routes beyond authentication.
//!
//! Authentication (who is calling) is handled by the `AuthenticatedUser` extractor.
//! The submodules here answer whether that caller may use a particular route and
//! are attached with `axum::middleware::from_fn_with_state` in the router.

pub(crate) mod admin;

use crate::AppState;
use async_trait::async_trait;
use axum::{extract::Request, http::StatusCode, middleware::Next, response::IntoResponse};
use domain::jwt::SessionUser;
use domain::UserId;

/// Trait representing a single authorization rule.
///
/// Implementors answer **“is the authenticated user allowed to proceed?”**.
/// The rule receives:
/// * shared application state (`AppState`)
/// * the authenticated [`SessionUser`]
/// * any additional [`UserId`] parameters supplied by the caller.
#[async_trait]
pub trait Check: Send + Sync {
    async fn eval(&self, app: &AppState, user: &SessionUser, args: Vec<UserId>) -> bool;
}

/// Pairs a [`Check`] implementation with the concrete arguments that the rule
/// should receive when evaluated.
///
/// ```rust,ignore
/// let checks = vec![
///     Predicate::new(UserIsAdmin, vec![]),
///     Predicate::new(UserIsNotSelf, vec![target_user_id]),
/// ];
/// ```
pub(crate) struct Predicate {
    predicate: Box<dyn Check>,
    args: Vec<UserId>,
}

impl Predicate {
    pub(crate) fn new<C: Check + 'static>(predicate: C, args: Vec<UserId>) -> Self {
        Self {
            predicate: Box::new(predicate),
            args,
        }
    }

    pub(crate) async fn check(&self, app_state: &AppState, user: &SessionUser) -> bool {
        self.predicate
            .eval(app_state, user, self.args.clone())
            .await
    }
}

/// Axum middleware that enforces one or more [`Predicate`]s.
///
/// Each predicate is evaluated in the order supplied; if any rule returns
/// `false` the request is aborted with **403 FORBIDDEN**.  When all rules
/// pass the wrapped handler (`next`) is executed.
pub(crate) async fn authorize(
    app_state: &AppState,
    authenticated_user: SessionUser,
    request: Request,
    next: Next,
    checks: Vec<Predicate>,
) -> impl IntoResponse {
    for check in checks {
        if !check.check(app_state, &authenticated_user).await {
            return (StatusCode::FORBIDDEN, "FORBIDDEN").into_response();
        }
    }
    next.run(request).await
}

pub struct UserIsAdmin;

#[async_trait]
impl Check for UserIsAdmin {
    async fn eval(
        &self,
        _app_state: &AppState,
        authenticated_user: &SessionUser,
        _args: Vec<UserId>,
    ) -> bool {
        authenticated_user.is_admin()
    }
}

pub struct UserIsNotSelf;

#[async_trait]
impl Check for UserIsNotSelf {
    async fn eval(
        &self,
        _app_state: &AppState,
        authenticated_user: &SessionUser,
        args: Vec<UserId>,
    ) -> bool {
        args.first()
            .is_some_and(|user_id| *user_id != authenticated_user.id)
    }
}
