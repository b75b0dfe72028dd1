use crate::{params, protect, AppState};
use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post},
    Router,
};

use crate::controller::{admin_controller, health_check_controller, webhook_controller};
use crate::sse::handler as sse_handler;

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Creative Ink Push API"
        ),
        paths(
            admin_controller::broadcast,
            admin_controller::connections,
            admin_controller::revoke_sessions,
            health_check_controller::health_check,
            sse_handler::sse_handler,
            webhook_controller::job_status,
        ),
        components(
            schemas(
                admin_controller::ConnectionStats,
                admin_controller::RevokedConnections,
                params::admin::AnnouncementParams,
                params::admin::RevokeParams,
                webhook_controller::JobStatusAccepted,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "creative_ink", description = "Creative Ink real-time job updates")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Session tokens come from the auth provider, either as a bearer token or in the
// cookie it sets on our domain (all a browser EventSource can send).
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    "__session",
                    "Session JWT set by the auth provider",
                ))),
            );
        }
    }
}

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(sse_routes(app_state.clone()))
        .merge(webhook_routes(app_state.clone()))
        .merge(admin_routes(app_state.clone()))
        .merge(admin_user_routes(app_state))
        // **** FIXME: protect the OpenAPI web UI
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}

fn sse_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/sse", get(sse_handler::sse_handler))
        .with_state(app_state)
}

// Providers authenticate with an HMAC signature instead of a session
fn webhook_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/webhooks/jobs", post(webhook_controller::job_status))
        .with_state(app_state)
}

fn admin_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/admin/broadcast", post(admin_controller::broadcast))
        .route("/admin/connections", get(admin_controller::connections))
        .route_layer(from_fn_with_state(app_state.clone(), protect::admin::admin))
        .with_state(app_state)
}

fn admin_user_routes(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/admin/users/:user_id/connections",
            delete(admin_controller::revoke_sessions),
        )
        .route_layer(from_fn_with_state(
            app_state.clone(),
            protect::admin::revoke_sessions,
        ))
        .with_state(app_state)
}
