use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub(crate) struct AnnouncementParams {
    /// Free-form payload rendered by the frontend; a plain string is shown as text.
    #[schema(value_type = Object)]
    pub(crate) message: Value,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub(crate) struct RevokeParams {
    /// Shown to the user in the `force_logout` event.
    pub(crate) reason: Option<String>,
}
