use domain::error::{validation_error, Error, ValidationErrorKind};
use serde::Deserialize;
use ::sse::message::Category;
use utoipa::IntoParams;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub(crate) struct IndexParams {
    /// Only receive job events of this kind, e.g. `video`. System events are always delivered.
    pub(crate) category: Option<String>,
}

impl IndexParams {
    pub(crate) fn category(&self) -> Result<Option<Category>, Error> {
        self.category
            .as_deref()
            .map(|raw| {
                raw.parse::<Category>().map_err(|e| {
                    validation_error(ValidationErrorKind::Invalid, &e.to_string())
                })
            })
            .transpose()
    }
}
