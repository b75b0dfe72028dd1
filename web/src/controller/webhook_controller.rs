//! Controller for job-status callbacks from generation providers.

use crate::controller::ApiResponse;
use crate::{AppState, Error};

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;

use domain::job::{self as JobApi, JobStatusUpdate};
use domain::webhook::{self as WebhookApi, SIGNATURE_HEADER};
use log::*;
use serde::Serialize;
use utoipa::ToSchema;

/// Acknowledgement of an accepted job report.
#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct JobStatusAccepted {
    job_id: String,
    /// Normalized status, e.g. `in_progress`.
    status: String,
}

/// POST a provider's job-status report
///
/// The raw body is signed with HMAC-SHA256; the signature is checked before the
/// body is parsed. Accepted reports are pushed to every open tab of the job owner.
#[utoipa::path(
    post,
    path = "/webhooks/jobs",
    request_body(content = String, description = "Job status report as JSON", content_type = "application/json"),
    params(
        ("x-webhook-signature" = Option<String>, Header, description = "Hex HMAC-SHA256 of the raw body, optionally prefixed with `sha256=`")
    ),
    responses(
        (status = 202, description = "Report accepted and pushed to the job owner", body = JobStatusAccepted),
        (status = 400, description = "Malformed JSON body"),
        (status = 401, description = "Missing or invalid signature"),
        (status = 422, description = "Unknown status or invalid field"),
        (status = 500, description = "Webhook signing is not configured")
    )
)]
pub async fn job_status(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, Error> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    WebhookApi::authenticate(&app_state.config, signature, &body).map_err(|e| {
        warn!("Rejected job-status webhook: {e}");
        e
    })?;

    let update: JobStatusUpdate = serde_json::from_slice(&body)?;
    debug!("POST job status for job {}: {}", update.job_id, update.status);

    let job_id = update.job_id.clone();
    let status = JobApi::report_status(&app_state.event_publisher, update).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::new(
            StatusCode::ACCEPTED.into(),
            JobStatusAccepted {
                job_id,
                status: status.as_str().to_string(),
            },
        )),
    ))
}
