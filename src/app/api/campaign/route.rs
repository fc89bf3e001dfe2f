use axum::{extract::State, http::StatusCode, Json};

use super::schema::{SendMarketingEmailRequestBody, SendMarketingEmailResponseBody};
use crate::app::error::{AppError, AppResult};
use crate::app::AppState;
use crate::domain::campaign::CampaignDispatch;

/// Send a campaign to its recipient group.
///
/// Answers `200` once every batch settled, including when no email could be delivered:
/// the embedded `status` is then `failed`.
#[tracing::instrument(
    name = "Send marketing email",
    skip(state, body),
    fields(campaign_id = %body.campaign_id, recipient_group = %body.recipient_group)
)]
pub async fn send_marketing_email(
    State(state): State<AppState>,
    Json(body): Json<SendMarketingEmailRequestBody>,
) -> AppResult<Json<SendMarketingEmailResponseBody>> {
    let dispatch = CampaignDispatch::try_from(body).map_err(AppError::ValidationError)?;

    let report = state.dispatcher.dispatch(dispatch).await?;

    Ok(Json(report.into()))
}

pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
