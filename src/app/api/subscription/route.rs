use anyhow::Context;
use axum::{extract::State, http::StatusCode, Json};

use super::schema::SubscribeBody;
use crate::app::error::{AppError, AppResult};
use crate::app::AppState;
use crate::domain::campaign::RecipientGroup;
use crate::domain::subscriber::NewSubscriber;

#[tracing::instrument(
    name = "Adding a new subscriber",
    skip(state, body),
    fields(email = %body.email, list = %body.list)
)]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<SubscribeBody>,
) -> AppResult<StatusCode> {
    let list = body.list;
    if list == RecipientGroup::Unsupported {
        return Err(AppError::ValidationError(
            "list must be either `newsletter` or `waiting_list`".into(),
        ));
    }

    let subscriber = NewSubscriber::try_from(body).map_err(AppError::ValidationError)?;

    let inserted = state
        .subscribers
        .add_subscriber(list, &subscriber)
        .await
        .context("Failed to store the new subscriber.")?;

    if !inserted {
        tracing::info!("The address was already subscribed.");
    }

    Ok(StatusCode::OK)
}
