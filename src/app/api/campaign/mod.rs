use axum::{routing::post, Router};

use crate::app::AppState;

pub mod route;
pub mod schema;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/send-marketing-email",
        post(route::send_marketing_email).options(route::preflight),
    )
}
