use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderName, Method, Request};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Settings;
use crate::dispatch::Dispatcher;
use crate::email::EmailClient;
use crate::repository::{CampaignStore, SubscriberStore};

mod api;
mod error;

#[derive(Clone)]
pub struct AppState {
    subscribers: Arc<dyn SubscriberStore>,
    dispatcher: Dispatcher,
}

fn app_router() -> Router<AppState> {
    api::health::router()
        .merge(api::campaign::router())
        .merge(api::subscription::router())
}

/// Browsers call the dispatcher straight from the admin dashboard.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

pub struct App {
    listener: TcpListener,
    address: SocketAddr,
    state: AppState,
}

impl App {
    /// Bind the listener and wire the dispatcher to `store` and the configured email
    /// provider.
    pub async fn with<S>(config: Settings, store: Arc<S>) -> anyhow::Result<Self>
    where
        S: CampaignStore + SubscriberStore + 'static,
    {
        let email_client = EmailClient::new(
            config.email_client.base_url.clone(),
            config.email_client.authorization_token.clone(),
            config.email_client.timeout(),
        )
        .context("Could not build the email client.")?;

        let dispatcher = Dispatcher::new(
            store.clone(),
            store.clone(),
            Arc::new(email_client),
            &config.dispatch,
        );

        let listener = TcpListener::bind(format!(
            "{}:{}",
            config.application.host, config.application.port
        ))
        .await
        .context("The listener should be able to bind the address.")?;
        let address = listener.local_addr()?;

        Ok(Self {
            listener,
            address,
            state: AppState {
                subscribers: store,
                dispatcher,
            },
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn port(&self) -> u16 {
        self.address.port()
    }

    pub async fn serve(self) -> Result<(), std::io::Error> {
        let app = app_router()
            .with_state(self.state)
            .layer(cors_layer())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                    let id = uuid::Uuid::new_v4();
                    tracing::info_span!(
                        "request",
                        method = ?request.method(),
                        uri = ?request.uri(),
                        %id,
                    )
                }),
            );

        axum::serve(self.listener, app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "could not listen for the shutdown signal");
            std::future::pending::<()>().await
        }
    }
}
