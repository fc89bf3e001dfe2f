use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use secrecy::{ExposeSecret, Secret};

use crate::domain::{campaign::Sender, subscriber::email::Email};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("the email provider throttled the request")]
    Throttled { retry_after: Option<Duration> },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

impl EmailError {
    /// How long the provider asked us to back off, if it did.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after } => *retry_after,
            Self::Request(_) => None,
        }
    }
}

/// Something able to deliver a single email.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(
        &self,
        sender: &Sender,
        recipient: &Email,
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError>;
}

/// HTTP client for the transactional email provider.
#[derive(Clone)]
pub struct EmailClient {
    http_client: Client,
    base_url: String,
    authorization_token: Secret<String>,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        authorization_token: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, EmailError> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            authorization_token,
        })
    }
}

#[async_trait]
impl EmailSender for EmailClient {
    async fn send_email(
        &self,
        sender: &Sender,
        recipient: &Email,
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        let url = format!("{}/email", self.base_url);
        let from = sender.mailbox();
        let request_body = SendEmailRequest {
            from: &from,
            to: recipient.as_ref(),
            subject,
            html_body: html_content,
        };

        let response = self
            .http_client
            .post(&url)
            .header(
                "X-Postmark-Server-Token",
                self.authorization_token.expose_secret(),
            )
            .json(&request_body)
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_retry_after);
            return Err(EmailError::Throttled { retry_after });
        }

        response.error_for_status()?;
        Ok(())
    }
}

/// `Retry-After` is either a number of seconds or an HTTP date.
fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    match DateTime::parse_from_rfc2822(value) {
        // A date in the past means "retry now".
        Ok(date) => Some(
            (date.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO),
        ),
        Err(e) => {
            tracing::debug!(retry_after = value, error = %e, "Ignoring unparseable Retry-After.");
            None
        }
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: &'a str,
}
