use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::Instant;
use tracing::Instrument;

use crate::domain::campaign::CampaignMessage;
use crate::domain::subscriber::Recipient;
use crate::email::EmailSender;

#[derive(Debug, Default)]
pub(super) struct BatchTally {
    pub sent: usize,
    pub failed: usize,
    /// Longest back-off requested by the provider while sending this batch.
    pub retry_after: Option<Duration>,
}

impl BatchTally {
    fn all_failed(size: usize) -> Self {
        Self {
            failed: size,
            ..Default::default()
        }
    }
}

pub(super) enum BatchOutcome {
    Settled(BatchTally),
    DeadlineExceeded,
}

/// Sends one campaign message, batch after batch.
pub(super) struct BatchSender {
    email_sender: Arc<dyn EmailSender>,
    message: Arc<CampaignMessage>,
}

impl BatchSender {
    pub fn new(email_sender: Arc<dyn EmailSender>, message: CampaignMessage) -> Self {
        Self {
            email_sender,
            message: Arc::new(message),
        }
    }

    /// Send to every recipient of `batch` at once and wait for all of them to settle.
    ///
    /// The batch runs on its own task: if that task dies before reporting, every
    /// recipient of the batch is counted as failed. A batch still running at `deadline`
    /// is aborted.
    pub async fn send(&self, batch: Vec<Recipient>, deadline: Instant) -> BatchOutcome {
        let size = batch.len();
        let email_sender = self.email_sender.clone();
        let message = self.message.clone();

        let mut handle = tokio::spawn(
            async move { send_all(email_sender.as_ref(), &message, &batch).await }
                .instrument(tracing::Span::current()),
        );

        match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(Ok(tally)) => BatchOutcome::Settled(tally),
            Ok(Err(e)) => {
                tracing::error!(error = %e, size, "Batch aborted, counting it as failed.");
                BatchOutcome::Settled(BatchTally::all_failed(size))
            }
            Err(_) => {
                handle.abort();
                BatchOutcome::DeadlineExceeded
            }
        }
    }
}

async fn send_all(
    email_sender: &dyn EmailSender,
    message: &CampaignMessage,
    batch: &[Recipient],
) -> BatchTally {
    let outcomes = join_all(batch.iter().map(|recipient| {
        email_sender.send_email(
            &message.sender,
            &recipient.email,
            message.subject.as_ref(),
            &message.html_content,
        )
    }))
    .await;

    let mut tally = BatchTally::default();
    for (recipient, outcome) in batch.iter().zip(outcomes) {
        match outcome {
            Ok(()) => tally.sent += 1,
            Err(e) => {
                tracing::warn!(
                    recipient = %recipient.email,
                    error = %e,
                    "Failed to send the campaign email."
                );
                tally.failed += 1;
                tally.retry_after = tally.retry_after.max(e.retry_after());
            }
        }
    }

    tally
}
