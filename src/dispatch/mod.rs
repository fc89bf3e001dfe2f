//! Campaign dispatch.
//!
//! A dispatch takes a lease on the campaign, resolves its recipients and sends the
//! campaign in sequential batches. Emails within a batch are sent concurrently and the
//! dispatcher waits for every one of them to settle before pausing and moving on.
//! Individual failures are counted, never retried.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use chrono::Utc;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::DispatchSettings;
use crate::domain::campaign::{CampaignDispatch, CampaignStatus};
use crate::email::EmailSender;
use crate::repository::{CampaignStore, Lease, SubscriberStore};

mod batch;

use self::batch::{BatchOutcome, BatchSender};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Campaign {0} does not exist")]
    NotFound(Uuid),
    #[error("Campaign {0} is already being sent")]
    AlreadySending(Uuid),
    #[error("No recipients found")]
    NoRecipients,
    #[error(
        "Dispatch deadline exceeded after sending {} of {} emails",
        .0.sent_count,
        .0.total_recipients
    )]
    DeadlineExceeded(DispatchReport),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Tally of a finished dispatch. `sent_count + failed_count == total_recipients`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub total_recipients: usize,
    pub sent_count: usize,
    pub failed_count: usize,
    pub status: CampaignStatus,
}

impl DispatchReport {
    fn new(total_recipients: usize) -> Self {
        Self {
            total_recipients,
            sent_count: 0,
            failed_count: 0,
            status: CampaignStatus::Sending,
        }
    }

    fn pending(&self) -> usize {
        self.total_recipients - self.sent_count - self.failed_count
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    campaigns: Arc<dyn CampaignStore>,
    subscribers: Arc<dyn SubscriberStore>,
    email_sender: Arc<dyn EmailSender>,
    batch_size: usize,
    batch_pause: Duration,
    deadline: Duration,
}

impl Dispatcher {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        subscribers: Arc<dyn SubscriberStore>,
        email_sender: Arc<dyn EmailSender>,
        settings: &DispatchSettings,
    ) -> Self {
        Self {
            campaigns,
            subscribers,
            email_sender,
            batch_size: settings.batch_size.max(1),
            batch_pause: settings.batch_pause(),
            deadline: settings.deadline(),
        }
    }

    /// Send `dispatch` to every subscriber of its recipient group.
    ///
    /// Once the lease is acquired the send runs on its own task, so the campaign ends up
    /// `sent` or `failed` even if the caller stops waiting or the send hits an unexpected
    /// error.
    #[tracing::instrument(
        name = "Dispatch campaign",
        skip(self, dispatch),
        fields(
            campaign_id = %dispatch.campaign_id,
            title = %dispatch.title,
            recipient_group = %dispatch.recipient_group,
        )
    )]
    pub async fn dispatch(
        &self,
        dispatch: CampaignDispatch,
    ) -> Result<DispatchReport, DispatchError> {
        let campaign_id = dispatch.campaign_id;
        match self.campaigns.begin_sending(campaign_id).await? {
            Lease::Acquired => {}
            Lease::AlreadySending => return Err(DispatchError::AlreadySending(campaign_id)),
            Lease::NotFound => return Err(DispatchError::NotFound(campaign_id)),
        }

        let dispatcher = self.clone();
        let handle = tokio::spawn(
            async move {
                let outcome = dispatcher.send_campaign(dispatch).await;
                if let Err(DispatchError::Unexpected(e)) = &outcome {
                    tracing::error!(error = ?e, "Campaign dispatch aborted, marking it as failed.");
                    dispatcher.force_failed(campaign_id).await;
                }
                outcome
            }
            .instrument(tracing::Span::current()),
        );

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Campaign dispatch task died, marking it as failed.");
                self.force_failed(campaign_id).await;
                Err(DispatchError::Unexpected(anyhow!(
                    "The campaign dispatch task died: {}",
                    e
                )))
            }
        }
    }

    async fn force_failed(&self, campaign_id: Uuid) {
        if let Err(e) = self.campaigns.mark_failed(campaign_id).await {
            tracing::error!(error = ?e, "Could not mark the aborted campaign as failed.");
        }
    }

    async fn send_campaign(
        &self,
        dispatch: CampaignDispatch,
    ) -> Result<DispatchReport, DispatchError> {
        let campaign_id = dispatch.campaign_id;
        let recipients = self
            .subscribers
            .recipients(dispatch.recipient_group)
            .await
            .context("Failed to resolve the campaign recipients.")?;

        if recipients.is_empty() {
            tracing::warn!("No recipients found, the campaign is marked as failed.");
            self.campaigns
                .mark_failed(campaign_id)
                .await
                .context("Failed to mark the campaign as failed.")?;
            return Err(DispatchError::NoRecipients);
        }

        let deadline = Instant::now() + self.deadline;
        let sender = BatchSender::new(self.email_sender.clone(), dispatch.message);
        let mut report = DispatchReport::new(recipients.len());
        let mut timed_out = false;
        let mut pause = Duration::ZERO;

        let batch_count = recipients.len().div_ceil(self.batch_size);
        tracing::info!(
            total_recipients = recipients.len(),
            batch_count,
            "Sending campaign."
        );

        for (index, batch) in recipients.chunks(self.batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep_until(deadline.min(Instant::now() + pause)).await;
            }
            if Instant::now() >= deadline {
                timed_out = true;
                break;
            }

            match sender.send(batch.to_vec(), deadline).await {
                BatchOutcome::Settled(tally) => {
                    tracing::info!(
                        batch = index + 1,
                        batch_count,
                        sent = tally.sent,
                        failed = tally.failed,
                        "Batch settled."
                    );
                    report.sent_count += tally.sent;
                    report.failed_count += tally.failed;
                    pause = tally
                        .retry_after
                        .map_or(self.batch_pause, |retry_after| retry_after.max(self.batch_pause));
                }
                BatchOutcome::DeadlineExceeded => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            report.failed_count += report.pending();
            report.status = CampaignStatus::Failed;
            tracing::error!(
                sent = report.sent_count,
                failed = report.failed_count,
                "Dispatch deadline exceeded."
            );
        } else {
            report.status = CampaignStatus::from_sent_count(report.sent_count);
        }

        let sent_count =
            u32::try_from(report.sent_count).context("Sent count does not fit in 32 bits.")?;
        self.campaigns
            .complete(campaign_id, report.status, sent_count, Utc::now())
            .await
            .context("Failed to record the campaign outcome.")?;

        tracing::info!(
            status = %report.status,
            sent = report.sent_count,
            failed = report.failed_count,
            "Campaign dispatch finished."
        );

        if timed_out {
            Err(DispatchError::DeadlineExceeded(report))
        } else {
            Ok(report)
        }
    }
}
