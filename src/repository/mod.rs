//! Persistence of campaigns and subscriber lists.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::campaign::{CampaignStatus, RecipientGroup};
use crate::domain::subscriber::{NewSubscriber, Recipient};

pub mod memory;
pub mod postgres;

pub use self::memory::InMemoryStore;
pub use self::postgres::PgStore;

/// Outcome of trying to move a campaign to `sending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lease {
    Acquired,
    AlreadySending,
    NotFound,
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Move the campaign to `sending` unless another send already holds it.
    async fn begin_sending(&self, campaign_id: Uuid) -> anyhow::Result<Lease>;

    /// Flag the campaign as `failed` without touching its counters.
    async fn mark_failed(&self, campaign_id: Uuid) -> anyhow::Result<()>;

    async fn complete(
        &self,
        campaign_id: Uuid,
        status: CampaignStatus,
        sent_count: u32,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait SubscriberStore: Send + Sync {
    /// Every subscriber of `group`. Rows carrying an invalid address are skipped.
    async fn recipients(&self, group: RecipientGroup) -> anyhow::Result<Vec<Recipient>>;

    /// Add a subscriber to `group`. Returns `false` if the address was already there.
    async fn add_subscriber(
        &self,
        group: RecipientGroup,
        subscriber: &NewSubscriber,
    ) -> anyhow::Result<bool>;
}

pub(crate) fn parse_recipient(email: String, name: Option<String>) -> Option<Recipient> {
    match email.try_into() {
        Ok(email) => Some(Recipient { email, name }),
        Err(e) => {
            tracing::warn!(
                detail = %e,
                "Skipping a subscriber. Their stored contact details are invalid."
            );
            None
        }
    }
}
