use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{parse_recipient, CampaignStore, Lease, SubscriberStore};
use crate::domain::campaign::{Campaign, CampaignStatus, RecipientGroup};
use crate::domain::subscriber::{NewSubscriber, Recipient};

/// A process-local store with the same semantics as [`super::PgStore`].
#[derive(Default)]
pub struct InMemoryStore {
    campaigns: Mutex<HashMap<Uuid, Campaign>>,
    subscribers: Mutex<HashMap<RecipientGroup, Vec<(String, Option<String>)>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> anyhow::Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| anyhow!("The in-memory store lock is poisoned."))
}

impl InMemoryStore {
    pub fn insert_campaign(&self, campaign: Campaign) -> anyhow::Result<()> {
        lock(&self.campaigns)?.insert(campaign.id, campaign);
        Ok(())
    }

    pub fn campaign(&self, campaign_id: Uuid) -> anyhow::Result<Option<Campaign>> {
        Ok(lock(&self.campaigns)?.get(&campaign_id).cloned())
    }

    /// Add a raw subscriber row, bypassing validation like a manual import would.
    pub fn insert_subscriber_row(
        &self,
        group: RecipientGroup,
        email: impl Into<String>,
        name: Option<String>,
    ) -> anyhow::Result<()> {
        lock(&self.subscribers)?
            .entry(group)
            .or_default()
            .push((email.into(), name));
        Ok(())
    }

    fn update_campaign(
        &self,
        campaign_id: Uuid,
        update: impl FnOnce(&mut Campaign),
    ) -> anyhow::Result<()> {
        if let Some(campaign) = lock(&self.campaigns)?.get_mut(&campaign_id) {
            update(campaign);
        }
        Ok(())
    }
}

#[async_trait]
impl CampaignStore for InMemoryStore {
    async fn begin_sending(&self, campaign_id: Uuid) -> anyhow::Result<Lease> {
        let mut campaigns = lock(&self.campaigns)?;
        Ok(match campaigns.get_mut(&campaign_id) {
            None => Lease::NotFound,
            Some(campaign) if campaign.status == CampaignStatus::Sending => Lease::AlreadySending,
            Some(campaign) => {
                campaign.status = CampaignStatus::Sending;
                Lease::Acquired
            }
        })
    }

    async fn mark_failed(&self, campaign_id: Uuid) -> anyhow::Result<()> {
        self.update_campaign(campaign_id, |campaign| {
            campaign.status = CampaignStatus::Failed;
        })
    }

    async fn complete(
        &self,
        campaign_id: Uuid,
        status: CampaignStatus,
        sent_count: u32,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.update_campaign(campaign_id, |campaign| {
            campaign.status = status;
            campaign.sent_count = sent_count;
            campaign.sent_at = Some(sent_at);
        })
    }
}

#[async_trait]
impl SubscriberStore for InMemoryStore {
    async fn recipients(&self, group: RecipientGroup) -> anyhow::Result<Vec<Recipient>> {
        let rows = lock(&self.subscribers)?
            .get(&group)
            .cloned()
            .unwrap_or_default();

        Ok(rows
            .into_iter()
            .filter_map(|(email, name)| parse_recipient(email, name))
            .collect())
    }

    async fn add_subscriber(
        &self,
        group: RecipientGroup,
        subscriber: &NewSubscriber,
    ) -> anyhow::Result<bool> {
        if group == RecipientGroup::Unsupported {
            return Err(anyhow!("{} is not a subscriber list", group));
        }

        let mut subscribers = lock(&self.subscribers)?;
        let list = subscribers.entry(group).or_default();
        let address: &str = subscriber.email.as_ref();
        if list.iter().any(|(email, _)| email == address) {
            return Ok(false);
        }

        list.push((
            subscriber.email.to_string(),
            subscriber.name.as_ref().map(|name| name.to_string()),
        ));
        Ok(true)
    }
}
