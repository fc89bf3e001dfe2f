use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{parse_recipient, CampaignStore, Lease, SubscriberStore};
use crate::domain::campaign::{CampaignStatus, RecipientGroup};
use crate::domain::subscriber::{NewSubscriber, Recipient};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn subscriber_table(group: RecipientGroup) -> Option<&'static str> {
    match group {
        RecipientGroup::Newsletter => Some("newsletter_subscribers"),
        RecipientGroup::WaitingList => Some("waiting_list"),
        RecipientGroup::Unsupported => None,
    }
}

#[async_trait]
impl CampaignStore for PgStore {
    #[tracing::instrument(name = "Acquire campaign send lease", skip(self))]
    async fn begin_sending(&self, campaign_id: Uuid) -> anyhow::Result<Lease> {
        let acquired = sqlx::query_scalar::<_, Uuid>(
            r#"UPDATE email_campaigns SET status = 'sending' WHERE id = $1 AND status <> 'sending' RETURNING id"#,
        )
        .bind(campaign_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to move the campaign to `sending`.")?;

        if acquired.is_some() {
            return Ok(Lease::Acquired);
        }

        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(SELECT 1 FROM email_campaigns WHERE id = $1)"#,
        )
        .bind(campaign_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to look the campaign up.")?;

        Ok(if exists {
            Lease::AlreadySending
        } else {
            Lease::NotFound
        })
    }

    #[tracing::instrument(name = "Mark campaign as failed", skip(self))]
    async fn mark_failed(&self, campaign_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE email_campaigns SET status = 'failed' WHERE id = $1"#)
            .bind(campaign_id)
            .execute(&self.pool)
            .await
            .context("Failed to mark the campaign as failed.")?;

        Ok(())
    }

    #[tracing::instrument(name = "Record campaign outcome", skip(self))]
    async fn complete(
        &self,
        campaign_id: Uuid,
        status: CampaignStatus,
        sent_count: u32,
        sent_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let sent_count = i32::try_from(sent_count).context("Sent count overflows the column.")?;
        sqlx::query(
            r#"UPDATE email_campaigns SET status = $2, sent_count = $3, sent_at = $4 WHERE id = $1"#,
        )
        .bind(campaign_id)
        .bind(status.as_str())
        .bind(sent_count)
        .bind(sent_at)
        .execute(&self.pool)
        .await
        .context("Failed to record the campaign outcome.")?;

        Ok(())
    }
}

#[async_trait]
impl SubscriberStore for PgStore {
    #[tracing::instrument(name = "Get campaign recipients", skip(self))]
    async fn recipients(&self, group: RecipientGroup) -> anyhow::Result<Vec<Recipient>> {
        let Some(table) = subscriber_table(group) else {
            tracing::warn!(%group, "no subscriber list backs this recipient group");
            return Ok(Vec::new());
        };

        let rows = sqlx::query_as::<_, (String, Option<String>)>(&format!(
            "SELECT email, name FROM {}",
            table
        ))
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to read subscribers from {}.", table))?;

        Ok(rows
            .into_iter()
            .filter_map(|(email, name)| parse_recipient(email, name))
            .collect())
    }

    #[tracing::instrument(
        name = "Store new subscriber",
        skip(self, subscriber),
        fields(email = %subscriber.email)
    )]
    async fn add_subscriber(
        &self,
        group: RecipientGroup,
        subscriber: &NewSubscriber,
    ) -> anyhow::Result<bool> {
        let table = subscriber_table(group)
            .ok_or_else(|| anyhow!("{} is not a subscriber list", group))?;

        let name: Option<&str> = subscriber.name.as_ref().map(|name| name.as_ref());
        let inserted = sqlx::query(&format!(
            "INSERT INTO {} (id, email, name, subscribed_at) VALUES ($1, $2, $3, $4) ON CONFLICT (email) DO NOTHING",
            table
        ))
        .bind(Uuid::new_v4())
        .bind(subscriber.email.as_ref())
        .bind(name)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to save the new subscriber into {}.", table))?;

        Ok(inserted.rows_affected() == 1)
    }
}
