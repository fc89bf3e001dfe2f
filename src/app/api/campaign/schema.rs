use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dispatch::DispatchReport;
use crate::domain::campaign::{
    CampaignDispatch, CampaignMessage, CampaignStatus, RecipientGroup, Sender, Subject,
};
use crate::domain::subscriber::{email::Email, name::Name};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMarketingEmailRequestBody {
    pub campaign_id: Uuid,
    pub title: String,
    pub subject: String,
    pub content: String,
    pub recipient_group: RecipientGroup,
    pub from_email: String,
    pub from_name: String,
}

impl TryFrom<SendMarketingEmailRequestBody> for CampaignDispatch {
    type Error = String;
    fn try_from(value: SendMarketingEmailRequestBody) -> Result<Self, Self::Error> {
        if value.title.trim().is_empty() {
            return Err("title is empty".into());
        }

        let sender = Sender {
            email: Email::try_from(value.from_email)?,
            name: Name::try_from(value.from_name)?,
        };
        let subject = Subject::try_from(value.subject)?;
        let message = CampaignMessage::new(sender, subject, value.content)?;

        Ok(Self {
            campaign_id: value.campaign_id,
            title: value.title,
            recipient_group: value.recipient_group,
            message,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMarketingEmailResponseBody {
    pub success: bool,
    pub status: CampaignStatus,
    pub sent_count: usize,
    pub failed_count: usize,
    pub total_recipients: usize,
}

impl From<DispatchReport> for SendMarketingEmailResponseBody {
    fn from(report: DispatchReport) -> Self {
        Self {
            success: true,
            status: report.status,
            sent_count: report.sent_count,
            failed_count: report.failed_count,
            total_recipients: report.total_recipients,
        }
    }
}
