use std::fmt;

use serde::Serialize;

/// Lifecycle of a campaign: `draft -> sending -> {sent, failed}`.
///
/// `sent` and `failed` campaigns can be sent again, which moves them back to `sending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Sending,
    Sent,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sending => "sending",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    /// Outcome of a send that delivered `sent_count` emails.
    pub fn from_sent_count(sent_count: usize) -> Self {
        if sent_count == 0 {
            Self::Failed
        } else {
            Self::Sent
        }
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
