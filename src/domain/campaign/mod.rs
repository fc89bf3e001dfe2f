mod status;
mod subject;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

pub use self::status::CampaignStatus;
pub use self::subject::Subject;
use super::subscriber::{email::Email, name::Name};

/// Which subscriber list a campaign targets.
///
/// Values other than `newsletter` and `waiting_list` decode to `Unsupported`, which
/// resolves to no recipient at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientGroup {
    Newsletter,
    WaitingList,
    #[serde(other)]
    Unsupported,
}

impl RecipientGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Newsletter => "newsletter",
            Self::WaitingList => "waiting_list",
            Self::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for RecipientGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who a campaign appears to come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub email: Email,
    pub name: Name,
}

impl Sender {
    /// RFC 5322 mailbox, e.g. `Bootcamp Team <hello@bootcamp.dev>`.
    ///
    /// Names holding anything but atom characters and spaces are sent as a quoted
    /// string: `"Bootcamp, Inc." <hello@bootcamp.dev>`.
    pub fn mailbox(&self) -> String {
        let name = self.name.as_ref();
        if name.chars().all(is_phrase_char) {
            return format!("{} <{}>", name, self.email);
        }

        let mut quoted = String::with_capacity(name.len() + 2);
        quoted.push('"');
        for c in name.chars() {
            if c == '"' || c == '\\' {
                quoted.push('\\');
            }
            quoted.push(c);
        }
        quoted.push('"');
        format!("{} <{}>", quoted, self.email)
    }
}

fn is_phrase_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || "!#$%&'*+-/=?^_`{|}~".contains(c)
}

/// A campaign as stored in `email_campaigns`.
#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: Uuid,
    pub title: String,
    pub subject: String,
    pub content: String,
    pub recipient_group: RecipientGroup,
    pub from_email: String,
    pub from_name: String,
    pub status: CampaignStatus,
    pub sent_count: u32,
    pub sent_at: Option<DateTime<Utc>>,
}

/// A validated request to send a campaign.
#[derive(Debug, Clone)]
pub struct CampaignDispatch {
    pub campaign_id: Uuid,
    pub title: String,
    pub recipient_group: RecipientGroup,
    pub message: CampaignMessage,
}

/// The part of a campaign that is identical for every recipient.
#[derive(Debug, Clone)]
pub struct CampaignMessage {
    pub sender: Sender,
    pub subject: Subject,
    pub html_content: String,
}

impl CampaignMessage {
    pub fn new(sender: Sender, subject: Subject, html_content: String) -> Result<Self, String> {
        if html_content.trim().is_empty() {
            return Err("content is empty".into());
        }

        Ok(Self {
            sender,
            subject,
            html_content,
        })
    }
}
