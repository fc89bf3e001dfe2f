use serde::Deserialize;

use crate::domain::campaign::RecipientGroup;
use crate::domain::subscriber::{email::Email, name::Name, NewSubscriber};

#[derive(Deserialize)]
pub struct SubscribeBody {
    pub email: String,
    pub name: Option<String>,
    pub list: RecipientGroup,
}

impl TryFrom<SubscribeBody> for NewSubscriber {
    type Error = String;
    fn try_from(value: SubscribeBody) -> Result<Self, Self::Error> {
        let email = Email::try_from(value.email)?;
        let name = value
            .name
            .filter(|name| !name.trim().is_empty())
            .map(Name::try_from)
            .transpose()?;

        Ok(Self { email, name })
    }
}
