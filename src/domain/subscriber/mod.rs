pub mod email;
pub mod name;

use self::email::Email;
use self::name::Name;

/// A validated lead, ready to be stored in one of the subscriber lists.
#[derive(Debug, Clone)]
pub struct NewSubscriber {
    pub email: Email,
    pub name: Option<Name>,
}

/// Somebody a campaign is delivered to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: Email,
    pub name: Option<String>,
}
