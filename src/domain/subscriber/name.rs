use derive_more::Display;
use unicode_segmentation::UnicodeSegmentation;

/// A display name, safe to embed in a `Name <address>` mailbox.
#[derive(Display, Debug, Clone, PartialEq, Eq)]
#[display(fmt = "{}", _0)]
pub struct Name(String);

impl TryFrom<String> for Name {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.trim().is_empty() {
            return Err("name is empty".into());
        }

        if value.graphemes(true).count() > 256 {
            return Err("name is too long".into());
        }

        let forbidden_characters = ['/', '(', ')', '"', '<', '>', '\\', '{', '}', '\r', '\n'];
        if value.chars().any(|g| forbidden_characters.contains(&g)) {
            return Err("name contains invalid characters".into());
        }

        Ok(Self(value.trim().to_owned()))
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
