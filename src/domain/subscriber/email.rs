use derive_more::Display;
use validator::validate_email;

#[derive(Display, Debug, Clone, PartialEq, Eq, Hash)]
#[display(fmt = "{}", _0)]
pub struct Email(String);

impl TryFrom<String> for Email {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim().to_owned();
        if validate_email(&value) {
            Ok(Self(value))
        } else {
            Err(format!("{:?} is not a valid email address", value))
        }
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
