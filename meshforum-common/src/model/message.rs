use crate::{
    model::{Id, user::Username},
    util::{BlankFieldError, non_blank},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct MessageMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Id<MessageMarker>,
    pub sender: Username,
    pub recipient: Username,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub sent_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct SendMessage {
    pub to: Username,
    pub text: String,
}

impl SendMessage {
    pub fn validated(self) -> Result<Self, BlankFieldError> {
        Ok(Self {
            text: non_blank("text", &self.text)?,
            to: self.to,
        })
    }
}

impl Message {
    #[must_use]
    pub fn involves(&self, username: &Username) -> bool {
        &self.sender == username || &self.recipient == username
    }

    #[must_use]
    pub fn is_between(&self, a: &Username, b: &Username) -> bool {
        (&self.sender == a && &self.recipient == b) || (&self.sender == b && &self.recipient == a)
    }
}
