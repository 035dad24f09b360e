use crate::{
    model::{Id, user::Username},
    util::{BlankFieldError, non_blank},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct JobPostingMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    pub id: Id<JobPostingMarker>,
    pub recruiter: Username,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub posted_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateJobPosting {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl CreateJobPosting {
    pub fn validated(self) -> Result<Self, BlankFieldError> {
        Ok(Self {
            title: non_blank("title", &self.title)?,
            ..self
        })
    }
}
