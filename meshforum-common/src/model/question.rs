use crate::{
    model::{
        Id, ModelValidationError,
        camera::{CameraReference, resolve_references},
        user::Username,
    },
    util::non_blank,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;
use time::OffsetDateTime;

pub const TAG_NAME_MAX_LEN: usize = 20;
pub const QUESTION_MAX_TAGS: usize = 5;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct QuestionMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct AnswerMarker;

/// Lowercase tag name without whitespace.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The tag name is invalid: {0:?}")]
pub struct InvalidTagNameError(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("A question needs between 1 and {QUESTION_MAX_TAGS} tags, got {0}")]
pub struct TagCountError(usize);

impl TagName {
    pub fn new(name: &str) -> Result<Self, InvalidTagNameError> {
        let name = name.trim().to_lowercase();
        let valid = !name.is_empty()
            && name.chars().count() <= TAG_NAME_MAX_LEN
            && !name.chars().any(char::is_whitespace);

        if valid {
            Ok(Self(name))
        } else {
            Err(InvalidTagNameError(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TagName {
    type Error = InvalidTagNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TagName> for String {
    fn from(value: TagName) -> Self {
        value.0
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: TagName,
    pub question_count: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Id<QuestionMarker>,
    pub title: String,
    pub text: String,
    pub tags: Vec<TagName>,
    pub asked_by: Username,
    #[serde(with = "time::serde::rfc3339")]
    pub ask_date_time: OffsetDateTime,
    pub views: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateQuestion {
    pub title: String,
    pub text: String,
    pub tags: Vec<TagName>,
}

impl CreateQuestion {
    /// Tags are deduplicated before they are counted.
    pub fn validated(self) -> Result<Self, ModelValidationError> {
        let mut tags: Vec<TagName> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        if tags.is_empty() || tags.len() > QUESTION_MAX_TAGS {
            return Err(TagCountError(tags.len()).into());
        }

        Ok(Self {
            title: non_blank("title", &self.title)?,
            text: non_blank("text", &self.text)?,
            tags,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub id: Id<AnswerMarker>,
    pub question: Id<QuestionMarker>,
    pub text: String,
    pub ans_by: Username,
    #[serde(with = "time::serde::rfc3339")]
    pub ans_date_time: OffsetDateTime,
    pub camera_references: Vec<CameraReference>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateAnswer {
    pub text: String,
    #[serde(default)]
    pub cameras: Vec<CameraReference>,
}

/// An answer body whose camera mentions have been resolved.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ResolvedAnswer {
    pub text: String,
    pub camera_references: Vec<CameraReference>,
}

impl CreateAnswer {
    pub fn resolve(self) -> Result<ResolvedAnswer, ModelValidationError> {
        let text = non_blank("text", &self.text)?;
        let camera_references = resolve_references(&text, &self.cameras)?;

        Ok(ResolvedAnswer {
            text,
            camera_references,
        })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionWithAnswers {
    #[serde(flatten)]
    pub question: Question,
    pub answers: Vec<Answer>,
}
