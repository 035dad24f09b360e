use crate::{
    model::{
        Id,
        media::{DownloadPrompt, Media},
        question::{AnswerMarker, QuestionMarker},
        user::Username,
    },
    util::{BlankFieldError, non_blank},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommentMarker;

/// What a comment is attached to.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum CommentParent {
    Question(Id<QuestionMarker>),
    Answer(Id<AnswerMarker>),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Id<CommentMarker>,
    pub parent: CommentParent,
    pub text: String,
    pub comment_by: Username,
    #[serde(with = "time::serde::rfc3339")]
    pub comment_date_time: OffsetDateTime,
    pub media_path: Option<String>,
    pub media_size: Option<String>,
    pub permit_download: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    pub text: String,
    #[serde(default)]
    pub media_path: Option<String>,
    #[serde(default)]
    pub media_size: Option<String>,
}

impl CreateComment {
    pub fn validated(self) -> Result<Self, BlankFieldError> {
        let media_path = self.media_path.filter(|path| !path.trim().is_empty());
        // A size without a file has nothing to describe.
        let media_size = media_path.as_ref().and(self.media_size);

        Ok(Self {
            text: non_blank("text", &self.text)?,
            media_path,
            media_size,
        })
    }
}

/// Outcome of flipping a comment's `permitDownload` flag.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum PermissionToggle {
    Toggled { permit_download: bool },
    NotAuthor,
    NotFound,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum DownloadError {
    #[error("The comment has no attached media")]
    NoMedia,
    #[error("The author has not permitted downloads")]
    NotPermitted,
}

impl Comment {
    #[must_use]
    pub fn is_authored_by(&self, username: &Username) -> bool {
        &self.comment_by == username
    }

    /// The author can always download their own attachment; everyone else
    /// only once it has been permitted.
    pub fn download_prompt(&self, actor: &Username) -> Result<DownloadPrompt, DownloadError> {
        let media_path = self.media_path.as_deref().ok_or(DownloadError::NoMedia)?;
        if !self.permit_download && !self.is_authored_by(actor) {
            return Err(DownloadError::NotPermitted);
        }

        Ok(DownloadPrompt::new(
            &Media::new(media_path),
            self.media_size.as_deref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        Id,
        comment::{Comment, CommentParent, CreateComment, DownloadError},
        user::Username,
    };
    use time::macros::datetime;

    fn username(name: &str) -> Username {
        Username::new(name.to_owned()).unwrap()
    }

    fn comment(permit_download: bool) -> Comment {
        Comment {
            id: Id::from(3_u64),
            parent: CommentParent::Answer(Id::from(2_u64)),
            text: "here is the file".to_owned(),
            comment_by: username("alice"),
            comment_date_time: datetime!(2025-07-01 09:00 UTC),
            media_path: Some("/uploads/a.glb".to_owned()),
            media_size: Some("5MB".to_owned()),
            permit_download,
        }
    }

    #[test]
    fn parent_serializes_with_kind() {
        let json = serde_json::to_value(CommentParent::Question(Id::from(9_u64))).unwrap();
        assert_eq!(json["kind"], "question");
        assert_eq!(json["id"], 9);
    }

    #[test]
    fn media_size_requires_media() {
        let request = CreateComment {
            text: "no file".to_owned(),
            media_path: Some(" ".to_owned()),
            media_size: Some("5MB".to_owned()),
        }
        .validated()
        .unwrap();

        assert_eq!(request.media_path, None);
        assert_eq!(request.media_size, None);
    }

    #[test]
    fn comment_text_is_kept_verbatim() {
        let request = CreateComment {
            text: "  indented note\n".to_owned(),
            media_path: None,
            media_size: None,
        }
        .validated()
        .unwrap();

        assert_eq!(request.text, "  indented note\n");
    }

    #[test]
    fn download_prompt_respects_permission() {
        let alice = username("alice");
        let bob = username("bob");

        let prompt = comment(false).download_prompt(&alice).unwrap();
        assert!(prompt.confirmation.contains("5MB"));
        assert!(prompt.confirmation.contains(".glb"));

        assert_eq!(
            comment(false).download_prompt(&bob),
            Err(DownloadError::NotPermitted)
        );
        assert!(comment(true).download_prompt(&bob).is_ok());

        let mut without_media = comment(true);
        without_media.media_path = None;
        assert_eq!(
            without_media.download_prompt(&alice),
            Err(DownloadError::NoMedia)
        );
    }
}
