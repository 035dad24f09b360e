use crate::{
    model::{Id, user::Username},
    util::{BlankFieldError, non_blank},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct GalleryPostMarker;

/// Closed set of labels the gallery can be filtered by.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GalleryTag {
    Model,
    Animation,
    Texture,
    Rigging,
    Environment,
    Character,
    Prop,
    ConceptArt,
}

pub const GALLERY_TAGS: [GalleryTag; 8] = [
    GalleryTag::Model,
    GalleryTag::Animation,
    GalleryTag::Texture,
    GalleryTag::Rigging,
    GalleryTag::Environment,
    GalleryTag::Character,
    GalleryTag::Prop,
    GalleryTag::ConceptArt,
];

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown gallery tag: {0:?}")]
pub struct UnknownGalleryTagError(pub String);

impl GalleryTag {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GalleryTag::Model => "model",
            GalleryTag::Animation => "animation",
            GalleryTag::Texture => "texture",
            GalleryTag::Rigging => "rigging",
            GalleryTag::Environment => "environment",
            GalleryTag::Character => "character",
            GalleryTag::Prop => "prop",
            GalleryTag::ConceptArt => "concept-art",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        GALLERY_TAGS.into_iter().find(|tag| tag.as_str() == name)
    }

    pub fn parse(name: &str) -> Result<Self, UnknownGalleryTagError> {
        Self::from_name(name).ok_or_else(|| UnknownGalleryTagError(name.to_owned()))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPost {
    pub id: Id<GalleryPostMarker>,
    pub title: String,
    pub description: String,
    pub user: Username,
    pub media: String,
    pub thumbnail_media: Option<String>,
    pub community: String,
    pub tags: Vec<GalleryTag>,
    #[serde(with = "time::serde::rfc3339")]
    pub post_date_time: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGalleryPost {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub media: String,
    #[serde(default)]
    pub thumbnail_media: Option<String>,
    pub community: String,
    #[serde(default)]
    pub tags: Vec<GalleryTag>,
}

impl CreateGalleryPost {
    /// Requires title, media and community to be present. Tags are
    /// deduplicated keeping their first position.
    pub fn validated(self) -> Result<Self, BlankFieldError> {
        let mut tags = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Ok(Self {
            title: non_blank("title", &self.title)?,
            description: self.description,
            media: non_blank("media", &self.media)?,
            thumbnail_media: self.thumbnail_media.filter(|thumbnail| !thumbnail.trim().is_empty()),
            community: non_blank("community", &self.community)?,
            tags,
        })
    }

    #[must_use]
    pub fn into_post(
        self,
        id: Id<GalleryPostMarker>,
        user: Username,
        post_date_time: OffsetDateTime,
    ) -> GalleryPost {
        GalleryPost {
            id,
            title: self.title,
            description: self.description,
            user,
            media: self.media,
            thumbnail_media: self.thumbnail_media,
            community: self.community,
            tags: self.tags,
            post_date_time,
        }
    }
}

/// Outcome of an owner-only deletion.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum GalleryDeletion {
    Deleted,
    NotOwner,
    NotFound,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct GalleryFilter {
    pub community: Option<String>,
    pub tag: Option<GalleryTag>,
    pub user: Option<Username>,
}

impl GalleryFilter {
    #[must_use]
    pub fn matches(&self, post: &GalleryPost) -> bool {
        self.community
            .as_ref()
            .is_none_or(|community| &post.community == community)
            && self.tag.is_none_or(|tag| post.tags.contains(&tag))
            && self.user.as_ref().is_none_or(|user| &post.user == user)
    }
}
