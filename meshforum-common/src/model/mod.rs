pub mod auth;
pub mod camera;
pub mod comment;
pub mod gallery;
pub mod job;
pub mod media;
pub mod message;
pub mod question;
pub mod user;

use crate::{
    model::{
        auth::{InvalidAuthTokenHashError, NonPositiveLifetimeError},
        camera::CameraReferenceError,
        gallery::UnknownGalleryTagError,
        question::{InvalidTagNameError, TagCountError},
        user::{InvalidHexColorError, InvalidUsernameError, UnknownRoleError},
    },
    snowflake::Snowflake,
    util::BlankFieldError,
};
use derive_where::derive_where;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    HexColor(#[from] InvalidHexColorError),
    #[error(transparent)]
    Role(#[from] UnknownRoleError),
    #[error(transparent)]
    TagName(#[from] InvalidTagNameError),
    #[error(transparent)]
    TagCount(#[from] TagCountError),
    #[error(transparent)]
    GalleryTag(#[from] UnknownGalleryTagError),
    #[error(transparent)]
    BlankField(#[from] BlankFieldError),
    #[error(transparent)]
    CameraReference(#[from] CameraReferenceError),
    #[error(transparent)]
    TokenLifetime(#[from] NonPositiveLifetimeError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
}

/// A snowflake tagged with the kind of entity it identifies.
#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Id<Marker>(Snowflake, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: Snowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> Snowflake {
        self.0
    }

    /// Postgres has no unsigned 64-bit integer, so ids are stored bit-cast.
    #[must_use]
    pub fn to_db(self) -> i64 {
        self.0.get().cast_signed()
    }

    #[must_use]
    pub fn from_db(value: i64) -> Self {
        Self::from(value.cast_unsigned())
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<Snowflake> for Id<Marker> {
    fn from(value: Snowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for Snowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(Snowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}
