use crate::model::{Id, auth::HashedPassword, job::JobPostingMarker};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;
use time::OffsetDateTime;

pub const USERNAME_MAX_LEN: usize = 32;
pub const RESERVED_USERNAME: &str = "me";

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct TestimonialMarker;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The username is invalid: {0:?}")]
pub struct InvalidUsernameError(String);

impl Username {
    /// Usernames are 1 to [`USERNAME_MAX_LEN`] characters of ASCII letters,
    /// digits, `_`, `.` and `-`. `me` is reserved for the caller's own
    /// `/users/me` routes.
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let valid = !username.is_empty()
            && username != RESERVED_USERNAME
            && username.len() <= USERNAME_MAX_LEN
            && username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

        if valid {
            Ok(Username(username))
        } else {
            Err(InvalidUsernameError(username))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"Username"))
    }
}

/// A `#rrggbb` color.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Not a #rrggbb color: {0:?}")]
pub struct InvalidHexColorError(String);

impl HexColor {
    pub fn new(color: String) -> Result<Self, InvalidHexColorError> {
        match color.strip_prefix('#') {
            Some(digits) if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) => {
                Ok(Self(color.to_ascii_lowercase()))
            }
            _ => Err(InvalidHexColorError(color)),
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = InvalidHexColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}

/// Discriminator of documents in the users collection.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize)]
pub enum Role {
    #[default]
    User,
    Recruiter,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown role: {0:?}")]
pub struct UnknownRoleError(String);

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Recruiter => "Recruiter",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Role::User),
            "Recruiter" => Ok(Role::Recruiter),
            other => Err(UnknownRoleError(other.to_owned())),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExternalLinks {
    pub github: Option<String>,
    pub artstation: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomColors {
    pub primary: Option<HexColor>,
    pub accent: Option<HexColor>,
    pub background: Option<HexColor>,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub biography: String,
    pub profile_picture: Option<String>,
    pub banner_image: Option<String>,
    pub resume_file: Option<String>,
    pub skills: Vec<String>,
    pub portfolio_models: Vec<String>,
    pub portfolio_thumbnails: Vec<String>,
    pub external_links: ExternalLinks,
    pub custom_colors: CustomColors,
    pub custom_font: Option<String>,
}

/// Partial profile edit. Absent fields are left untouched; nested link and
/// color groups are replaced as a whole.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdate {
    pub biography: Option<String>,
    pub profile_picture: Option<String>,
    pub banner_image: Option<String>,
    pub resume_file: Option<String>,
    pub skills: Option<Vec<String>>,
    pub portfolio_models: Option<Vec<String>>,
    pub portfolio_thumbnails: Option<Vec<String>>,
    pub external_links: Option<ExternalLinks>,
    pub custom_colors: Option<CustomColors>,
    pub custom_font: Option<String>,
}

impl Profile {
    pub fn apply(&mut self, update: ProfileUpdate) {
        let ProfileUpdate {
            biography,
            profile_picture,
            banner_image,
            resume_file,
            skills,
            portfolio_models,
            portfolio_thumbnails,
            external_links,
            custom_colors,
            custom_font,
        } = update;

        if let Some(biography) = biography {
            self.biography = biography;
        }
        if profile_picture.is_some() {
            self.profile_picture = profile_picture;
        }
        if banner_image.is_some() {
            self.banner_image = banner_image;
        }
        if resume_file.is_some() {
            self.resume_file = resume_file;
        }
        if let Some(skills) = skills {
            self.skills = skills;
        }
        if let Some(portfolio_models) = portfolio_models {
            self.portfolio_models = portfolio_models;
        }
        if let Some(portfolio_thumbnails) = portfolio_thumbnails {
            self.portfolio_thumbnails = portfolio_thumbnails;
        }
        if let Some(external_links) = external_links {
            self.external_links = external_links;
        }
        if let Some(custom_colors) = custom_colors {
            self.custom_colors = custom_colors;
        }
        if custom_font.is_some() {
            self.custom_font = custom_font;
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: Id<TestimonialMarker>,
    pub author: Username,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub approved: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateTestimonial {
    pub content: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
    #[serde(flatten)]
    pub profile: Profile,
    pub testimonials: Vec<Testimonial>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recruiter {
    #[serde(flatten)]
    pub user: User,
    pub company: String,
    pub job_postings: Vec<Id<JobPostingMarker>>,
}

/// A document of the users collection, tagged by its `role`.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize, Serialize)]
#[serde(tag = "role")]
pub enum Account {
    User(User),
    Recruiter(Recruiter),
}

impl Account {
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            Account::User(_) => Role::User,
            Account::Recruiter(_) => Role::Recruiter,
        }
    }

    #[must_use]
    pub fn user(&self) -> &User {
        match self {
            Account::User(user) => user,
            Account::Recruiter(recruiter) => &recruiter.user,
        }
    }

    pub fn user_mut(&mut self) -> &mut User {
        match self {
            Account::User(user) => user,
            Account::Recruiter(recruiter) => &mut recruiter.user,
        }
    }

    #[must_use]
    pub fn id(&self) -> Id<UserMarker> {
        self.user().id
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        &self.user().username
    }

    #[must_use]
    pub fn as_recruiter(&self) -> Option<&Recruiter> {
        match self {
            Account::User(_) => None,
            Account::Recruiter(recruiter) => Some(recruiter),
        }
    }

    /// The account as seen by other users: unapproved testimonials are hidden.
    #[must_use]
    pub fn into_public(mut self) -> Self {
        self.user_mut()
            .testimonials
            .retain(|testimonial| testimonial.approved);
        self
    }
}

/// Variant-specific data supplied at signup.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub enum AccountKind {
    User,
    Recruiter { company: String },
}

impl AccountKind {
    #[must_use]
    pub fn role(&self) -> Role {
        match self {
            AccountKind::User => Role::User,
            AccountKind::Recruiter { .. } => Role::Recruiter,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateAccount {
    pub username: Username,
    pub password: HashedPassword,
    pub kind: AccountKind,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Credentials {
    pub user_id: Id<UserMarker>,
    pub password: HashedPassword,
}
