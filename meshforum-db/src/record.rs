use meshforum_common::{
    model::{
        Id, ModelValidationError,
        auth::{Authentication, HashedPassword, PasswordError, TokenLifetime},
        camera::CameraReference,
        comment::{Comment, CommentParent},
        gallery::{GalleryPost, GalleryTag},
        job::{JobPosting, JobPostingMarker},
        message::Message,
        question::{Answer, Question, Tag, TagName},
        user::{
            Account, CustomColors, ExternalLinks, HexColor, Profile, Recruiter, Role, Testimonial,
            User, Username,
        },
    },
    util::BlankFieldError,
};
use sqlx::{FromRow, types::Json};
use time::{Duration, OffsetDateTime};

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct UserRecord {
    pub user_snowflake: i64,
    pub username: String,
    pub role: String,
    pub company: Option<String>,
    pub date_joined: OffsetDateTime,
    pub biography: String,
    pub profile_picture: Option<String>,
    pub banner_image: Option<String>,
    pub resume_file: Option<String>,
    pub skills: Vec<String>,
    pub portfolio_models: Vec<String>,
    pub portfolio_thumbnails: Vec<String>,
    pub github: Option<String>,
    pub artstation: Option<String>,
    pub linkedin: Option<String>,
    pub website: Option<String>,
    pub color_primary: Option<String>,
    pub color_accent: Option<String>,
    pub color_background: Option<String>,
    pub custom_font: Option<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CredentialsRecord {
    pub user_snowflake: i64,
    pub password_hash: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct TestimonialRecord {
    pub testimonial_snowflake: i64,
    pub recipient: String,
    pub author: String,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub approved: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct JobPostingRecord {
    pub job_snowflake: i64,
    pub recruiter: String,
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub posted_at: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct AuthenticationRecord {
    pub user_snowflake: i64,
    pub token_hash: Vec<u8>,
    pub created_at: OffsetDateTime,
    pub expires_after_seconds: Option<i64>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct GalleryPostRecord {
    pub post_snowflake: i64,
    pub title: String,
    pub description: String,
    pub username: String,
    pub media: String,
    pub thumbnail_media: Option<String>,
    pub community: String,
    pub tags: Vec<String>,
    pub post_date_time: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct QuestionRecord {
    pub question_snowflake: i64,
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
    pub asked_by: String,
    pub ask_date_time: OffsetDateTime,
    pub views: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct TagRecord {
    pub name: String,
    pub question_count: i64,
}

#[derive(Clone, Debug, FromRow)]
pub(crate) struct AnswerRecord {
    pub answer_snowflake: i64,
    pub question_snowflake: i64,
    pub text: String,
    pub ans_by: String,
    pub ans_date_time: OffsetDateTime,
    pub camera_references: Json<Vec<CameraReference>>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct CommentRecord {
    pub comment_snowflake: i64,
    pub question_snowflake: Option<i64>,
    pub answer_snowflake: Option<i64>,
    pub text: String,
    pub comment_by: String,
    pub comment_date_time: OffsetDateTime,
    pub media_path: Option<String>,
    pub media_size: Option<String>,
    pub permit_download: bool,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, FromRow)]
pub(crate) struct MessageRecord {
    pub message_snowflake: i64,
    pub sender: String,
    pub recipient: String,
    pub text: String,
    pub sent_at: OffsetDateTime,
}

fn hex_color(value: Option<String>) -> Result<Option<HexColor>, ModelValidationError> {
    Ok(value.map(HexColor::new).transpose()?)
}

fn count(value: i64) -> u64 {
    value.max(0).cast_unsigned()
}

impl UserRecord {
    /// Joins the row with its testimonials and job postings into the variant
    /// named by the `role` column.
    pub fn into_account(
        self,
        testimonials: Vec<Testimonial>,
        job_postings: Vec<Id<JobPostingMarker>>,
    ) -> Result<Account, ModelValidationError> {
        let role: Role = self.role.parse()?;
        let user = User {
            id: Id::from_db(self.user_snowflake),
            username: Username::new(self.username)?,
            date_joined: self.date_joined,
            profile: Profile {
                biography: self.biography,
                profile_picture: self.profile_picture,
                banner_image: self.banner_image,
                resume_file: self.resume_file,
                skills: self.skills,
                portfolio_models: self.portfolio_models,
                portfolio_thumbnails: self.portfolio_thumbnails,
                external_links: ExternalLinks {
                    github: self.github,
                    artstation: self.artstation,
                    linkedin: self.linkedin,
                    website: self.website,
                },
                custom_colors: CustomColors {
                    primary: hex_color(self.color_primary)?,
                    accent: hex_color(self.color_accent)?,
                    background: hex_color(self.color_background)?,
                },
                custom_font: self.custom_font,
            },
            testimonials,
        };

        Ok(match role {
            Role::User => Account::User(user),
            Role::Recruiter => Account::Recruiter(Recruiter {
                user,
                company: self.company.ok_or(BlankFieldError("company"))?,
                job_postings,
            }),
        })
    }
}

impl CredentialsRecord {
    pub fn into_parts(self) -> Result<(i64, HashedPassword), PasswordError> {
        Ok((
            self.user_snowflake,
            HashedPassword::from_phc(self.password_hash)?,
        ))
    }
}

impl TryFrom<TestimonialRecord> for Testimonial {
    type Error = ModelValidationError;

    fn try_from(value: TestimonialRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.testimonial_snowflake),
            author: Username::new(value.author)?,
            content: value.content,
            created_at: value.created_at,
            approved: value.approved,
        })
    }
}

impl TryFrom<JobPostingRecord> for JobPosting {
    type Error = ModelValidationError;

    fn try_from(value: JobPostingRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.job_snowflake),
            recruiter: Username::new(value.recruiter)?,
            title: value.title,
            description: value.description,
            location: value.location,
            posted_at: value.posted_at,
        })
    }
}

impl TryFrom<AuthenticationRecord> for Authentication {
    type Error = ModelValidationError;

    fn try_from(value: AuthenticationRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: Id::from_db(value.user_snowflake),
            token_hash: value.token_hash.try_into()?,
            created_at: value.created_at,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| TokenLifetime::try_from(Duration::seconds(seconds)))
                .transpose()?,
        })
    }
}

impl TryFrom<GalleryPostRecord> for GalleryPost {
    type Error = ModelValidationError;

    fn try_from(value: GalleryPostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.post_snowflake),
            title: value.title,
            description: value.description,
            user: Username::new(value.username)?,
            media: value.media,
            thumbnail_media: value.thumbnail_media,
            community: value.community,
            tags: value
                .tags
                .iter()
                .map(|tag| GalleryTag::parse(tag))
                .collect::<Result<_, _>>()?,
            post_date_time: value.post_date_time,
        })
    }
}

impl TryFrom<QuestionRecord> for Question {
    type Error = ModelValidationError;

    fn try_from(value: QuestionRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.question_snowflake),
            title: value.title,
            text: value.text,
            tags: value
                .tags
                .into_iter()
                .map(TagName::try_from)
                .collect::<Result<_, _>>()?,
            asked_by: Username::new(value.asked_by)?,
            ask_date_time: value.ask_date_time,
            views: count(value.views),
        })
    }
}

impl TryFrom<TagRecord> for Tag {
    type Error = ModelValidationError;

    fn try_from(value: TagRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            name: TagName::new(&value.name)?,
            question_count: count(value.question_count),
        })
    }
}

impl TryFrom<AnswerRecord> for Answer {
    type Error = ModelValidationError;

    fn try_from(value: AnswerRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.answer_snowflake),
            question: Id::from_db(value.question_snowflake),
            text: value.text,
            ans_by: Username::new(value.ans_by)?,
            ans_date_time: value.ans_date_time,
            camera_references: value.camera_references.0,
        })
    }
}

impl TryFrom<CommentRecord> for Comment {
    type Error = ModelValidationError;

    fn try_from(value: CommentRecord) -> Result<Self, Self::Error> {
        let parent = match (value.question_snowflake, value.answer_snowflake) {
            (Some(question), _) => CommentParent::Question(Id::from_db(question)),
            (None, Some(answer)) => CommentParent::Answer(Id::from_db(answer)),
            (None, None) => return Err(BlankFieldError("parent").into()),
        };

        Ok(Self {
            id: Id::from_db(value.comment_snowflake),
            parent,
            text: value.text,
            comment_by: Username::new(value.comment_by)?,
            comment_date_time: value.comment_date_time,
            media_path: value.media_path,
            media_size: value.media_size,
            permit_download: value.permit_download,
        })
    }
}

impl TryFrom<MessageRecord> for Message {
    type Error = ModelValidationError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Id::from_db(value.message_snowflake),
            sender: Username::new(value.sender)?,
            recipient: Username::new(value.recipient)?,
            text: value.text,
            sent_at: value.sent_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{CommentRecord, UserRecord};
    use meshforum_common::model::{ModelValidationError, comment::Comment, user::Account};
    use time::macros::datetime;

    fn user_record(role: &str, company: Option<&str>) -> UserRecord {
        UserRecord {
            user_snowflake: -3,
            username: "carol".to_owned(),
            role: role.to_owned(),
            company: company.map(str::to_owned),
            date_joined: datetime!(2025-02-01 00:00 UTC),
            biography: String::new(),
            profile_picture: None,
            banner_image: None,
            resume_file: None,
            skills: Vec::new(),
            portfolio_models: Vec::new(),
            portfolio_thumbnails: Vec::new(),
            github: None,
            artstation: None,
            linkedin: None,
            website: None,
            color_primary: Some("#FFAA00".to_owned()),
            color_accent: None,
            color_background: None,
            custom_font: None,
        }
    }

    #[test]
    fn role_column_selects_the_variant() {
        let account = user_record("Recruiter", Some("Polygon Works"))
            .into_account(Vec::new(), Vec::new())
            .unwrap();
        let recruiter = account.as_recruiter().unwrap();
        assert_eq!(recruiter.company, "Polygon Works");
        assert_eq!(u64::from(account.id()), (-3_i64).cast_unsigned());

        let plain = user_record("User", None)
            .into_account(Vec::new(), Vec::new())
            .unwrap();
        assert!(matches!(plain, Account::User(_)));

        assert!(matches!(
            user_record("Admin", None).into_account(Vec::new(), Vec::new()),
            Err(ModelValidationError::Role(_))
        ));
        assert!(matches!(
            user_record("Recruiter", None).into_account(Vec::new(), Vec::new()),
            Err(ModelValidationError::BlankField(_))
        ));
    }

    #[test]
    fn comment_parent_comes_from_the_set_column() {
        let record = CommentRecord {
            comment_snowflake: 1,
            question_snowflake: None,
            answer_snowflake: Some(2),
            text: "t".to_owned(),
            comment_by: "alice".to_owned(),
            comment_date_time: datetime!(2025-02-01 00:00 UTC),
            media_path: None,
            media_size: None,
            permit_download: false,
        };
        let comment = Comment::try_from(record).unwrap();
        assert_eq!(u64::from(comment.id), 1);
        assert!(matches!(
            comment.parent,
            meshforum_common::model::comment::CommentParent::Answer(_)
        ));
    }
}
