use async_trait::async_trait;
use meshforum_common::{
    model::{
        Id, ModelValidationError,
        auth::{AuthTokenHash, Authentication, PasswordError},
        comment::{Comment, CommentMarker, CommentParent, CreateComment, PermissionToggle},
        gallery::{CreateGalleryPost, GalleryDeletion, GalleryFilter, GalleryPost, GalleryPostMarker},
        job::{CreateJobPosting, JobPosting, JobPostingMarker},
        message::{Message, SendMessage},
        question::{
            Answer, CreateQuestion, Question, QuestionMarker, ResolvedAnswer, Tag, TagName,
        },
        user::{
            Account, CreateAccount, Credentials, ProfileUpdate, Role, Testimonial,
            TestimonialMarker, UserMarker, Username,
        },
    },
    snowflake::SnowflakeClockError,
};
use std::fmt::Debug;
use thiserror::Error;

pub type Result<T, E = DbError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A stored password hash was invalid: {0}")]
    StoredPassword(#[from] PasswordError),
    #[error("Could not assign an id: {0}")]
    Clock(#[from] SnowflakeClockError),
    #[error("The username {0} is already taken")]
    UsernameTaken(Username),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Persistence for every collection of the application.
///
/// Lookups return `Ok(None)` when the addressed document (or, for inserts,
/// the document it refers to) does not exist. Listings are ordered: gallery
/// posts and questions newest first, answers and comments oldest first.
#[async_trait]
pub trait Store: Debug + Send + Sync {
    async fn create_account(&self, account: &CreateAccount) -> Result<Account>;

    async fn fetch_account(&self, id: Id<UserMarker>) -> Result<Option<Account>>;

    async fn fetch_account_by_username(&self, username: &Username) -> Result<Option<Account>>;

    async fn fetch_credentials(&self, username: &Username) -> Result<Option<Credentials>>;

    /// All accounts, or only those carrying the given discriminator.
    async fn list_accounts(&self, role: Option<Role>) -> Result<Vec<Account>>;

    async fn update_profile(
        &self,
        id: Id<UserMarker>,
        update: ProfileUpdate,
    ) -> Result<Option<Account>>;

    async fn add_testimonial(
        &self,
        recipient: &Username,
        author: &Username,
        content: &str,
    ) -> Result<Option<Testimonial>>;

    /// Only testimonials addressed to `owner` can be approved by them.
    async fn approve_testimonial(
        &self,
        owner: &Username,
        id: Id<TestimonialMarker>,
    ) -> Result<Option<Testimonial>>;

    /// `None` if `recruiter` does not name a recruiter account.
    async fn create_job_posting(
        &self,
        recruiter: Id<UserMarker>,
        posting: &CreateJobPosting,
    ) -> Result<Option<JobPosting>>;

    async fn fetch_job_posting(&self, id: Id<JobPostingMarker>) -> Result<Option<JobPosting>>;

    async fn insert_authentication(&self, authentication: &Authentication) -> Result<()>;

    async fn fetch_authentication(&self, hash: &AuthTokenHash) -> Result<Option<Authentication>>;

    async fn delete_authentication(&self, hash: &AuthTokenHash) -> Result<bool>;

    async fn create_gallery_post(
        &self,
        owner: &Username,
        post: CreateGalleryPost,
    ) -> Result<GalleryPost>;

    async fn fetch_gallery_post(&self, id: Id<GalleryPostMarker>) -> Result<Option<GalleryPost>>;

    async fn list_gallery_posts(&self, filter: &GalleryFilter) -> Result<Vec<GalleryPost>>;

    async fn delete_gallery_post(
        &self,
        id: Id<GalleryPostMarker>,
        actor: &Username,
    ) -> Result<GalleryDeletion>;

    async fn create_question(&self, author: &Username, question: CreateQuestion)
    -> Result<Question>;

    /// Fetches a question and counts the view.
    async fn view_question(&self, id: Id<QuestionMarker>) -> Result<Option<Question>>;

    async fn list_questions(&self, tag: Option<&TagName>) -> Result<Vec<Question>>;

    /// Tags with their question counts, by name.
    async fn list_tags(&self) -> Result<Vec<Tag>>;

    async fn fetch_tag(&self, name: &TagName) -> Result<Option<Tag>>;

    async fn create_answer(
        &self,
        question: Id<QuestionMarker>,
        author: &Username,
        answer: ResolvedAnswer,
    ) -> Result<Option<Answer>>;

    async fn list_answers(&self, question: Id<QuestionMarker>) -> Result<Vec<Answer>>;

    async fn create_comment(
        &self,
        parent: CommentParent,
        author: &Username,
        comment: CreateComment,
    ) -> Result<Option<Comment>>;

    async fn fetch_comment(&self, id: Id<CommentMarker>) -> Result<Option<Comment>>;

    async fn list_comments(&self, parent: CommentParent) -> Result<Vec<Comment>>;

    /// Flips `permitDownload` in one atomic step if `actor` wrote the comment.
    async fn toggle_comment_permission(
        &self,
        id: Id<CommentMarker>,
        actor: &Username,
    ) -> Result<PermissionToggle>;

    /// `None` if the recipient does not exist.
    async fn send_message(&self, sender: &Username, message: SendMessage)
    -> Result<Option<Message>>;

    /// Messages sent or received by `participant`, newest first.
    async fn list_messages(&self, participant: &Username) -> Result<Vec<Message>>;

    /// Messages between two users, oldest first.
    async fn list_conversation(&self, a: &Username, b: &Username) -> Result<Vec<Message>>;
}
