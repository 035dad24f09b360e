use crate::{
    record::{
        AnswerRecord, AuthenticationRecord, CommentRecord, CredentialsRecord, GalleryPostRecord,
        JobPostingRecord, MessageRecord, QuestionRecord, TagRecord, TestimonialRecord, UserRecord,
    },
    sequencer::Sequencer,
    store::{DbError, Result, Store},
};
use async_trait::async_trait;
use meshforum_common::{
    model::{
        Id,
        auth::{AuthTokenHash, Authentication},
        comment::{Comment, CommentMarker, CommentParent, CreateComment, PermissionToggle},
        gallery::{
            CreateGalleryPost, GalleryDeletion, GalleryFilter, GalleryPost, GalleryPostMarker,
            GalleryTag,
        },
        job::{CreateJobPosting, JobPosting, JobPostingMarker},
        message::{Message, MessageMarker, SendMessage},
        question::{
            Answer, AnswerMarker, CreateQuestion, Question, QuestionMarker, ResolvedAnswer, Tag,
            TagName,
        },
        user::{
            Account, AccountKind, CreateAccount, Credentials, ProfileUpdate, Role, Testimonial,
            TestimonialMarker, UserMarker, Username,
        },
    },
    snowflake::{ProcessId, WorkerId},
};
use sqlx::{
    PgPool, postgres::PgPoolOptions, query, query_as, query_scalar, types::Json,
};
use std::{collections::HashMap, time::Duration};
use tracing::{debug, info};

macro_rules! user_columns {
    () => {
        "users.user_snowflake, users.username, users.role, users.company, users.date_joined, \
         users.biography, users.profile_picture, users.banner_image, users.resume_file, \
         users.skills, users.portfolio_models, users.portfolio_thumbnails, \
         users.github, users.artstation, users.linkedin, users.website, \
         users.color_primary, users.color_accent, users.color_background, users.custom_font"
    };
}

macro_rules! testimonial_columns {
    () => {
        "testimonial_snowflake, recipient, author, content, created_at, approved"
    };
}

macro_rules! job_posting_columns {
    () => {
        "job_snowflake, recruiter, title, description, location, posted_at"
    };
}

macro_rules! gallery_post_columns {
    () => {
        "post_snowflake, title, description, username, media, thumbnail_media, community, tags, \
         post_date_time"
    };
}

macro_rules! question_columns {
    () => {
        "question_snowflake, title, text, tags, asked_by, ask_date_time, views"
    };
}

macro_rules! answer_columns {
    () => {
        "answer_snowflake, question_snowflake, text, ans_by, ans_date_time, camera_references"
    };
}

macro_rules! comment_columns {
    () => {
        "comment_snowflake, question_snowflake, answer_snowflake, text, comment_by, \
         comment_date_time, media_path, media_size, permit_download"
    };
}

macro_rules! message_columns {
    () => {
        "message_snowflake, sender, recipient, text, sent_at"
    };
}

/// Postgres-backed [`Store`].
#[derive(Debug)]
pub struct DbClient {
    pool: PgPool,
    sequencer: Sequencer,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: PgPool, worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            pool,
            sequencer: Sequencer::new(worker_id, process_id),
        }
    }

    /// Connects to `database_url` and brings the schema up to date.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await?;
        debug!(max_connections, "Connected to database");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations are up to date");

        Ok(Self::new(pool, worker_id, process_id))
    }

    /// Attaches testimonials and job postings to user rows, keeping their
    /// order.
    async fn hydrate(&self, records: Vec<UserRecord>) -> Result<Vec<Account>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let usernames: Vec<String> = records
            .iter()
            .map(|record| record.username.clone())
            .collect();

        let testimonial_records = query_as::<_, TestimonialRecord>(concat!(
            "SELECT ",
            testimonial_columns!(),
            " FROM testimonials WHERE recipient = ANY($1) ORDER BY testimonial_snowflake"
        ))
        .bind(usernames.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let job_records = query_as::<_, (i64, String)>(
            "SELECT job_snowflake, recruiter FROM job_postings
            WHERE recruiter = ANY($1) ORDER BY job_snowflake",
        )
        .bind(usernames.as_slice())
        .fetch_all(&self.pool)
        .await?;

        let mut testimonials: HashMap<String, Vec<Testimonial>> = HashMap::new();
        for record in testimonial_records {
            let recipient = record.recipient.clone();
            testimonials
                .entry(recipient)
                .or_default()
                .push(Testimonial::try_from(record)?);
        }

        let mut job_postings: HashMap<String, Vec<Id<JobPostingMarker>>> = HashMap::new();
        for (job_snowflake, recruiter) in job_records {
            job_postings
                .entry(recruiter)
                .or_default()
                .push(Id::from_db(job_snowflake));
        }

        records
            .into_iter()
            .map(|record| {
                let user_testimonials = testimonials.remove(&record.username).unwrap_or_default();
                let user_jobs = job_postings.remove(&record.username).unwrap_or_default();
                Ok(record.into_account(user_testimonials, user_jobs)?)
            })
            .collect()
    }

    async fn hydrate_one(&self, record: Option<UserRecord>) -> Result<Option<Account>> {
        let Some(record) = record else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![record]).await?.pop())
    }
}

#[async_trait]
impl Store for DbClient {
    async fn create_account(&self, account: &CreateAccount) -> Result<Account> {
        let (user_id, date_joined) = self.sequencer.next::<UserMarker>()?;
        let company = match &account.kind {
            AccountKind::User => None,
            AccountKind::Recruiter { company } => Some(company.as_str()),
        };

        let record = query_as::<_, UserRecord>(concat!(
            "INSERT INTO users (user_snowflake, username, password_hash, role, company, date_joined)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (username) DO NOTHING
            RETURNING ",
            user_columns!()
        ))
        .bind(user_id.to_db())
        .bind(account.username.get())
        .bind(account.password.as_phc())
        .bind(account.kind.role().as_str())
        .bind(company)
        .bind(date_joined)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::UsernameTaken(account.username.clone()))?;

        Ok(record.into_account(Vec::new(), Vec::new())?)
    }

    async fn fetch_account(&self, id: Id<UserMarker>) -> Result<Option<Account>> {
        let record = query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE users.user_snowflake = $1"
        ))
        .bind(id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate_one(record).await
    }

    async fn fetch_account_by_username(&self, username: &Username) -> Result<Option<Account>> {
        let record = query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE users.username = $1"
        ))
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        self.hydrate_one(record).await
    }

    async fn fetch_credentials(&self, username: &Username) -> Result<Option<Credentials>> {
        let record = query_as::<_, CredentialsRecord>(
            "SELECT user_snowflake, password_hash FROM users WHERE username = $1",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let Some(record) = record else {
            return Ok(None);
        };
        let (user_snowflake, password) = record.into_parts()?;

        Ok(Some(Credentials {
            user_id: Id::from_db(user_snowflake),
            password,
        }))
    }

    async fn list_accounts(&self, role: Option<Role>) -> Result<Vec<Account>> {
        let records = query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE $1::TEXT IS NULL OR users.role = $1
            ORDER BY users.user_snowflake"
        ))
        .bind(role.map(Role::as_str))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(records).await
    }

    async fn update_profile(
        &self,
        id: Id<UserMarker>,
        update: ProfileUpdate,
    ) -> Result<Option<Account>> {
        let mut transaction = self.pool.begin().await?;

        let Some(record) = query_as::<_, UserRecord>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE users.user_snowflake = $1 FOR UPDATE"
        ))
        .bind(id.to_db())
        .fetch_optional(&mut *transaction)
        .await?
        else {
            return Ok(None);
        };

        let mut account = record.into_account(Vec::new(), Vec::new())?;
        let profile = &mut account.user_mut().profile;
        profile.apply(update);

        let colors = &profile.custom_colors;
        let links = &profile.external_links;
        query(
            "UPDATE users SET
                biography = $2, profile_picture = $3, banner_image = $4, resume_file = $5,
                skills = $6, portfolio_models = $7, portfolio_thumbnails = $8,
                github = $9, artstation = $10, linkedin = $11, website = $12,
                color_primary = $13, color_accent = $14, color_background = $15,
                custom_font = $16
            WHERE user_snowflake = $1",
        )
        .bind(id.to_db())
        .bind(&profile.biography)
        .bind(profile.profile_picture.as_deref())
        .bind(profile.banner_image.as_deref())
        .bind(profile.resume_file.as_deref())
        .bind(profile.skills.as_slice())
        .bind(profile.portfolio_models.as_slice())
        .bind(profile.portfolio_thumbnails.as_slice())
        .bind(links.github.as_deref())
        .bind(links.artstation.as_deref())
        .bind(links.linkedin.as_deref())
        .bind(links.website.as_deref())
        .bind(colors.primary.as_ref().map(|color| color.get()))
        .bind(colors.accent.as_ref().map(|color| color.get()))
        .bind(colors.background.as_ref().map(|color| color.get()))
        .bind(profile.custom_font.as_deref())
        .execute(&mut *transaction)
        .await?;

        transaction.commit().await?;

        self.fetch_account(id).await
    }

    async fn add_testimonial(
        &self,
        recipient: &Username,
        author: &Username,
        content: &str,
    ) -> Result<Option<Testimonial>> {
        let (testimonial_id, created_at) = self.sequencer.next::<TestimonialMarker>()?;

        let record = query_as::<_, TestimonialRecord>(concat!(
            "INSERT INTO testimonials
                (testimonial_snowflake, recipient, author, content, created_at, approved)
            SELECT $1, username, $2, $3, $4, FALSE FROM users WHERE username = $5
            RETURNING ",
            testimonial_columns!()
        ))
        .bind(testimonial_id.to_db())
        .bind(author.get())
        .bind(content)
        .bind(created_at)
        .bind(recipient.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Testimonial::try_from).transpose()?)
    }

    async fn approve_testimonial(
        &self,
        owner: &Username,
        id: Id<TestimonialMarker>,
    ) -> Result<Option<Testimonial>> {
        let record = query_as::<_, TestimonialRecord>(concat!(
            "UPDATE testimonials SET approved = TRUE
            WHERE testimonial_snowflake = $1 AND recipient = $2
            RETURNING ",
            testimonial_columns!()
        ))
        .bind(id.to_db())
        .bind(owner.get())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Testimonial::try_from).transpose()?)
    }

    async fn create_job_posting(
        &self,
        recruiter: Id<UserMarker>,
        posting: &CreateJobPosting,
    ) -> Result<Option<JobPosting>> {
        let (job_id, posted_at) = self.sequencer.next::<JobPostingMarker>()?;

        let record = query_as::<_, JobPostingRecord>(concat!(
            "INSERT INTO job_postings
                (job_snowflake, recruiter, title, description, location, posted_at)
            SELECT $1, username, $2, $3, $4, $5 FROM users
            WHERE user_snowflake = $6 AND role = 'Recruiter'
            RETURNING ",
            job_posting_columns!()
        ))
        .bind(job_id.to_db())
        .bind(&posting.title)
        .bind(&posting.description)
        .bind(posting.location.as_deref())
        .bind(posted_at)
        .bind(recruiter.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(JobPosting::try_from).transpose()?)
    }

    async fn fetch_job_posting(&self, id: Id<JobPostingMarker>) -> Result<Option<JobPosting>> {
        let record = query_as::<_, JobPostingRecord>(concat!(
            "SELECT ",
            job_posting_columns!(),
            " FROM job_postings WHERE job_snowflake = $1"
        ))
        .bind(id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(JobPosting::try_from).transpose()?)
    }

    async fn insert_authentication(&self, authentication: &Authentication) -> Result<()> {
        query(
            "INSERT INTO authentications
                (token_hash, user_snowflake, created_at, expires_after_seconds)
            VALUES ($1, $2, $3, $4)",
        )
        .bind(&authentication.token_hash.0[..])
        .bind(authentication.user.to_db())
        .bind(authentication.created_at)
        .bind(
            authentication
                .expires_after
                .map(|lifetime| lifetime.get().whole_seconds()),
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_authentication(&self, hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        let record = query_as::<_, AuthenticationRecord>(
            "SELECT user_snowflake, token_hash, created_at, expires_after_seconds
            FROM authentications WHERE token_hash = $1",
        )
        .bind(&hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Authentication::try_from).transpose()?)
    }

    async fn delete_authentication(&self, hash: &AuthTokenHash) -> Result<bool> {
        let result = query("DELETE FROM authentications WHERE token_hash = $1")
            .bind(&hash.0[..])
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_gallery_post(
        &self,
        owner: &Username,
        post: CreateGalleryPost,
    ) -> Result<GalleryPost> {
        let (post_id, post_date_time) = self.sequencer.next::<GalleryPostMarker>()?;
        let tags: Vec<&str> = post.tags.iter().map(|tag| tag.as_str()).collect();

        let record = query_as::<_, GalleryPostRecord>(concat!(
            "INSERT INTO gallery_posts
                (post_snowflake, title, description, username, media, thumbnail_media,
                 community, tags, post_date_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING ",
            gallery_post_columns!()
        ))
        .bind(post_id.to_db())
        .bind(&post.title)
        .bind(&post.description)
        .bind(owner.get())
        .bind(&post.media)
        .bind(post.thumbnail_media.as_deref())
        .bind(&post.community)
        .bind(tags.as_slice())
        .bind(post_date_time)
        .fetch_one(&self.pool)
        .await?;

        Ok(GalleryPost::try_from(record)?)
    }

    async fn fetch_gallery_post(&self, id: Id<GalleryPostMarker>) -> Result<Option<GalleryPost>> {
        let record = query_as::<_, GalleryPostRecord>(concat!(
            "SELECT ",
            gallery_post_columns!(),
            " FROM gallery_posts WHERE post_snowflake = $1"
        ))
        .bind(id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(GalleryPost::try_from).transpose()?)
    }

    async fn list_gallery_posts(&self, filter: &GalleryFilter) -> Result<Vec<GalleryPost>> {
        let records = query_as::<_, GalleryPostRecord>(concat!(
            "SELECT ",
            gallery_post_columns!(),
            " FROM gallery_posts
            WHERE ($1::TEXT IS NULL OR community = $1)
                AND ($2::TEXT IS NULL OR $2 = ANY(tags))
                AND ($3::TEXT IS NULL OR username = $3)
            ORDER BY post_snowflake DESC"
        ))
        .bind(filter.community.as_deref())
        .bind(filter.tag.map(GalleryTag::as_str))
        .bind(filter.user.as_ref().map(Username::get))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Ok(GalleryPost::try_from(record)?))
            .collect()
    }

    async fn delete_gallery_post(
        &self,
        id: Id<GalleryPostMarker>,
        actor: &Username,
    ) -> Result<GalleryDeletion> {
        let deleted = query("DELETE FROM gallery_posts WHERE post_snowflake = $1 AND username = $2")
            .bind(id.to_db())
            .bind(actor.get())
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted > 0 {
            return Ok(GalleryDeletion::Deleted);
        }

        let exists = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM gallery_posts WHERE post_snowflake = $1)",
        )
        .bind(id.to_db())
        .fetch_one(&self.pool)
        .await?;

        Ok(if exists {
            GalleryDeletion::NotOwner
        } else {
            GalleryDeletion::NotFound
        })
    }

    async fn create_question(
        &self,
        author: &Username,
        question: CreateQuestion,
    ) -> Result<Question> {
        let (question_id, ask_date_time) = self.sequencer.next::<QuestionMarker>()?;
        let tags: Vec<&str> = question.tags.iter().map(TagName::get).collect();

        let record = query_as::<_, QuestionRecord>(concat!(
            "INSERT INTO questions
                (question_snowflake, title, text, tags, asked_by, ask_date_time, views)
            VALUES ($1, $2, $3, $4, $5, $6, 0)
            RETURNING ",
            question_columns!()
        ))
        .bind(question_id.to_db())
        .bind(&question.title)
        .bind(&question.text)
        .bind(tags.as_slice())
        .bind(author.get())
        .bind(ask_date_time)
        .fetch_one(&self.pool)
        .await?;

        Ok(Question::try_from(record)?)
    }

    async fn view_question(&self, id: Id<QuestionMarker>) -> Result<Option<Question>> {
        let record = query_as::<_, QuestionRecord>(concat!(
            "UPDATE questions SET views = views + 1 WHERE question_snowflake = $1 RETURNING ",
            question_columns!()
        ))
        .bind(id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Question::try_from).transpose()?)
    }

    async fn list_questions(&self, tag: Option<&TagName>) -> Result<Vec<Question>> {
        let records = query_as::<_, QuestionRecord>(concat!(
            "SELECT ",
            question_columns!(),
            " FROM questions WHERE $1::TEXT IS NULL OR $1 = ANY(tags)
            ORDER BY question_snowflake DESC"
        ))
        .bind(tag.map(TagName::get))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Ok(Question::try_from(record)?))
            .collect()
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let records = query_as::<_, TagRecord>(
            "SELECT tag AS name, COUNT(*) AS question_count
            FROM questions CROSS JOIN LATERAL UNNEST(tags) AS tag
            GROUP BY tag
            ORDER BY tag",
        )
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Ok(Tag::try_from(record)?))
            .collect()
    }

    async fn fetch_tag(&self, name: &TagName) -> Result<Option<Tag>> {
        let record = query_as::<_, TagRecord>(
            "SELECT $1::TEXT AS name, COUNT(*) AS question_count
            FROM questions WHERE $1 = ANY(tags)",
        )
        .bind(name.get())
        .fetch_one(&self.pool)
        .await?;

        if record.question_count == 0 {
            return Ok(None);
        }
        Ok(Some(Tag::try_from(record)?))
    }

    async fn create_answer(
        &self,
        question: Id<QuestionMarker>,
        author: &Username,
        answer: ResolvedAnswer,
    ) -> Result<Option<Answer>> {
        let (answer_id, ans_date_time) = self.sequencer.next::<AnswerMarker>()?;

        let record = query_as::<_, AnswerRecord>(concat!(
            "INSERT INTO answers
                (answer_snowflake, question_snowflake, text, ans_by, ans_date_time,
                 camera_references)
            SELECT $1, question_snowflake, $3, $4, $5, $6 FROM questions
            WHERE question_snowflake = $2
            RETURNING ",
            answer_columns!()
        ))
        .bind(answer_id.to_db())
        .bind(question.to_db())
        .bind(&answer.text)
        .bind(author.get())
        .bind(ans_date_time)
        .bind(Json(&answer.camera_references))
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Answer::try_from).transpose()?)
    }

    async fn list_answers(&self, question: Id<QuestionMarker>) -> Result<Vec<Answer>> {
        let records = query_as::<_, AnswerRecord>(concat!(
            "SELECT ",
            answer_columns!(),
            " FROM answers WHERE question_snowflake = $1 ORDER BY answer_snowflake"
        ))
        .bind(question.to_db())
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Ok(Answer::try_from(record)?))
            .collect()
    }

    async fn create_comment(
        &self,
        parent: CommentParent,
        author: &Username,
        comment: CreateComment,
    ) -> Result<Option<Comment>> {
        let (comment_id, comment_date_time) = self.sequencer.next::<CommentMarker>()?;
        let (question, answer) = match parent {
            CommentParent::Question(id) => (Some(id.to_db()), None),
            CommentParent::Answer(id) => (None, Some(id.to_db())),
        };

        let record = query_as::<_, CommentRecord>(concat!(
            "INSERT INTO comments
                (comment_snowflake, question_snowflake, answer_snowflake, text, comment_by,
                 comment_date_time, media_path, media_size, permit_download)
            SELECT $1, $2, $3, $4, $5, $6, $7, $8, FALSE
            WHERE EXISTS (SELECT 1 FROM questions WHERE question_snowflake = $2)
                OR EXISTS (SELECT 1 FROM answers WHERE answer_snowflake = $3)
            RETURNING ",
            comment_columns!()
        ))
        .bind(comment_id.to_db())
        .bind(question)
        .bind(answer)
        .bind(&comment.text)
        .bind(author.get())
        .bind(comment_date_time)
        .bind(comment.media_path.as_deref())
        .bind(comment.media_size.as_deref())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::try_from).transpose()?)
    }

    async fn fetch_comment(&self, id: Id<CommentMarker>) -> Result<Option<Comment>> {
        let record = query_as::<_, CommentRecord>(concat!(
            "SELECT ",
            comment_columns!(),
            " FROM comments WHERE comment_snowflake = $1"
        ))
        .bind(id.to_db())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Comment::try_from).transpose()?)
    }

    async fn list_comments(&self, parent: CommentParent) -> Result<Vec<Comment>> {
        let (question, answer) = match parent {
            CommentParent::Question(id) => (Some(id.to_db()), None),
            CommentParent::Answer(id) => (None, Some(id.to_db())),
        };

        let records = query_as::<_, CommentRecord>(concat!(
            "SELECT ",
            comment_columns!(),
            " FROM comments
            WHERE question_snowflake = $1 OR answer_snowflake = $2
            ORDER BY comment_snowflake"
        ))
        .bind(question)
        .bind(answer)
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Ok(Comment::try_from(record)?))
            .collect()
    }

    async fn toggle_comment_permission(
        &self,
        id: Id<CommentMarker>,
        actor: &Username,
    ) -> Result<PermissionToggle> {
        let toggled = query_scalar::<_, bool>(
            "UPDATE comments SET permit_download = NOT permit_download
            WHERE comment_snowflake = $1 AND comment_by = $2
            RETURNING permit_download",
        )
        .bind(id.to_db())
        .bind(actor.get())
        .fetch_optional(&self.pool)
        .await?;
        if let Some(permit_download) = toggled {
            return Ok(PermissionToggle::Toggled { permit_download });
        }

        let exists = query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM comments WHERE comment_snowflake = $1)",
        )
        .bind(id.to_db())
        .fetch_one(&self.pool)
        .await?;

        Ok(if exists {
            PermissionToggle::NotAuthor
        } else {
            PermissionToggle::NotFound
        })
    }

    async fn send_message(
        &self,
        sender: &Username,
        message: SendMessage,
    ) -> Result<Option<Message>> {
        let (message_id, sent_at) = self.sequencer.next::<MessageMarker>()?;

        let record = query_as::<_, MessageRecord>(concat!(
            "INSERT INTO messages (message_snowflake, sender, recipient, text, sent_at)
            SELECT $1, $2, username, $4, $5 FROM users WHERE username = $3
            RETURNING ",
            message_columns!()
        ))
        .bind(message_id.to_db())
        .bind(sender.get())
        .bind(message.to.get())
        .bind(&message.text)
        .bind(sent_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(Message::try_from).transpose()?)
    }

    async fn list_messages(&self, participant: &Username) -> Result<Vec<Message>> {
        let records = query_as::<_, MessageRecord>(concat!(
            "SELECT ",
            message_columns!(),
            " FROM messages WHERE sender = $1 OR recipient = $1
            ORDER BY message_snowflake DESC"
        ))
        .bind(participant.get())
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Ok(Message::try_from(record)?))
            .collect()
    }

    async fn list_conversation(&self, a: &Username, b: &Username) -> Result<Vec<Message>> {
        let records = query_as::<_, MessageRecord>(concat!(
            "SELECT ",
            message_columns!(),
            " FROM messages
            WHERE (sender = $1 AND recipient = $2) OR (sender = $2 AND recipient = $1)
            ORDER BY message_snowflake"
        ))
        .bind(a.get())
        .bind(b.get())
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Ok(Message::try_from(record)?))
            .collect()
    }
}
