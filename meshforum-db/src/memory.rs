use crate::{
    sequencer::Sequencer,
    store::{DbError, Result, Store},
};
use async_trait::async_trait;
use meshforum_common::{
    model::{
        Id,
        auth::{AuthTokenHash, Authentication, HashedPassword},
        comment::{Comment, CommentMarker, CommentParent, CreateComment, PermissionToggle},
        gallery::{CreateGalleryPost, GalleryDeletion, GalleryFilter, GalleryPost, GalleryPostMarker},
        job::{CreateJobPosting, JobPosting, JobPostingMarker},
        message::{Message, MessageMarker, SendMessage},
        question::{
            Answer, AnswerMarker, CreateQuestion, Question, QuestionMarker, ResolvedAnswer, Tag,
            TagName,
        },
        user::{
            Account, AccountKind, CreateAccount, Credentials, Profile, ProfileUpdate, Recruiter,
            Role, Testimonial, TestimonialMarker, User, UserMarker, Username,
        },
    },
    snowflake::{ProcessId, WorkerId},
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
};

#[derive(Debug)]
struct StoredAccount {
    account: Account,
    password: HashedPassword,
}

#[derive(Debug, Default)]
struct Tables {
    accounts: BTreeMap<Id<UserMarker>, StoredAccount>,
    authentications: HashMap<AuthTokenHash, Authentication>,
    job_postings: BTreeMap<Id<JobPostingMarker>, JobPosting>,
    gallery_posts: BTreeMap<Id<GalleryPostMarker>, GalleryPost>,
    questions: BTreeMap<Id<QuestionMarker>, Question>,
    answers: BTreeMap<Id<AnswerMarker>, Answer>,
    comments: BTreeMap<Id<CommentMarker>, Comment>,
    messages: BTreeMap<Id<MessageMarker>, Message>,
}

impl Tables {
    fn account_by_username(&self, username: &Username) -> Option<&StoredAccount> {
        self.accounts
            .values()
            .find(|stored| stored.account.username() == username)
    }

    fn account_by_username_mut(&mut self, username: &Username) -> Option<&mut StoredAccount> {
        self.accounts
            .values_mut()
            .find(|stored| stored.account.username() == username)
    }

    fn parent_exists(&self, parent: CommentParent) -> bool {
        match parent {
            CommentParent::Question(id) => self.questions.contains_key(&id),
            CommentParent::Answer(id) => self.answers.contains_key(&id),
        }
    }
}

/// Process-local [`Store`], used when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    sequencer: Sequencer,
}

impl MemoryStore {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            tables: Mutex::default(),
            sequencer: Sequencer::new(worker_id, process_id),
        }
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_account(&self, account: &CreateAccount) -> Result<Account> {
        let mut tables = self.tables();
        if tables.account_by_username(&account.username).is_some() {
            return Err(DbError::UsernameTaken(account.username.clone()));
        }

        let (id, date_joined) = self.sequencer.next()?;
        let user = User {
            id,
            username: account.username.clone(),
            date_joined,
            profile: Profile::default(),
            testimonials: Vec::new(),
        };
        let created = match &account.kind {
            AccountKind::User => Account::User(user),
            AccountKind::Recruiter { company } => Account::Recruiter(Recruiter {
                user,
                company: company.clone(),
                job_postings: Vec::new(),
            }),
        };

        tables.accounts.insert(
            id,
            StoredAccount {
                account: created.clone(),
                password: account.password.clone(),
            },
        );
        Ok(created)
    }

    async fn fetch_account(&self, id: Id<UserMarker>) -> Result<Option<Account>> {
        Ok(self
            .tables()
            .accounts
            .get(&id)
            .map(|stored| stored.account.clone()))
    }

    async fn fetch_account_by_username(&self, username: &Username) -> Result<Option<Account>> {
        Ok(self
            .tables()
            .account_by_username(username)
            .map(|stored| stored.account.clone()))
    }

    async fn fetch_credentials(&self, username: &Username) -> Result<Option<Credentials>> {
        Ok(self
            .tables()
            .account_by_username(username)
            .map(|stored| Credentials {
                user_id: stored.account.id(),
                password: stored.password.clone(),
            }))
    }

    async fn list_accounts(&self, role: Option<Role>) -> Result<Vec<Account>> {
        Ok(self
            .tables()
            .accounts
            .values()
            .filter(|stored| role.is_none_or(|role| stored.account.role() == role))
            .map(|stored| stored.account.clone())
            .collect())
    }

    async fn update_profile(
        &self,
        id: Id<UserMarker>,
        update: ProfileUpdate,
    ) -> Result<Option<Account>> {
        let mut tables = self.tables();
        let Some(stored) = tables.accounts.get_mut(&id) else {
            return Ok(None);
        };

        stored.account.user_mut().profile.apply(update);
        Ok(Some(stored.account.clone()))
    }

    async fn add_testimonial(
        &self,
        recipient: &Username,
        author: &Username,
        content: &str,
    ) -> Result<Option<Testimonial>> {
        let mut tables = self.tables();
        let Some(stored) = tables.account_by_username_mut(recipient) else {
            return Ok(None);
        };

        let (id, created_at) = self.sequencer.next()?;
        let testimonial = Testimonial {
            id,
            author: author.clone(),
            content: content.to_owned(),
            created_at,
            approved: false,
        };
        stored
            .account
            .user_mut()
            .testimonials
            .push(testimonial.clone());
        Ok(Some(testimonial))
    }

    async fn approve_testimonial(
        &self,
        owner: &Username,
        id: Id<TestimonialMarker>,
    ) -> Result<Option<Testimonial>> {
        let mut tables = self.tables();
        let testimonial = tables.account_by_username_mut(owner).and_then(|stored| {
            stored
                .account
                .user_mut()
                .testimonials
                .iter_mut()
                .find(|testimonial| testimonial.id == id)
        });

        Ok(testimonial.map(|testimonial| {
            testimonial.approved = true;
            testimonial.clone()
        }))
    }

    async fn create_job_posting(
        &self,
        recruiter: Id<UserMarker>,
        posting: &CreateJobPosting,
    ) -> Result<Option<JobPosting>> {
        let mut tables = self.tables();
        let Some(Account::Recruiter(account)) = tables
            .accounts
            .get_mut(&recruiter)
            .map(|stored| &mut stored.account)
        else {
            return Ok(None);
        };

        let (id, posted_at) = self.sequencer.next()?;
        account.job_postings.push(id);
        let job_posting = JobPosting {
            id,
            recruiter: account.user.username.clone(),
            title: posting.title.clone(),
            description: posting.description.clone(),
            location: posting.location.clone(),
            posted_at,
        };

        tables.job_postings.insert(id, job_posting.clone());
        Ok(Some(job_posting))
    }

    async fn fetch_job_posting(&self, id: Id<JobPostingMarker>) -> Result<Option<JobPosting>> {
        Ok(self.tables().job_postings.get(&id).cloned())
    }

    async fn insert_authentication(&self, authentication: &Authentication) -> Result<()> {
        self.tables()
            .authentications
            .insert(authentication.token_hash.clone(), authentication.clone());
        Ok(())
    }

    async fn fetch_authentication(&self, hash: &AuthTokenHash) -> Result<Option<Authentication>> {
        Ok(self.tables().authentications.get(hash).cloned())
    }

    async fn delete_authentication(&self, hash: &AuthTokenHash) -> Result<bool> {
        Ok(self.tables().authentications.remove(hash).is_some())
    }

    async fn create_gallery_post(
        &self,
        owner: &Username,
        post: CreateGalleryPost,
    ) -> Result<GalleryPost> {
        let mut tables = self.tables();
        let (id, post_date_time) = self.sequencer.next()?;
        let post = post.into_post(id, owner.clone(), post_date_time);

        tables.gallery_posts.insert(id, post.clone());
        Ok(post)
    }

    async fn fetch_gallery_post(&self, id: Id<GalleryPostMarker>) -> Result<Option<GalleryPost>> {
        Ok(self.tables().gallery_posts.get(&id).cloned())
    }

    async fn list_gallery_posts(&self, filter: &GalleryFilter) -> Result<Vec<GalleryPost>> {
        Ok(self
            .tables()
            .gallery_posts
            .values()
            .rev()
            .filter(|post| filter.matches(post))
            .cloned()
            .collect())
    }

    async fn delete_gallery_post(
        &self,
        id: Id<GalleryPostMarker>,
        actor: &Username,
    ) -> Result<GalleryDeletion> {
        let mut tables = self.tables();
        let outcome = match tables.gallery_posts.get(&id) {
            None => GalleryDeletion::NotFound,
            Some(post) if &post.user != actor => GalleryDeletion::NotOwner,
            Some(_) => {
                tables.gallery_posts.remove(&id);
                GalleryDeletion::Deleted
            }
        };
        Ok(outcome)
    }

    async fn create_question(
        &self,
        author: &Username,
        question: CreateQuestion,
    ) -> Result<Question> {
        let mut tables = self.tables();
        let (id, ask_date_time) = self.sequencer.next()?;
        let question = Question {
            id,
            title: question.title,
            text: question.text,
            tags: question.tags,
            asked_by: author.clone(),
            ask_date_time,
            views: 0,
        };

        tables.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn view_question(&self, id: Id<QuestionMarker>) -> Result<Option<Question>> {
        Ok(self.tables().questions.get_mut(&id).map(|question| {
            question.views += 1;
            question.clone()
        }))
    }

    async fn list_questions(&self, tag: Option<&TagName>) -> Result<Vec<Question>> {
        Ok(self
            .tables()
            .questions
            .values()
            .rev()
            .filter(|question| tag.is_none_or(|tag| question.tags.contains(tag)))
            .cloned()
            .collect())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut counts: BTreeMap<TagName, u64> = BTreeMap::new();
        for question in self.tables().questions.values() {
            for tag in &question.tags {
                *counts.entry(tag.clone()).or_default() += 1;
            }
        }

        Ok(counts
            .into_iter()
            .map(|(name, question_count)| Tag {
                name,
                question_count,
            })
            .collect())
    }

    async fn fetch_tag(&self, name: &TagName) -> Result<Option<Tag>> {
        let question_count = self
            .tables()
            .questions
            .values()
            .filter(|question| question.tags.contains(name))
            .count() as u64;

        Ok((question_count > 0).then(|| Tag {
            name: name.clone(),
            question_count,
        }))
    }

    async fn create_answer(
        &self,
        question: Id<QuestionMarker>,
        author: &Username,
        answer: ResolvedAnswer,
    ) -> Result<Option<Answer>> {
        let mut tables = self.tables();
        if !tables.questions.contains_key(&question) {
            return Ok(None);
        }

        let (id, ans_date_time) = self.sequencer.next()?;
        let answer = Answer {
            id,
            question,
            text: answer.text,
            ans_by: author.clone(),
            ans_date_time,
            camera_references: answer.camera_references,
        };

        tables.answers.insert(id, answer.clone());
        Ok(Some(answer))
    }

    async fn list_answers(&self, question: Id<QuestionMarker>) -> Result<Vec<Answer>> {
        Ok(self
            .tables()
            .answers
            .values()
            .filter(|answer| answer.question == question)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        parent: CommentParent,
        author: &Username,
        comment: CreateComment,
    ) -> Result<Option<Comment>> {
        let mut tables = self.tables();
        if !tables.parent_exists(parent) {
            return Ok(None);
        }

        let (id, comment_date_time) = self.sequencer.next()?;
        let comment = Comment {
            id,
            parent,
            text: comment.text,
            comment_by: author.clone(),
            comment_date_time,
            media_path: comment.media_path,
            media_size: comment.media_size,
            permit_download: false,
        };

        tables.comments.insert(id, comment.clone());
        Ok(Some(comment))
    }

    async fn fetch_comment(&self, id: Id<CommentMarker>) -> Result<Option<Comment>> {
        Ok(self.tables().comments.get(&id).cloned())
    }

    async fn list_comments(&self, parent: CommentParent) -> Result<Vec<Comment>> {
        Ok(self
            .tables()
            .comments
            .values()
            .filter(|comment| comment.parent == parent)
            .cloned()
            .collect())
    }

    async fn toggle_comment_permission(
        &self,
        id: Id<CommentMarker>,
        actor: &Username,
    ) -> Result<PermissionToggle> {
        let outcome = match self.tables().comments.get_mut(&id) {
            None => PermissionToggle::NotFound,
            Some(comment) if !comment.is_authored_by(actor) => PermissionToggle::NotAuthor,
            Some(comment) => {
                comment.permit_download = !comment.permit_download;
                PermissionToggle::Toggled {
                    permit_download: comment.permit_download,
                }
            }
        };
        Ok(outcome)
    }

    async fn send_message(
        &self,
        sender: &Username,
        message: SendMessage,
    ) -> Result<Option<Message>> {
        let mut tables = self.tables();
        if tables.account_by_username(&message.to).is_none() {
            return Ok(None);
        }

        let (id, sent_at) = self.sequencer.next()?;
        let message = Message {
            id,
            sender: sender.clone(),
            recipient: message.to,
            text: message.text,
            sent_at,
        };

        tables.messages.insert(id, message.clone());
        Ok(Some(message))
    }

    async fn list_messages(&self, participant: &Username) -> Result<Vec<Message>> {
        Ok(self
            .tables()
            .messages
            .values()
            .rev()
            .filter(|message| message.involves(participant))
            .cloned()
            .collect())
    }

    async fn list_conversation(&self, a: &Username, b: &Username) -> Result<Vec<Message>> {
        Ok(self
            .tables()
            .messages
            .values()
            .filter(|message| message.is_between(a, b))
            .cloned()
            .collect())
    }
}
