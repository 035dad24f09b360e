use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use meshforum_common::{
    model::{
        Id, ModelValidationError,
        auth::{AuthTokenDecodeError, AuthTokenHashError, PasswordError, TokenLifetime},
        comment::{CommentMarker, DownloadError},
        gallery::GalleryPostMarker,
        job::JobPostingMarker,
        question::{AnswerMarker, QuestionMarker, TagName},
        user::{TestimonialMarker, Username},
    },
    util::BlankFieldError,
};
use meshforum_db::store::{DbError, Store};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::error;

mod auth;
mod json;
mod query;
mod routes;
#[cfg(test)]
mod test_support;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct ServerConfig {
    /// Sessions never expire when unset.
    pub token_lifetime: Option<TokenLifetime>,
    /// Where logout redirects to.
    pub app_origin: String,
}

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub store: Arc<dyn Store>,
    pub config: Arc<ServerConfig>,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub fn app(state: ServerState) -> Router {
    routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Query string rejected: {0}")]
    QueryRejection(#[from] QueryRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error("The provided auth token could not be decoded: {0}")]
    InvalidAuthToken(#[from] AuthTokenDecodeError),
    #[error("The auth token could not be hashed: {0}")]
    AuthTokenHash(#[from] AuthTokenHashError),
    #[error("Provided token was invalid")]
    InvalidToken,
    #[error("Username or password was incorrect")]
    InvalidCredentials,
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Validation(#[from] ModelValidationError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Users cannot write testimonials for themselves")]
    SelfTestimonial,
    #[error("Only recruiters can post jobs")]
    NotRecruiter,
    #[error("Gallery post {0} belongs to someone else")]
    NotGalleryPostOwner(Id<GalleryPostMarker>),
    #[error("Only the author can change the download permission of comment {0}")]
    NotCommentAuthor(Id<CommentMarker>),
    #[error("Comment {0} cannot be downloaded: {1}")]
    Download(Id<CommentMarker>, DownloadError),
    #[error("User {0} was not found.")]
    AccountNotFound(Username),
    #[error("Testimonial with id {0} was not found.")]
    TestimonialNotFound(Id<TestimonialMarker>),
    #[error("Job posting with id {0} was not found.")]
    JobPostingNotFound(Id<JobPostingMarker>),
    #[error("Gallery post with id {0} was not found.")]
    GalleryPostNotFound(Id<GalleryPostMarker>),
    #[error("Question with id {0} was not found.")]
    QuestionNotFound(Id<QuestionMarker>),
    #[error("Answer with id {0} was not found.")]
    AnswerNotFound(Id<AnswerMarker>),
    #[error("Comment with id {0} was not found.")]
    CommentNotFound(Id<CommentMarker>),
    #[error("Tag {0} was not found.")]
    TagNotFound(TagName),
}

impl From<BlankFieldError> for ServerError {
    fn from(value: BlankFieldError) -> Self {
        ServerError::Validation(value.into())
    }
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::Download(_, DownloadError::NoMedia)
            | ServerError::AccountNotFound(_)
            | ServerError::TestimonialNotFound(_)
            | ServerError::JobPostingNotFound(_)
            | ServerError::GalleryPostNotFound(_)
            | ServerError::QuestionNotFound(_)
            | ServerError::AnswerNotFound(_)
            | ServerError::CommentNotFound(_)
            | ServerError::TagNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::InvalidToken | ServerError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::NotRecruiter
            | ServerError::NotGalleryPostOwner(_)
            | ServerError::NotCommentAuthor(_)
            | ServerError::Download(_, DownloadError::NotPermitted) => StatusCode::FORBIDDEN,
            ServerError::Database(DbError::UsernameTaken(_)) => StatusCode::CONFLICT,
            ServerError::QueryRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::InvalidAuthorizationHeader(_)
            | ServerError::InvalidAuthToken(_)
            | ServerError::Password(PasswordError::TooShort)
            | ServerError::Validation(_)
            | ServerError::SelfTestimonial => StatusCode::BAD_REQUEST,
            ServerError::JsonResponse(_)
            | ServerError::Database(_)
            | ServerError::Password(PasswordError::Hash(_))
            | ServerError::AuthTokenHash(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
    message: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        // Internal details stay in the log.
        let message = if status.is_server_error() {
            "Internal server error".to_owned()
        } else {
            self.to_string()
        };

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message,
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn unknown_routes_are_not_found() {
        let app = TestApp::new();

        let (status, body) = app.send(Method::GET, "/nowhere", None, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], json!(404));
        assert!(body["message"].as_str().unwrap().contains("/nowhere"));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = TestApp::new();
        let token = app.signup("alice").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/questions",
                Some(&token),
                Some(json!({ "title": 5 })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], json!(400));
    }
}
