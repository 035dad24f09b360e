use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use meshforum_common::model::{
    Id,
    comment::{Comment, CommentMarker, CommentParent, CreateComment, PermissionToggle},
    media::DownloadPrompt,
    question::{AnswerMarker, QuestionMarker},
    user::Username,
};
use meshforum_db::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_question_comments)
        .typed_post(create_question_comment)
        .typed_get(list_answer_comments)
        .typed_post(create_answer_comment)
        .typed_get(get_comment)
        .typed_patch(toggle_permission)
        .typed_get(download_comment_media)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionResponse {
    permit_download: bool,
}

async fn create_comment(
    store: &dyn Store,
    parent: CommentParent,
    author: &Username,
    comment: CreateComment,
) -> Result<Created<Comment>> {
    let comment = store
        .create_comment(parent, author, comment.validated()?)
        .await?
        .ok_or(match parent {
            CommentParent::Question(id) => ServerError::QuestionNotFound(id),
            CommentParent::Answer(id) => ServerError::AnswerNotFound(id),
        })?;
    info!(id = %comment.id, comment_by = %comment.comment_by, "Comment posted");

    Ok(Created(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/questions/{id}/comments", rejection(ServerError))]
struct QuestionCommentsPath {
    id: Id<QuestionMarker>,
}

async fn list_question_comments(
    QuestionCommentsPath { id }: QuestionCommentsPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<Comment>>> {
    Ok(Json(store.list_comments(CommentParent::Question(id)).await?))
}

async fn create_question_comment(
    QuestionCommentsPath { id }: QuestionCommentsPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    Json(comment): Json<CreateComment>,
) -> Result<Created<Comment>> {
    create_comment(
        store.as_ref(),
        CommentParent::Question(id),
        user.username(),
        comment,
    )
    .await
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/answers/{id}/comments", rejection(ServerError))]
struct AnswerCommentsPath {
    id: Id<AnswerMarker>,
}

async fn list_answer_comments(
    AnswerCommentsPath { id }: AnswerCommentsPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<Comment>>> {
    Ok(Json(store.list_comments(CommentParent::Answer(id)).await?))
}

async fn create_answer_comment(
    AnswerCommentsPath { id }: AnswerCommentsPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    Json(comment): Json<CreateComment>,
) -> Result<Created<Comment>> {
    create_comment(
        store.as_ref(),
        CommentParent::Answer(id),
        user.username(),
        comment,
    )
    .await
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}", rejection(ServerError))]
struct CommentPath {
    id: Id<CommentMarker>,
}

async fn get_comment(
    CommentPath { id }: CommentPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Comment>> {
    let comment = store
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentNotFound(id))?;

    Ok(Json(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/permission", rejection(ServerError))]
struct CommentPermissionPath {
    id: Id<CommentMarker>,
}

async fn toggle_permission(
    CommentPermissionPath { id }: CommentPermissionPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<PermissionResponse>> {
    match store.toggle_comment_permission(id, user.username()).await? {
        PermissionToggle::Toggled { permit_download } => {
            info!(%id, permit_download, "Download permission toggled");
            Ok(Json(PermissionResponse { permit_download }))
        }
        PermissionToggle::NotAuthor => Err(ServerError::NotCommentAuthor(id)),
        PermissionToggle::NotFound => Err(ServerError::CommentNotFound(id)),
    }
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/comments/{id}/download", rejection(ServerError))]
struct CommentDownloadPath {
    id: Id<CommentMarker>,
}

async fn download_comment_media(
    CommentDownloadPath { id }: CommentDownloadPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<DownloadPrompt>> {
    let comment = store
        .fetch_comment(id)
        .await?
        .ok_or(ServerError::CommentNotFound(id))?;
    let prompt = comment
        .download_prompt(user.username())
        .map_err(|err| ServerError::Download(id, err))?;

    Ok(Json(prompt))
}
