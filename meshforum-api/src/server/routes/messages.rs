use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use meshforum_common::model::{
    message::{Message, SendMessage},
    user::Username,
};
use meshforum_db::store::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_messages)
        .typed_post(send_message)
        .typed_get(get_conversation)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/messages", rejection(ServerError))]
struct MessagesPath();

async fn list_messages(
    _: MessagesPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<Message>>> {
    Ok(Json(store.list_messages(user.username()).await?))
}

async fn send_message(
    _: MessagesPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    Json(message): Json<SendMessage>,
) -> Result<Created<Message>> {
    let message = message.validated()?;
    let recipient = message.to.clone();

    let message = store
        .send_message(user.username(), message)
        .await?
        .ok_or(ServerError::AccountNotFound(recipient))?;
    debug!(id = %message.id, sender = %message.sender, recipient = %message.recipient, "Message sent");

    Ok(Created(message))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/messages/{username}", rejection(ServerError))]
struct ConversationPath {
    username: Username,
}

async fn get_conversation(
    ConversationPath { username }: ConversationPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<Message>>> {
    if store.fetch_account_by_username(&username).await?.is_none() {
        return Err(ServerError::AccountNotFound(username));
    }

    Ok(Json(
        store.list_conversation(user.username(), &username).await?,
    ))
}
