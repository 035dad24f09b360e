use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use meshforum_common::model::question::{Tag, TagName};
use meshforum_db::store::Store;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(list_tags).typed_get(get_tag)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/tags", rejection(ServerError))]
struct TagsPath();

async fn list_tags(_: TagsPath, State(store): State<Arc<dyn Store>>) -> Result<Json<Vec<Tag>>> {
    Ok(Json(store.list_tags().await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/tags/{name}", rejection(ServerError))]
struct TagPath {
    name: TagName,
}

async fn get_tag(
    TagPath { name }: TagPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Tag>> {
    let tag = store
        .fetch_tag(&name)
        .await?
        .ok_or(ServerError::TagNotFound(name))?;

    Ok(Json(tag))
}
