use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
    query::Query,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use meshforum_common::model::{
    Id,
    gallery::{
        CreateGalleryPost, GALLERY_TAGS, GalleryDeletion, GalleryFilter, GalleryPost,
        GalleryPostMarker, GalleryTag,
    },
};
use meshforum_db::store::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_gallery_posts)
        .typed_post(create_gallery_post)
        .typed_get(list_gallery_tags)
        .typed_get(get_gallery_post)
        .typed_delete(delete_gallery_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/gallery", rejection(ServerError))]
struct GalleryPath();

async fn list_gallery_posts(
    _: GalleryPath,
    Query(filter): Query<GalleryFilter>,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<GalleryPost>>> {
    let posts = store.list_gallery_posts(&filter).await?;

    Ok(Json(posts))
}

async fn create_gallery_post(
    _: GalleryPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    Json(post): Json<CreateGalleryPost>,
) -> Result<Created<GalleryPost>> {
    let post = store
        .create_gallery_post(user.username(), post.validated()?)
        .await?;
    info!(id = %post.id, owner = %post.user, community = %post.community, "Gallery post created");

    Ok(Created(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/gallery/tags", rejection(ServerError))]
struct GalleryTagsPath();

async fn list_gallery_tags(_: GalleryTagsPath) -> Json<&'static [GalleryTag]> {
    let tags: &'static [GalleryTag] = &GALLERY_TAGS;
    Json(tags)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/gallery/{id}", rejection(ServerError))]
struct GalleryPostPath {
    id: Id<GalleryPostMarker>,
}

async fn get_gallery_post(
    GalleryPostPath { id }: GalleryPostPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<GalleryPost>> {
    let post = store
        .fetch_gallery_post(id)
        .await?
        .ok_or(ServerError::GalleryPostNotFound(id))?;

    Ok(Json(post))
}

async fn delete_gallery_post(
    GalleryPostPath { id }: GalleryPostPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
) -> Result<StatusCode> {
    match store.delete_gallery_post(id, user.username()).await? {
        GalleryDeletion::Deleted => {
            info!(%id, "Gallery post deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        GalleryDeletion::NotOwner => Err(ServerError::NotGalleryPostOwner(id)),
        GalleryDeletion::NotFound => Err(ServerError::GalleryPostNotFound(id)),
    }
}
