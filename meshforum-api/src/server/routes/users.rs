use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
    query::Query,
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use meshforum_common::{
    model::{
        Id,
        gallery::{GalleryFilter, GalleryPost},
        user::{Account, CreateTestimonial, ProfileUpdate, Role, Testimonial, TestimonialMarker, Username},
    },
    util::non_blank,
};
use meshforum_db::store::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_users)
        .typed_get(get_me)
        .typed_patch(update_me)
        .typed_get(get_user)
        .typed_get(get_user_gallery)
        .typed_post(add_testimonial)
        .typed_post(approve_testimonial)
}

#[derive(Clone, Debug, Default, Deserialize)]
struct ListUsersQuery {
    role: Option<Role>,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users", rejection(ServerError))]
struct UsersPath();

async fn list_users(
    _: UsersPath,
    Query(ListUsersQuery { role }): Query<ListUsersQuery>,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<Account>>> {
    let accounts = store
        .list_accounts(role)
        .await?
        .into_iter()
        .map(Account::into_public)
        .collect();

    Ok(Json(accounts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/me", rejection(ServerError))]
struct MePath();

async fn get_me(_: MePath, user: AuthenticatedUser) -> Json<Account> {
    Json(user.into_account())
}

async fn update_me(
    _: MePath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<Account>> {
    let account = store
        .update_profile(user.id(), update)
        .await?
        .ok_or_else(|| ServerError::AccountNotFound(user.username().clone()))?;
    debug!(username = %account.username(), "Profile updated");

    Ok(Json(account))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}", rejection(ServerError))]
struct UserPath {
    username: Username,
}

async fn get_user(
    UserPath { username }: UserPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Account>> {
    let account = store
        .fetch_account_by_username(&username)
        .await?
        .ok_or(ServerError::AccountNotFound(username))?;

    Ok(Json(account.into_public()))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}/gallery", rejection(ServerError))]
struct UserGalleryPath {
    username: Username,
}

async fn get_user_gallery(
    UserGalleryPath { username }: UserGalleryPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<GalleryPost>>> {
    if store.fetch_account_by_username(&username).await?.is_none() {
        return Err(ServerError::AccountNotFound(username));
    }

    let filter = GalleryFilter {
        user: Some(username),
        ..GalleryFilter::default()
    };
    let posts = store.list_gallery_posts(&filter).await?;

    Ok(Json(posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/{username}/testimonials", rejection(ServerError))]
struct UserTestimonialsPath {
    username: Username,
}

async fn add_testimonial(
    UserTestimonialsPath { username }: UserTestimonialsPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    Json(testimonial): Json<CreateTestimonial>,
) -> Result<Created<Testimonial>> {
    if &username == user.username() {
        return Err(ServerError::SelfTestimonial);
    }
    let content = non_blank("content", &testimonial.content)?;

    let testimonial = store
        .add_testimonial(&username, user.username(), &content)
        .await?
        .ok_or(ServerError::AccountNotFound(username))?;

    Ok(Created(testimonial))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/me/testimonials/{id}/approve", rejection(ServerError))]
struct ApproveTestimonialPath {
    id: Id<TestimonialMarker>,
}

async fn approve_testimonial(
    ApproveTestimonialPath { id }: ApproveTestimonialPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Testimonial>> {
    let testimonial = store
        .approve_testimonial(user.username(), id)
        .await?
        .ok_or(ServerError::TestimonialNotFound(id))?;

    Ok(Json(testimonial))
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn role_filter_lists_exactly_the_recruiters() {
        let app = TestApp::new();
        app.signup("alice").await;
        app.signup_recruiter("rita", "Polygon Works").await;
        app.signup("bob").await;

        let (status, all) = app.send(Method::GET, "/users", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all.as_array().unwrap().len(), 3);

        let (status, recruiters) = app
            .send(Method::GET, "/users?role=Recruiter", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let recruiters = recruiters.as_array().unwrap();
        assert_eq!(recruiters.len(), 1);
        assert_eq!(recruiters[0]["username"], "rita");
        assert_eq!(recruiters[0]["company"], "Polygon Works");

        let (status, _) = app.send(Method::GET, "/users?role=Admin", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn profile_edits_are_partial() {
        let app = TestApp::new();
        let token = app.signup("alice").await;

        let (status, body) = app
            .send(
                Method::PATCH,
                "/users/me",
                Some(&token),
                Some(json!({
                    "biography": "I model boats",
                    "skills": ["blender", "zbrush"],
                    "customColors": { "primary": "#FFAA00" },
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["biography"], "I model boats");
        assert_eq!(body["customColors"]["primary"], "#ffaa00");

        let (_, body) = app
            .send(
                Method::PATCH,
                "/users/me",
                Some(&token),
                Some(json!({ "customFont": "Inter" })),
            )
            .await;
        assert_eq!(body["biography"], "I model boats");
        assert_eq!(body["skills"], json!(["blender", "zbrush"]));
        assert_eq!(body["customFont"], "Inter");

        let (status, _) = app
            .send(
                Method::PATCH,
                "/users/me",
                Some(&token),
                Some(json!({ "customColors": { "accent": "orange" } })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_users_are_not_found() {
        let app = TestApp::new();

        let (status, _) = app.send(Method::GET, "/users/ghost", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(Method::GET, "/users/ghost/gallery", None, None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn testimonials_are_public_once_approved() {
        let app = TestApp::new();
        let alice = app.signup("alice").await;
        let bob = app.signup("bob").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/users/alice/testimonials",
                Some(&alice),
                Some(json!({ "content": "I am great" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, testimonial) = app
            .send(
                Method::POST,
                "/users/alice/testimonials",
                Some(&bob),
                Some(json!({ "content": "Great topology" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(testimonial["approved"], false);
        assert_eq!(testimonial["author"], "bob");
        let id = &testimonial["id"];

        let (_, public) = app.send(Method::GET, "/users/alice", None, None).await;
        assert_eq!(public["testimonials"], json!([]));
        let (_, own) = app.send(Method::GET, "/users/me", Some(&alice), None).await;
        assert_eq!(own["testimonials"].as_array().unwrap().len(), 1);

        let approve = format!("/users/me/testimonials/{id}/approve");
        let (status, _) = app.send(Method::POST, &approve, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, approved) = app.send(Method::POST, &approve, Some(&alice), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["approved"], true);

        let (_, public) = app.send(Method::GET, "/users/alice", None, None).await;
        assert_eq!(public["testimonials"][0]["content"], "Great topology");
    }

    #[tokio::test]
    async fn user_gallery_lists_only_their_posts() {
        let app = TestApp::new();
        let alice = app.signup("alice").await;
        let bob = app.signup("bob").await;

        for (token, title) in [(&alice, "Boat"), (&bob, "Tree"), (&alice, "Car")] {
            let (status, _) = app
                .send(
                    Method::POST,
                    "/gallery",
                    Some(token),
                    Some(json!({ "title": title, "media": "m.glb", "community": "art" })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, posts) = app
            .send(Method::GET, "/users/alice/gallery", None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<_> = posts
            .as_array()
            .unwrap()
            .iter()
            .map(|post| post["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Car", "Boat"]);
    }
}
