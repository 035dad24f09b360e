use crate::server::{
    Result, ServerError, ServerRouter,
    auth::AuthenticatedUser,
    json::{Created, Json},
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use meshforum_common::model::{
    Id,
    job::{CreateJobPosting, JobPosting, JobPostingMarker},
    user::{Account, Recruiter, Role},
};
use meshforum_db::store::Store;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_recruiters)
        .typed_post(create_job_posting)
        .typed_get(get_job_posting)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/recruiters", rejection(ServerError))]
struct RecruitersPath();

async fn list_recruiters(
    _: RecruitersPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<Vec<Recruiter>>> {
    let recruiters = store
        .list_accounts(Some(Role::Recruiter))
        .await?
        .into_iter()
        .filter_map(|account| match account.into_public() {
            Account::Recruiter(recruiter) => Some(recruiter),
            Account::User(_) => None,
        })
        .collect();

    Ok(Json(recruiters))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/recruiters/me/jobs", rejection(ServerError))]
struct OwnJobsPath();

async fn create_job_posting(
    _: OwnJobsPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    Json(posting): Json<CreateJobPosting>,
) -> Result<Created<JobPosting>> {
    if user.account().as_recruiter().is_none() {
        return Err(ServerError::NotRecruiter);
    }
    let posting = posting.validated()?;

    let posting = store
        .create_job_posting(user.id(), &posting)
        .await?
        .ok_or(ServerError::NotRecruiter)?;
    info!(id = %posting.id, recruiter = %posting.recruiter, "Job posted");

    Ok(Created(posting))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/jobs/{id}", rejection(ServerError))]
struct JobPath {
    id: Id<JobPostingMarker>,
}

async fn get_job_posting(
    JobPath { id }: JobPath,
    State(store): State<Arc<dyn Store>>,
) -> Result<Json<JobPosting>> {
    let posting = store
        .fetch_job_posting(id)
        .await?
        .ok_or(ServerError::JobPostingNotFound(id))?;

    Ok(Json(posting))
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::TestApp;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn recruiters_post_jobs_and_plain_users_cannot() {
        let app = TestApp::new();
        let rita = app.signup_recruiter("rita", "Polygon Works").await;
        let alice = app.signup("alice").await;
        let job = json!({ "title": "Rigging artist", "location": "Remote" });

        let (status, _) = app
            .send(Method::POST, "/recruiters/me/jobs", Some(&alice), Some(job.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, posting) = app
            .send(Method::POST, "/recruiters/me/jobs", Some(&rita), Some(job))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(posting["recruiter"], "rita");

        let (status, fetched) = app
            .send(Method::GET, &format!("/jobs/{}", posting["id"]), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, posting);

        let (_, recruiters) = app.send(Method::GET, "/recruiters", None, None).await;
        let recruiters = recruiters.as_array().unwrap();
        assert_eq!(recruiters.len(), 1);
        assert_eq!(recruiters[0]["jobPostings"], json!([posting["id"]]));
    }

    #[tokio::test]
    async fn job_titles_are_required() {
        let app = TestApp::new();
        let rita = app.signup_recruiter("rita", "Polygon Works").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/recruiters/me/jobs",
                Some(&rita),
                Some(json!({ "title": "  " })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_jobs_are_not_found() {
        let app = TestApp::new();

        let (status, _) = app.send(Method::GET, "/jobs/12345", None, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
