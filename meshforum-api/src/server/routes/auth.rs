use crate::server::{
    Result, ServerConfig, ServerError, ServerRouter,
    auth::{AuthenticatedUser, issue_token},
    json::{Created, Json},
};
use axum::{extract::State, response::Redirect};
use axum_extra::routing::{RouterExt, TypedPath};
use meshforum_common::{
    model::{
        auth::HashedPassword,
        user::{Account, AccountKind, CreateAccount, Role, Username},
    },
    util::non_blank,
};
use meshforum_db::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(signup)
        .typed_post(login)
        .typed_post(logout)
}

#[derive(Clone, Debug, Deserialize)]
struct SignupRequest {
    username: Username,
    password: String,
    #[serde(default)]
    role: Role,
    company: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
struct LoginRequest {
    username: Username,
    password: String,
}

#[derive(Clone, Debug, Serialize)]
struct Session {
    account: Account,
    token: String,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/signup", rejection(ServerError))]
struct SignupPath();

async fn signup(
    _: SignupPath,
    State(store): State<Arc<dyn Store>>,
    State(config): State<Arc<ServerConfig>>,
    Json(request): Json<SignupRequest>,
) -> Result<Created<Session>> {
    let kind = match request.role {
        Role::User => AccountKind::User,
        Role::Recruiter => AccountKind::Recruiter {
            company: non_blank("company", request.company.as_deref().unwrap_or_default())?,
        },
    };

    let account = store
        .create_account(&CreateAccount {
            username: request.username,
            password: HashedPassword::new(&request.password)?,
            kind,
        })
        .await?;
    info!(username = %account.username(), role = account.role().as_str(), "Account created");

    let token = issue_token(store.as_ref(), &config, account.id()).await?;

    Ok(Created(Session { account, token }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/login", rejection(ServerError))]
struct LoginPath();

async fn login(
    _: LoginPath,
    State(store): State<Arc<dyn Store>>,
    State(config): State<Arc<ServerConfig>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>> {
    let credentials = store
        .fetch_credentials(&request.username)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;
    if !credentials.password.verify(&request.password) {
        return Err(ServerError::InvalidCredentials);
    }

    let account = store
        .fetch_account(credentials.user_id)
        .await?
        .ok_or(ServerError::InvalidCredentials)?;
    let token = issue_token(store.as_ref(), &config, account.id()).await?;

    Ok(Json(Session { account, token }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/auth/logout", rejection(ServerError))]
struct LogoutPath();

async fn logout(
    _: LogoutPath,
    user: AuthenticatedUser,
    State(store): State<Arc<dyn Store>>,
    State(config): State<Arc<ServerConfig>>,
) -> Result<Redirect> {
    store.delete_authentication(user.token_hash()).await?;
    info!(username = %user.username(), "Logged out");

    Ok(Redirect::to(&config.app_origin))
}

#[cfg(test)]
mod tests {
    use crate::server::test_support::{APP_ORIGIN, PASSWORD, TestApp};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn signup_returns_account_and_working_token() {
        let app = TestApp::new();

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({ "username": "alice", "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["account"]["role"], "User");
        assert_eq!(body["account"]["username"], "alice");
        assert!(body["account"].get("password").is_none());

        let token = body["token"].as_str().unwrap();
        let (status, me) = app.send(Method::GET, "/users/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["username"], "alice");
    }

    #[tokio::test]
    async fn recruiters_need_a_company() {
        let app = TestApp::new();

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({ "username": "rita", "password": PASSWORD, "role": "Recruiter" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({
                    "username": "rita",
                    "password": PASSWORD,
                    "role": "Recruiter",
                    "company": "Polygon Works",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["account"]["role"], "Recruiter");
        assert_eq!(body["account"]["company"], "Polygon Works");
    }

    #[tokio::test]
    async fn me_cannot_be_claimed_as_a_username() {
        let app = TestApp::new();

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({ "username": "me", "password": PASSWORD })),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_usernames_conflict() {
        let app = TestApp::new();
        app.signup("alice").await;

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({ "username": "alice", "password": PASSWORD })),
            )
            .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["status"], 409);
    }

    #[tokio::test]
    async fn short_passwords_and_bad_usernames_are_rejected() {
        let app = TestApp::new();

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({ "username": "alice", "password": "short" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/signup",
                None,
                Some(json!({ "username": "no spaces", "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let app = TestApp::new();
        app.signup("alice").await;

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": "alice", "password": "wrong password" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": "nobody", "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "username": "alice", "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account"]["username"], "alice");
        assert!(body["token"].is_string());
    }

    #[tokio::test]
    async fn logout_redirects_and_revokes_the_token() {
        let app = TestApp::new();
        let token = app.signup("alice").await;

        let response = app
            .raw(Method::POST, "/auth/logout", Some(&token))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"].to_str().unwrap(),
            APP_ORIGIN
        );

        let (status, _) = app.send(Method::GET, "/users/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
