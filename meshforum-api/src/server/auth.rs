use crate::server::{ServerConfig, ServerError};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use meshforum_common::model::{
    Id,
    auth::{AuthToken, AuthTokenHash, Authentication},
    user::{Account, UserMarker, Username},
};
use meshforum_db::store::Store;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// The account behind a valid bearer token.
#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    account: Account,
    token_hash: AuthTokenHash,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn id(&self) -> Id<UserMarker> {
        self.account.id()
    }

    #[must_use]
    pub fn username(&self) -> &Username {
        self.account.username()
    }

    #[must_use]
    pub fn account(&self) -> &Account {
        &self.account
    }

    #[must_use]
    pub fn into_account(self) -> Account {
        self.account
    }

    #[must_use]
    pub fn token_hash(&self) -> &AuthTokenHash {
        &self.token_hash
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<dyn Store>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let request_token: AuthToken = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?
            .token()
            .parse()?;

        let token_hash = request_token.hash()?;

        let store = Arc::<dyn Store>::from_ref(state);
        let authentication = store
            .fetch_authentication(&token_hash)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        if authentication.user != request_token.user_id {
            debug!(user = %request_token.user_id, "Token hash belongs to another user");
            return Err(ServerError::InvalidToken);
        }
        if authentication.is_expired_at(OffsetDateTime::now_utc()) {
            return Err(ServerError::InvalidToken);
        }

        let account = store
            .fetch_account(authentication.user)
            .await?
            .ok_or(ServerError::InvalidToken)?;

        Ok(Self {
            account,
            token_hash,
        })
    }
}

/// Creates and stores a session for `user`, returning the bearer token.
pub async fn issue_token(
    store: &dyn Store,
    config: &ServerConfig,
    user: Id<UserMarker>,
) -> Result<String, ServerError> {
    let token = AuthToken::generate_random(user);

    let authentication = Authentication {
        user,
        token_hash: token.hash()?,
        created_at: OffsetDateTime::now_utc(),
        expires_after: config.token_lifetime,
    };
    store.insert_authentication(&authentication).await?;
    debug!(%user, "Issued auth token");

    Ok(token.as_token_str())
}

#[cfg(test)]
mod tests {
    use crate::server::{auth::issue_token, test_support::TestApp};
    use axum::http::{Method, StatusCode};
    use meshforum_common::model::{
        auth::{AuthToken, Authentication, TokenLifetime},
        user::Username,
    };
    use time::{Duration, OffsetDateTime};

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let app = TestApp::new();

        let (status, _) = app.send(Method::GET, "/users/me", None, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_token_is_a_bad_request() {
        let app = TestApp::new();

        let (status, _) = app
            .send(Method::GET, "/users/me", Some("not-a-token"), None)
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let app = TestApp::new();
        app.signup("alice").await;
        let forged = AuthToken::generate_random(1_u64.into()).as_token_str();

        let (status, _) = app.send(Method::GET, "/users/me", Some(&forged), None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_is_unauthorized() {
        let app = TestApp::new();
        app.signup("alice").await;
        let alice = app
            .state
            .store
            .fetch_account_by_username(&Username::new("alice".to_owned()).unwrap())
            .await
            .unwrap()
            .unwrap();

        let token = AuthToken::generate_random(alice.id());
        app.state
            .store
            .insert_authentication(&Authentication {
                user: alice.id(),
                token_hash: token.hash().unwrap(),
                created_at: OffsetDateTime::now_utc() - Duration::hours(2),
                expires_after: TokenLifetime::new(Duration::hours(1)),
            })
            .await
            .unwrap();

        let (status, _) = app
            .send(Method::GET, "/users/me", Some(&token.as_token_str()), None)
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn issued_tokens_authenticate() {
        let app = TestApp::new();
        app.signup("alice").await;
        let alice = app
            .state
            .store
            .fetch_account_by_username(&Username::new("alice".to_owned()).unwrap())
            .await
            .unwrap()
            .unwrap();

        let token = issue_token(app.state.store.as_ref(), &app.state.config, alice.id())
            .await
            .unwrap();
        let (status, body) = app.send(Method::GET, "/users/me", Some(&token), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
    }
}
