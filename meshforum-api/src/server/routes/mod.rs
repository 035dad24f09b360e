use crate::server::ServerRouter;

mod auth;
mod comments;
mod gallery;
mod messages;
mod questions;
mod recruiters;
mod tags;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(recruiters::routes())
        .merge(gallery::routes())
        .merge(questions::routes())
        .merge(tags::routes())
        .merge(comments::routes())
        .merge(messages::routes())
}
