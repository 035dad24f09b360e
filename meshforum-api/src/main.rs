use meshforum_common::{
    model::auth::{NonPositiveLifetimeError, TokenLifetime},
    snowflake::{ProcessId, WorkerId},
};
use meshforum_db::{
    client::DbClient,
    memory::MemoryStore,
    store::{DbError, Store},
};
use serde::Deserialize;
use server::{ServerConfig, ServerState};
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};
use thiserror::Error;
use time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid TOKEN_LIFETIME_SECONDS: {0}")]
    TokenLifetime(#[from] NonPositiveLifetimeError),
    #[error("Error setting up the database: {0}")]
    Database(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn default_max_connections() -> u32 {
    8
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    database_max_connections: u32,
    #[serde(default)]
    worker_id: WorkerId,
    #[serde(default)]
    process_id: ProcessId,
    token_lifetime_seconds: Option<u32>,
    app_origin: String,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "meshforum_api=debug,\
                meshforum_db=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

async fn open_store(env: &Env) -> Result<Arc<dyn Store>, InitError> {
    let Some(database_url) = &env.database_url else {
        warn!("DATABASE_URL is not set, data is kept in memory and lost on shutdown");
        return Ok(Arc::new(MemoryStore::new(env.worker_id, env.process_id)));
    };

    let client = DbClient::connect(
        database_url,
        env.database_max_connections,
        env.worker_id,
        env.process_id,
    )
    .await?;

    Ok(Arc::new(client))
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received ctrl-c, shutting down");
            shutdown.cancel();
        }
        Err(err) => error!(error = %err, "Could not listen for ctrl-c"),
    }
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let token_lifetime = env
        .token_lifetime_seconds
        .map(|seconds| TokenLifetime::try_from(Duration::seconds(i64::from(seconds))))
        .transpose()?;

    let state = ServerState {
        store: open_store(&env).await?,
        config: Arc::new(ServerConfig {
            token_lifetime,
            app_origin: env.app_origin.clone(),
        }),
    };
    let app = server::app(state);

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
