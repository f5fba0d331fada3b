//! Song Sleuths Back binary entrypoint wiring REST routes, storage and external collaborators.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use rand::Rng;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use song_sleuths_back::{
    auth::JwtAuthenticator,
    catalog::{OfflineCatalog, SpotifyClient, SpotifyConfig},
    clock::SystemClock,
    config::AppConfig,
    dao::game_store::memory::MemoryGameStore,
    routes,
    state::{AppState, Collaborators, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let collaborators = build_collaborators(&config).context("building collaborators")?;
    let app_state = AppState::new(collaborators, config);

    install_storage(&app_state).await;
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Spotify when credentials are configured, an offline stand-in otherwise.
fn build_collaborators(config: &AppConfig) -> anyhow::Result<Collaborators> {
    let authenticator = match env::var("AUTH_JWT_SECRET") {
        Ok(secret) if !secret.is_empty() => JwtAuthenticator::new(secret.as_bytes()),
        _ => {
            warn!("AUTH_JWT_SECRET not set; using a random secret, tokens will not survive restarts");
            let mut secret = [0u8; 32];
            rand::rng().fill(&mut secret);
            JwtAuthenticator::new(&secret)
        }
    };

    let collaborators = match SpotifyConfig::from_env(config.playlist.public) {
        Ok(spotify) => {
            let client = Arc::new(SpotifyClient::new(spotify)?);
            info!("using Spotify catalog");
            Collaborators {
                catalog: client.clone(),
                playlists: client,
                authenticator: Arc::new(authenticator),
                clock: Arc::new(SystemClock),
            }
        }
        Err(err) => {
            warn!(error = %err, "Spotify not configured; running with the offline catalog");
            Collaborators {
                catalog: Arc::new(OfflineCatalog),
                playlists: Arc::new(OfflineCatalog),
                authenticator: Arc::new(authenticator),
                clock: Arc::new(SystemClock),
            }
        }
    };
    Ok(collaborators)
}

/// Supervise MongoDB when `MONGO_URI` is set, otherwise keep everything in memory.
async fn install_storage(state: &SharedState) {
    #[cfg(feature = "mongo-store")]
    if env::var_os("MONGO_URI").is_some() {
        use song_sleuths_back::{
            dao::{
                game_store::{
                    GameStore,
                    mongodb::{MongoConfig, MongoGameStore},
                },
                storage::StorageError,
            },
            services::storage_supervisor,
        };

        tokio::spawn(storage_supervisor::run(state.clone(), || async {
            let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
            let store = MongoGameStore::connect(config)
                .await
                .map_err(StorageError::from)?;
            Ok(Arc::new(store) as Arc<dyn GameStore>)
        }));
        return;
    }

    warn!("MONGO_URI not set; games are kept in memory and lost on restart");
    state.set_game_store(Arc::new(MemoryGameStore::default())).await;
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("shutdown signal received");
}
