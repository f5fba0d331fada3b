/// Game phase computation and operation gating.
pub mod session;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    auth::Authenticator,
    catalog::{CatalogService, PlaylistService},
    clock::Clock,
    config::AppConfig,
    dao::{game_store::GameStore, integrity::IntegrityStore},
    error::ServiceError,
};

/// Handle shared by every router and background task.
pub type SharedState = Arc<AppState>;

/// External collaborators injected at startup.
#[derive(Clone)]
pub struct Collaborators {
    /// Track search and metadata.
    pub catalog: Arc<dyn CatalogService>,
    /// Playlist creation and population.
    pub playlists: Arc<dyn PlaylistService>,
    /// Bearer token verification.
    pub authenticator: Arc<dyn Authenticator>,
    /// Source of "now" for deadlines and leases.
    pub clock: Arc<dyn Clock>,
}

/// Central application state holding the storage handle and external collaborators.
///
/// Nothing about individual games lives here; every request re-reads persisted state.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    degraded: watch::Sender<bool>,
    collaborators: Collaborators,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(collaborators: Collaborators, config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            degraded: degraded_tx,
            collaborators,
            config,
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        self.game_store.read().await.as_ref().cloned()
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        *self.game_store.write().await = Some(store);
        self.update_degraded(false).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Update the degraded flag, notifying watchers only when it changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }

    /// Store handle for reads, or [`ServiceError::Degraded`] while storage is down.
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Validating write facade over the current store.
    pub async fn require_integrity(&self) -> Result<IntegrityStore, ServiceError> {
        let store = self.require_game_store().await?;
        Ok(IntegrityStore::new(store, self.collaborators.clock.clone()))
    }

    /// Track search and metadata collaborator.
    pub fn catalog(&self) -> &Arc<dyn CatalogService> {
        &self.collaborators.catalog
    }

    /// External playlist collaborator.
    pub fn playlists(&self) -> &Arc<dyn PlaylistService> {
        &self.collaborators.playlists
    }

    /// Bearer token verifier.
    pub fn authenticator(&self) -> &Arc<dyn Authenticator> {
        &self.collaborators.authenticator
    }

    /// Current time in epoch seconds, from the injected clock.
    pub fn now(&self) -> i64 {
        self.collaborators.clock.now()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
