//! Shared fixtures: in-memory store, manual clock, JWT tokens and a counting fake catalog.

#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use song_sleuths_back::{
    auth::JwtAuthenticator,
    catalog::{
        CatalogError, CatalogResult, CatalogService, PlaylistService, TrackMetadata, TrackSummary,
    },
    clock::ManualClock,
    config::AppConfig,
    dao::game_store::memory::MemoryGameStore,
    dto::{game::CreateGameRequest, submission::SubmissionRequest},
    services::game_service,
    state::{AppState, Collaborators, SharedState},
};

pub const START: i64 = 1_700_000_000;
const SECRET: &[u8] = b"integration-secret";

/// Catalog and playlist fake that counts calls and can be told to fail. Clones share counters.
#[derive(Clone, Default)]
pub struct FakeCatalog {
    counters: Arc<Counters>,
}

#[derive(Default)]
pub struct Counters {
    pub metadata_calls: AtomicUsize,
    pub add_tracks_calls: AtomicUsize,
    pub created_playlists: AtomicUsize,
    pub fail_playlists: AtomicBool,
    /// Delay applied inside `add_tracks` to widen race windows.
    pub add_tracks_delay_ms: AtomicUsize,
    /// Delay applied inside `fetch_metadata`.
    pub metadata_delay_ms: AtomicUsize,
}

impl std::ops::Deref for FakeCatalog {
    type Target = Counters;

    fn deref(&self) -> &Counters {
        &self.counters
    }
}

impl FakeCatalog {
    pub fn add_tracks_calls(&self) -> usize {
        self.add_tracks_calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_playlists.store(failing, Ordering::SeqCst);
    }
}

impl CatalogService for FakeCatalog {
    fn search(
        &self,
        query: String,
        limit: u32,
    ) -> BoxFuture<'static, CatalogResult<Vec<TrackSummary>>> {
        Box::pin(async move {
            Ok((0..limit.min(3))
                .map(|n| TrackSummary {
                    id: song(n),
                    name: format!("{query} {n}"),
                    album: "Album".into(),
                    artists: vec!["Artist".into()],
                    image: None,
                })
                .collect())
        })
    }

    fn fetch_metadata(
        &self,
        ids: Vec<String>,
    ) -> BoxFuture<'static, CatalogResult<Vec<TrackMetadata>>> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.metadata_delay_ms.load(Ordering::SeqCst) as u64;
        Box::pin(async move {
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(ids
                .into_iter()
                .map(|id| TrackMetadata {
                    name: Some(format!("Title of {id}")),
                    image: Some(format!("https://covers/{id}.jpg")),
                    id,
                })
                .collect())
        })
    }
}

impl PlaylistService for FakeCatalog {
    fn create_playlist(
        &self,
        name: String,
        _description: String,
    ) -> BoxFuture<'static, CatalogResult<String>> {
        let this = self.clone();
        Box::pin(async move {
            let n = this.created_playlists.fetch_add(1, Ordering::SeqCst);
            Ok(format!("playlist-{n}-{name}"))
        })
    }

    fn add_tracks(
        &self,
        _playlist_id: String,
        _track_ids: Vec<String>,
    ) -> BoxFuture<'static, CatalogResult<()>> {
        let this = self.clone();
        Box::pin(async move {
            let delay = this.add_tracks_delay_ms.load(Ordering::SeqCst) as u64;
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            if this.fail_playlists.load(Ordering::SeqCst) {
                return Err(CatalogError::Rejected("playlist service down".into()));
            }
            this.add_tracks_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

pub struct Harness {
    pub state: SharedState,
    pub clock: Arc<ManualClock>,
    pub catalog: FakeCatalog,
    pub auth: Arc<JwtAuthenticator>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::default()).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let catalog = FakeCatalog::default();
        let auth = Arc::new(JwtAuthenticator::new(SECRET));

        let state = AppState::new(
            Collaborators {
                catalog: Arc::new(catalog.clone()),
                playlists: Arc::new(catalog.clone()),
                authenticator: auth.clone(),
                clock: clock.clone(),
            },
            config,
        );
        state
            .set_game_store(Arc::new(MemoryGameStore::default()))
            .await;

        Self {
            state,
            clock,
            catalog,
            auth,
        }
    }

    pub fn token(&self, player: &str) -> String {
        self.auth.issue(player, 3600).unwrap()
    }

    /// Create a game owned by `owner`, closing one hour from now.
    pub async fn game(&self, owner: &str, n_songs: u8) -> String {
        game_service::create_game(
            &self.state,
            owner.into(),
            CreateGameRequest {
                name: "Party".into(),
                deadline: START + 3600,
                n_songs,
            },
        )
        .await
        .unwrap()
        .id
    }

    /// Move past the deadline of games created by [`Harness::game`].
    pub fn close_submissions(&self) {
        self.clock.set(START + 3600);
    }
}

/// Deterministic 22-character catalog id.
pub fn song(n: u32) -> String {
    format!("song{n:0>18}")
}

pub fn submission(nickname: &str, songs: &[u32]) -> SubmissionRequest {
    SubmissionRequest {
        nickname: nickname.into(),
        songs: songs.iter().map(|n| song(*n)).collect(),
        drawing: format!("https://drawings/{nickname}.png"),
    }
}
