//! In-memory playback provider and store fixture shared by the engine tests.

use crate::{ActivePartyRegistry, EngineConfig, SyncEngine};
use async_trait::async_trait;
use serde_json::json;
use sparty_core::{
    Artist, ArtistDetails, NowPlaying, PartyId, PartyInfo, ProviderSession, Track, User,
    Visibility,
};
use sparty_providers::{PlaybackApi, ProviderError, Result};
use sparty_store::{DocumentStore, PartyStore, UserPatch, UserStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Default)]
struct FakeState {
    playing: HashMap<String, NowPlaying>,
    auth_failures: Vec<String>,
    queues: HashMap<String, Vec<Track>>,
    histories: HashMap<String, Vec<Track>>,
    artists: HashMap<String, ArtistDetails>,
    top_artists: HashMap<String, Vec<ArtistDetails>>,
    plays: Vec<(String, String, u64)>,
    play_status: u16,
}

/// Tokens without a configured playback report nothing playing.
pub struct FakePlayback {
    state: Mutex<FakeState>,
}

impl FakePlayback {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                play_status: 204,
                ..FakeState::default()
            }),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn check(&self, token: &str) -> Result<()> {
        if self.state().auth_failures.iter().any(|t| t == token) {
            return Err(ProviderError::Auth(format!("{token} revoked")));
        }
        Ok(())
    }

    pub fn set_playing(&self, token: &str, now: NowPlaying) {
        self.state().playing.insert(token.to_string(), now);
    }

    pub fn clear_playing(&self, token: &str) {
        self.state().playing.remove(token);
    }

    pub fn fail_auth(&self, token: &str) {
        self.state().auth_failures.push(token.to_string());
    }

    pub fn set_queue(&self, token: &str, queue: Vec<Track>) {
        self.state().queues.insert(token.to_string(), queue);
    }

    pub fn set_history(&self, token: &str, history: Vec<Track>) {
        self.state().histories.insert(token.to_string(), history);
    }

    pub fn set_artist(&self, id: &str, genres: &[&str]) {
        self.state().artists.insert(id.to_string(), details(id, genres));
    }

    pub fn set_top_artists(&self, token: &str, artists: Vec<ArtistDetails>) {
        self.state().top_artists.insert(token.to_string(), artists);
    }

    pub fn set_play_status(&self, status: u16) {
        self.state().play_status = status;
    }

    /// Recorded `(token, track, position_ms)` play commands.
    pub fn plays(&self) -> Vec<(String, String, u64)> {
        self.state().plays.clone()
    }
}

#[async_trait]
impl PlaybackApi for FakePlayback {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn current_user(&self, token: &str) -> Result<serde_json::Value> {
        self.check(token)?;
        Ok(json!({ "id": token }))
    }

    async fn currently_playing(&self, token: &str) -> Result<Option<NowPlaying>> {
        self.check(token)?;
        Ok(self.state().playing.get(token).cloned())
    }

    async fn queue(&self, token: &str, limit: usize) -> Result<Vec<Track>> {
        self.check(token)?;
        let queue = self.state().queues.get(token).cloned().unwrap_or_default();
        Ok(queue.into_iter().take(limit).collect())
    }

    async fn recently_played(&self, token: &str, limit: usize) -> Result<Vec<Track>> {
        self.check(token)?;
        let history = self.state().histories.get(token).cloned().unwrap_or_default();
        Ok(history.into_iter().take(limit).collect())
    }

    async fn play_at(&self, token: &str, track: &str, position_ms: u64) -> Result<u16> {
        self.check(token)?;
        let mut state = self.state();
        state
            .plays
            .push((token.to_string(), track.to_string(), position_ms));
        Ok(state.play_status)
    }

    async fn artists(&self, token: &str, ids: &[String]) -> Result<Vec<ArtistDetails>> {
        self.check(token)?;
        let state = self.state();
        Ok(ids
            .iter()
            .filter_map(|id| state.artists.get(id).cloned())
            .collect())
    }

    async fn tracks(&self, token: &str, ids: &[String]) -> Result<Vec<Track>> {
        self.check(token)?;
        Ok(ids.iter().map(|id| track(id)).collect())
    }

    async fn top_artists(&self, token: &str) -> Result<Vec<ArtistDetails>> {
        self.check(token)?;
        Ok(self
            .state()
            .top_artists
            .get(token)
            .cloned()
            .unwrap_or_default())
    }
}

pub struct Fixture {
    pub store: Arc<DocumentStore>,
    pub api: Arc<FakePlayback>,
    pub engine: SyncEngine,
}

impl Fixture {
    /// Creates a public party and points the owner's `current_party` at it.
    pub async fn party(&self, owner: &str, members: &[&str]) -> PartyId {
        let id = self
            .store
            .create(PartyInfo {
                name: format!("{owner}'s party"),
                description: "This is a party.".to_string(),
                visibility: Visibility::Public,
                owner: owner.to_string(),
                members: members.iter().map(|m| m.to_string()).collect(),
                created_at: 0,
                genres: Vec::new(),
            })
            .await
            .unwrap();
        self.join_current(owner, &id).await;
        id
    }

    pub async fn join_current(&self, user: &str, party: &str) {
        self.store
            .update_user(user, UserPatch::current_party(Some(party.to_string())))
            .await
            .unwrap();
    }
}

/// Store seeded with users `owner`, `m1`, `m2` and `m3`, each holding the
/// access token `tok-<id>`.
pub async fn fixture() -> Fixture {
    let store = Arc::new(DocumentStore::in_memory());
    for id in ["owner", "m1", "m2", "m3"] {
        store.insert(user(id)).await.unwrap();
    }
    let api = Arc::new(FakePlayback::new());
    let engine = SyncEngine::new(
        EngineConfig::default(),
        store.clone(),
        store.clone(),
        api.clone(),
        ActivePartyRegistry::new(),
    );
    Fixture { store, api, engine }
}

pub fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        display_name: id.to_string(),
        provider_id: format!("sp-{id}"),
        profile: json!({}),
        session: Some(ProviderSession {
            access_token: format!("tok-{id}"),
            refresh_token: format!("refresh-{id}"),
            expires_in: 3600,
            scope: String::new(),
            token_type: "Bearer".to_string(),
        }),
        top_genres: Vec::new(),
        current_party: None,
    }
}

pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub fn track(uri: &str) -> Track {
    Track {
        uri: uri.to_string(),
        name: uri.to_string(),
        ..Track::default()
    }
}

pub fn artist_ref(id: &str) -> Artist {
    Artist {
        name: id.to_uppercase(),
        uri: id.to_string(),
    }
}

pub fn details(id: &str, genres: &[&str]) -> ArtistDetails {
    ArtistDetails {
        name: id.to_uppercase(),
        uri: id.to_string(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
    }
}

pub fn playing(uri: &str, progress_ms: u64) -> NowPlaying {
    NowPlaying {
        is_playing: true,
        progress_ms,
        track: track(uri),
    }
}

pub fn paused(uri: &str, progress_ms: u64) -> NowPlaying {
    NowPlaying {
        is_playing: false,
        ..playing(uri, progress_ms)
    }
}
