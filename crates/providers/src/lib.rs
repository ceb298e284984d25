//! Client side of the external playback provider.
//!
//! [`PlaybackApi`] is the seam the sync engine talks to; [`SpotifyClient`] is
//! the HTTP implementation. Every call takes the acting user's access token and
//! transparently refreshes it once on a 401.

mod auth;
mod error;
mod payload;
mod spotify;

pub use auth::TokenRefresher;
pub use error::{ProviderError, Result};
pub use spotify::SpotifyClient;

use async_trait::async_trait;
use sparty_core::{ArtistDetails, NowPlaying, Track};

/// Maximum ids accepted by the provider's batch lookup endpoints.
pub const BATCH_LIMIT: usize = 50;

#[async_trait]
pub trait PlaybackApi: Send + Sync {
    fn name(&self) -> &'static str;

    /// Raw profile of the token's owner.
    async fn current_user(&self, token: &str) -> Result<serde_json::Value>;

    /// `None` when the user has no active playback device or item.
    async fn currently_playing(&self, token: &str) -> Result<Option<NowPlaying>>;

    async fn queue(&self, token: &str, limit: usize) -> Result<Vec<Track>>;

    async fn recently_played(&self, token: &str, limit: usize) -> Result<Vec<Track>>;

    /// Starts `track` at `position_ms` on the user's active device. Returns the
    /// provider's HTTP status; non-2xx is a soft failure for the caller to judge.
    async fn play_at(&self, token: &str, track: &str, position_ms: u64) -> Result<u16>;

    async fn artists(&self, token: &str, ids: &[String]) -> Result<Vec<ArtistDetails>>;

    async fn tracks(&self, token: &str, ids: &[String]) -> Result<Vec<Track>>;

    async fn top_artists(&self, token: &str) -> Result<Vec<ArtistDetails>>;
}
